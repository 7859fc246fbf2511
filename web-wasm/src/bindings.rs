//! JSから使うストアのハンドル
//!
//! 非同期操作はPromiseを返す。状態はJSONと同じ形のプレーンなオブジェクトで渡す。

use crate::credentials::{browser_credentials, TOKEN_KEY};
use crate::download::save_bytes;
use crate::fetch::FetchTransport;
use erp_admin_common::{
    catalog, ApiClient, DomainStore, DomainStoreState, FilePart, FilterDescriptor, ListParams, SubscriptionId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;

/// `list` の引数（すべて省略可）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ListArgs {
    page: Option<u32>,
    page_size: Option<u32>,
    search: Option<String>,
    sort_by: Option<String>,
    sort_ascending: Option<bool>,
    filters: Map<String, Value>,
}

impl From<ListArgs> for ListParams {
    fn from(args: ListArgs) -> Self {
        ListParams {
            page: args.page,
            page_size: args.page_size,
            search: args.search,
            sort_by: args.sort_by,
            sort_ascending: args.sort_ascending,
            filters: args.filters.into_iter().collect(),
        }
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

/// `undefined` / `null` は既定値として扱う
fn from_js<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(JsValue::from)
}

/// JSの数値をレコードIDにする（整数以外は拒否）
fn parse_id(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

fn to_id(value: f64) -> Result<i64, JsValue> {
    parse_id(value).ok_or_else(|| JsValue::from_str(&format!("invalid id: {}", value)))
}

#[wasm_bindgen]
pub struct StoreHandle {
    store: DomainStore<FetchTransport>,
    subscriptions: RefCell<Vec<Option<SubscriptionId>>>,
}

#[wasm_bindgen]
impl StoreHandle {
    /// `domain`: incomes / expenses / requisitions / suppliers / products
    #[wasm_bindgen(constructor)]
    pub fn new(base_url: &str, domain: &str) -> Result<StoreHandle, JsValue> {
        let resource = catalog::by_name(domain)
            .ok_or_else(|| JsValue::from_str(&format!("unknown domain: {}", domain)))?;
        let client = ApiClient::new(base_url, FetchTransport, Box::new(browser_credentials(TOKEN_KEY)));
        Ok(StoreHandle {
            store: DomainStore::new(Rc::new(client), resource),
            subscriptions: RefCell::new(Vec::new()),
        })
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.store.state())
    }

    /// 状態が変わるたびに `callback(state)` を呼ぶ。戻り値は解除用の番号
    pub fn subscribe(&self, callback: js_sys::Function) -> usize {
        let id = self.store.subscribe(Box::new(move |state: &DomainStoreState| {
            match to_js(state) {
                Ok(snapshot) => {
                    if let Err(e) = callback.call1(&JsValue::NULL, &snapshot) {
                        tracing::warn!(error = ?e, "store listener threw");
                    }
                }
                Err(e) => tracing::warn!(error = ?e, "failed to serialize store state"),
            }
        }));
        let mut subscriptions = self.subscriptions.borrow_mut();
        subscriptions.push(Some(id));
        subscriptions.len() - 1
    }

    pub fn unsubscribe(&self, handle: usize) -> bool {
        let id = self
            .subscriptions
            .borrow_mut()
            .get_mut(handle)
            .and_then(Option::take);
        id.map(|id| self.store.unsubscribe(id)).unwrap_or(false)
    }

    pub fn list(&self, args: JsValue) -> Result<js_sys::Promise, JsValue> {
        let params: ListParams = from_js::<ListArgs>(args)?.into();
        let store = self.store.clone();
        Ok(future_to_promise(async move {
            store.list(params).await;
            Ok(JsValue::UNDEFINED)
        }))
    }

    pub fn search(&self, term: String) -> js_sys::Promise {
        let store = self.store.clone();
        future_to_promise(async move {
            store.search(&term).await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = changePage)]
    pub fn change_page(&self, page: u32) -> js_sys::Promise {
        let store = self.store.clone();
        future_to_promise(async move {
            store.change_page(page).await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = changePageSize)]
    pub fn change_page_size(&self, page_size: u32) -> js_sys::Promise {
        let store = self.store.clone();
        future_to_promise(async move {
            store.change_page_size(page_size).await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = setFilters)]
    pub fn set_filters(&self, filters: JsValue) -> Result<(), JsValue> {
        let filters: FilterDescriptor = from_js::<Map<String, Value>>(filters)?.into_iter().collect();
        self.store.set_filters(filters);
        Ok(())
    }

    #[wasm_bindgen(js_name = clearError)]
    pub fn clear_error(&self) {
        self.store.clear_error();
    }

    pub fn reset(&self) {
        self.store.reset();
    }

    /// レコードまたは `null` で解決する
    #[wasm_bindgen(js_name = getOne)]
    pub fn get_one(&self, id: f64) -> Result<js_sys::Promise, JsValue> {
        let id = to_id(id)?;
        let store = self.store.clone();
        Ok(future_to_promise(async move { to_js(&store.get_one(id).await) }))
    }

    pub fn create(&self, payload: JsValue) -> Result<js_sys::Promise, JsValue> {
        let payload: Value = from_js(payload)?;
        let store = self.store.clone();
        Ok(future_to_promise(async move { to_js(&store.create(payload).await) }))
    }

    pub fn update(&self, id: f64, payload: JsValue) -> Result<js_sys::Promise, JsValue> {
        let id = to_id(id)?;
        let payload: Value = from_js(payload)?;
        let store = self.store.clone();
        Ok(future_to_promise(async move { to_js(&store.update(id, payload).await) }))
    }

    /// 成否（bool）で解決する
    pub fn remove(&self, id: f64) -> Result<js_sys::Promise, JsValue> {
        let id = to_id(id)?;
        let store = self.store.clone();
        Ok(future_to_promise(async move { Ok(JsValue::from_bool(store.remove(id).await)) }))
    }

    /// `files`: `File` の配列
    #[wasm_bindgen(js_name = uploadAttachments)]
    pub fn upload_attachments(&self, id: f64, files: js_sys::Array) -> Result<js_sys::Promise, JsValue> {
        let id = to_id(id)?;
        let files = files
            .iter()
            .map(|file| file.dyn_into::<web_sys::File>())
            .collect::<Result<Vec<_>, _>>()?;
        let store = self.store.clone();
        Ok(future_to_promise(async move {
            let mut parts = Vec::with_capacity(files.len());
            for file in files {
                let file = gloo::file::File::from(file);
                let bytes = gloo::file::futures::read_as_bytes(&file)
                    .await
                    .map_err(|e| JsValue::from_str(&e.to_string()))?;
                parts.push(FilePart::new(file.name(), bytes));
            }
            to_js(&store.upload_attachments(id, parts).await)
        }))
    }

    /// ダウンロードしてブラウザに保存させる。成否（bool）で解決する
    #[wasm_bindgen(js_name = downloadAttachment)]
    pub fn download_attachment(&self, id: f64, file_name: String) -> Result<js_sys::Promise, JsValue> {
        let id = to_id(id)?;
        let store = self.store.clone();
        Ok(future_to_promise(async move {
            match store.download_attachment(id, &file_name).await {
                Some(bytes) => {
                    save_bytes(&file_name, &bytes)?;
                    Ok(JsValue::TRUE)
                }
                None => Ok(JsValue::FALSE),
            }
        }))
    }

    #[wasm_bindgen(js_name = deleteAttachment)]
    pub fn delete_attachment(&self, id: f64, attachment_id: f64) -> Result<js_sys::Promise, JsValue> {
        let id = to_id(id)?;
        let attachment_id = to_id(attachment_id)?;
        let store = self.store.clone();
        Ok(future_to_promise(async move {
            Ok(JsValue::from_bool(store.delete_attachment(id, attachment_id).await))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_args_into_params() {
        let args: ListArgs = serde_json::from_value(json!({
            "page": 2,
            "pageSize": 25,
            "sortBy": "name",
            "filters": {"status": "Active"}
        }))
        .unwrap();
        let params: ListParams = args.into();
        assert_eq!(params.page, Some(2));
        assert_eq!(params.page_size, Some(25));
        assert_eq!(params.sort_by.as_deref(), Some("name"));
        assert_eq!(params.filters.get("status"), Some(&json!("Active")));
        assert!(params.search.is_none());
    }

    #[test]
    fn test_list_args_default_when_empty() {
        let args: ListArgs = serde_json::from_value(json!({})).unwrap();
        assert_eq!(ListParams::from(args), ListParams::default());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(42.0), Some(42));
        assert_eq!(parse_id(1.5), None);
        assert_eq!(parse_id(f64::NAN), None);
        assert_eq!(parse_id(f64::INFINITY), None);
    }
}
