//! fetch APIによるトランスポート
//!
//! 失敗時のメッセージはJSの `Error` の `name: message`（例: `TypeError: Failed to fetch`）。
//! 分類は共通ライブラリ側で行う。

use async_trait::async_trait;
use erp_admin_common::{PreparedBody, PreparedRequest, RawResponse, Transport, TransportFailure};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, FormData, Request, RequestInit, RequestMode, Response};

#[derive(Debug, Default, Clone, Copy)]
pub struct FetchTransport;

#[async_trait(?Send)]
impl Transport for FetchTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportFailure> {
        send(request).await.map_err(|e| TransportFailure::new(js_error_message(&e)))
    }
}

async fn send(prepared: PreparedRequest) -> Result<RawResponse, JsValue> {
    let opts = RequestInit::new();
    opts.set_method(prepared.method.as_str());
    opts.set_mode(RequestMode::Cors);

    match prepared.body {
        PreparedBody::Empty => {}
        PreparedBody::Text(text) => opts.set_body(&JsValue::from_str(&text)),
        PreparedBody::Multipart { field, files } => {
            let form = FormData::new()?;
            for file in files {
                let bytes = js_sys::Uint8Array::from(file.bytes.as_slice());
                let parts = js_sys::Array::of1(&bytes);
                let bag = BlobPropertyBag::new();
                if let Some(content_type) = &file.content_type {
                    bag.set_type(content_type);
                }
                let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &bag)?;
                form.append_with_blob_and_filename(&field, &blob, &file.file_name)?;
            }
            opts.set_body(&form);
        }
    }

    let request = Request::new_with_str_and_init(&prepared.url, &opts)?;
    for (name, value) in &prepared.headers {
        request.headers().set(name, value)?;
    }

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window is not available"))?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request)).await?;
    let resp: Response = resp_value.dyn_into()?;
    let status = resp.status();

    let buffer = JsFuture::from(resp.array_buffer()?).await?;
    let body = js_sys::Uint8Array::new(&buffer).to_vec();

    Ok(RawResponse { status, body })
}

/// JSの例外を文字列にする
pub fn js_error_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        let name = String::from(error.name());
        let message = String::from(error.message());
        return join_error_parts(&name, &message);
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn join_error_parts(name: &str, message: &str) -> String {
    match (name.is_empty(), message.is_empty()) {
        (true, _) => message.to_string(),
        (false, true) => name.to_string(),
        (false, false) => format!("{}: {}", name, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_error_parts() {
        assert_eq!(join_error_parts("TypeError", "Failed to fetch"), "TypeError: Failed to fetch");
        assert_eq!(join_error_parts("", "Failed to fetch"), "Failed to fetch");
        assert_eq!(join_error_parts("AbortError", ""), "AbortError");
    }
}
