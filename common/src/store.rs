//! ドメインストア
//!
//! 1ドメイン分の一覧・選択中レコード・読み込み中フラグ・エラー・
//! ページング・フィルタを保持し、CRUD操作を提供する。
//!
//! - 書き込み成功時は再取得せずにキャッシュを直接更新する
//! - 操作はエラーを返さない。失敗は `error` フィールドでだけ観測できる
//! - 一覧取得は呼び出しごとに連番を振り、最新以外のレスポンスは捨てる
//! - 状態は単一スレッドで共有する（`Rc` + `RefCell`、await をまたいで借用しない）

use crate::client::ApiClient;
use crate::envelope::{record_id, ItemEnvelope, ListEnvelope, Record};
use crate::error::Error;
use crate::normalize::normalize_owned;
use crate::pagination::{reconcile, PageRequest, PaginationDescriptor};
use crate::query::{build_query, EffectiveQuery, FilterDescriptor, ListParams, SEARCH_KEY};
use crate::resource::Resource;
use crate::transport::{ApiRequest, FilePart, Method, RequestBody, Transport};
use futures::future::{AbortRegistration, Abortable};
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const ATTACHMENT_FIELDS: &[&str] = &["Attachments", "attachments"];
const UPLOADED_KEYS: &[&str] = &["uploadedAttachments", "UploadedAttachments"];

/// ストアの状態
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStoreState {
    pub list: ListEnvelope,
    pub current_item: Option<Record>,
    pub loading: bool,
    pub error: Option<String>,
    pub pagination: PaginationDescriptor,
    pub filters: FilterDescriptor,
}

impl DomainStoreState {
    /// 初期状態
    pub fn initial(page_size: u32) -> Self {
        Self {
            list: ListEnvelope::empty(),
            current_item: None,
            loading: false,
            error: None,
            pagination: PaginationDescriptor::initial(page_size),
            filters: FilterDescriptor::new(),
        }
    }
}

/// 状態変化の通知先
pub type Listener = Box<dyn Fn(&DomainStoreState)>;

/// `subscribe` が返す登録ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct StoreInner<T> {
    client: Rc<ApiClient<T>>,
    resource: Resource,
    state: RefCell<DomainStoreState>,
    pending: Cell<usize>,
    list_ticket: Cell<u64>,
    listeners: RefCell<Vec<(SubscriptionId, Rc<Listener>)>>,
    next_listener: Cell<u64>,
}

/// ドメインストア（クローンは同じ状態を共有する）
pub struct DomainStore<T> {
    inner: Rc<StoreInner<T>>,
}

impl<T> Clone for DomainStore<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T: Transport> DomainStore<T> {
    pub fn new(client: Rc<ApiClient<T>>, resource: Resource) -> Self {
        let state = DomainStoreState::initial(resource.default_page_size);
        Self {
            inner: Rc::new(StoreInner {
                client,
                resource,
                state: RefCell::new(state),
                pending: Cell::new(0),
                list_ticket: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    // =============================================
    // 状態の参照
    // =============================================

    /// 状態のスナップショット
    pub fn state(&self) -> DomainStoreState {
        self.inner.state.borrow().clone()
    }

    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    pub fn records(&self) -> Vec<Record> {
        self.inner.state.borrow().list.data.clone()
    }

    pub fn current_item(&self) -> Option<Record> {
        self.inner.state.borrow().current_item.clone()
    }

    pub fn pagination(&self) -> PaginationDescriptor {
        self.inner.state.borrow().pagination
    }

    pub fn filters(&self) -> FilterDescriptor {
        self.inner.state.borrow().filters.clone()
    }

    /// 状態が変わるたびにスナップショットを受け取る
    ///
    /// 通知はストアの借用を解放してから行う。
    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    // =============================================
    // 一覧・検索・ページング
    // =============================================

    /// 一覧を取得する
    ///
    /// 明示パラメータがストアのページング・フィルタより優先される。
    pub async fn list(&self, params: ListParams) {
        self.list_with(params, None).await;
    }

    /// 中断可能な一覧取得
    ///
    /// `AbortHandle::abort` された場合、状態は読み込み中フラグ以外変えない。
    pub async fn list_with(&self, params: ListParams, abort: Option<AbortRegistration>) {
        let ticket = self.inner.list_ticket.get() + 1;
        self.inner.list_ticket.set(ticket);

        let (requested, query) = {
            let state = self.inner.state.borrow();
            let requested = PageRequest::resolve(params.page, params.page_size, &state.pagination);
            let query = EffectiveQuery::merge(
                &params,
                &state.filters,
                &self.inner.resource.search_param,
                requested.page,
                requested.page_size,
            );
            (requested, query)
        };
        let url = format!(
            "{}?{}",
            self.inner.client.url(&self.inner.resource.collection_path()),
            build_query(&query, &self.inner.resource.search_param)
        );

        self.begin();
        let call = self.inner.client.call(ApiRequest::get(url));
        let result = match abort {
            Some(registration) => Abortable::new(call, registration)
                .await
                .unwrap_or(Err(Error::Aborted)),
            None => call.await,
        };

        if ticket != self.inner.list_ticket.get() {
            tracing::debug!(resource = %self.inner.resource.plural, ticket, "discarding stale list response");
            self.finish(|_| {});
            return;
        }

        match result {
            Ok(body) => {
                let envelope = ListEnvelope::from_value(body);
                if envelope.success {
                    let pagination = reconcile(envelope.pagination_raw.as_ref(), requested, envelope.data.len());
                    tracing::debug!(
                        resource = %self.inner.resource.plural,
                        items = envelope.data.len(),
                        page = pagination.current_page,
                        "list loaded"
                    );
                    self.finish(|state| {
                        state.list = envelope;
                        state.pagination = pagination;
                        state.error = None;
                    });
                } else {
                    let error = Error::Application(envelope.message.unwrap_or_default());
                    self.fail(error, || self.inner.resource.fetch_list_failed());
                }
            }
            Err(Error::Aborted) => {
                tracing::debug!(resource = %self.inner.resource.plural, "list aborted");
                self.finish(|_| {});
            }
            Err(e) => self.fail(e, || self.inner.resource.fetch_list_failed()),
        }
    }

    /// 検索語を保存して1ページ目から取得し直す
    pub async fn search(&self, term: &str) {
        self.update_state(|state| state.filters.set(SEARCH_KEY, term));
        self.list(ListParams::page(1).with_search(term)).await;
    }

    /// ページを移動する
    pub async fn change_page(&self, page: u32) {
        self.update_state(|state| state.pagination = state.pagination.at_page(page));
        self.list(ListParams::page(page)).await;
    }

    /// ページサイズを変更して1ページ目に戻す
    pub async fn change_page_size(&self, page_size: u32) {
        self.update_state(|state| state.pagination = state.pagination.with_page_size(page_size));
        self.list(ListParams::page(1).with_page_size(page_size)).await;
    }

    /// フィルタを浅くマージする（取得はしない）
    pub fn set_filters(&self, partial: FilterDescriptor) {
        self.update_state(|state| state.filters.merge(&partial));
    }

    /// エラーだけを消す
    pub fn clear_error(&self) {
        self.update_state(|state| state.error = None);
    }

    /// 初期状態に戻す
    ///
    /// 実行中の一覧取得のレスポンスも捨てる。
    pub fn reset(&self) {
        self.inner.list_ticket.set(self.inner.list_ticket.get() + 1);
        let page_size = self.inner.resource.default_page_size;
        let pending = self.inner.pending.get();
        self.update_state(|state| {
            *state = DomainStoreState::initial(page_size);
            state.loading = pending > 0;
        });
    }

    // =============================================
    // CRUD
    // =============================================

    /// 1件取得して選択中レコードにする
    pub async fn get_one(&self, id: i64) -> Option<Record> {
        let url = self.inner.client.url(&self.inner.resource.item_path(id));
        let fallback = self.inner.resource.fetch_one_failed();

        let record = self.item_request(ApiRequest::get(url), fallback).await?;
        let record = match record {
            Some(record) => record,
            None => {
                self.fail(Error::Application(String::new()), || self.inner.resource.fetch_one_failed());
                return None;
            }
        };

        let current = record.clone();
        self.finish(|state| {
            state.current_item = Some(current);
            state.error = None;
        });
        Some(record)
    }

    /// 作成して一覧の末尾に追加する
    pub async fn create(&self, payload: Value) -> Option<Record> {
        let url = self.inner.client.url(&self.inner.resource.collection_path());
        let fallback = self.inner.resource.create_failed();

        let record = match self.item_request(ApiRequest::post_json(url, payload), fallback).await? {
            Some(record) => record,
            None => {
                self.fail(Error::Application(String::new()), || self.inner.resource.create_failed());
                return None;
            }
        };

        let created = record.clone();
        tracing::debug!(resource = %self.inner.resource.name, id = ?record_id(&record), "created");
        self.finish(|state| {
            state.list.data.push(created);
            state.error = None;
        });
        Some(record)
    }

    /// 更新して一覧と選択中レコードを置き換える
    ///
    /// 成功レスポンスにデータが無い場合は送信内容に `Id` を付けたものを使う。
    pub async fn update(&self, id: i64, payload: Value) -> Option<Record> {
        let url = self.inner.client.url(&self.inner.resource.item_path(id));
        let fallback = self.inner.resource.update_failed();

        let record = match self
            .item_request(ApiRequest::put_json(url, payload.clone()), fallback)
            .await?
            .or_else(|| payload_record(payload, id))
        {
            Some(record) => record,
            None => {
                self.fail(Error::Application(String::new()), || self.inner.resource.update_failed());
                return None;
            }
        };

        let updated = record.clone();
        self.finish(|state| {
            for item in state.list.data.iter_mut() {
                if record_id(item) == Some(id) {
                    *item = updated.clone();
                }
            }
            if state.current_item.as_ref().and_then(record_id) == Some(id) {
                state.current_item = Some(updated);
            }
            state.error = None;
        });
        Some(record)
    }

    /// 削除して一覧から取り除く
    pub async fn remove(&self, id: i64) -> bool {
        let url = self.inner.client.url(&self.inner.resource.item_path(id));
        let fallback = self.inner.resource.delete_failed();

        if self.item_request(ApiRequest::delete(url), fallback).await.is_none() {
            return false;
        }

        self.finish(|state| {
            state.list.data.retain(|item| record_id(item) != Some(id));
            if state.current_item.as_ref().and_then(record_id) == Some(id) {
                state.current_item = None;
            }
            state.error = None;
        });
        true
    }

    // =============================================
    // 添付ファイル
    // =============================================

    /// 添付ファイルをアップロードし、キャッシュ中の `Attachments` に追加する
    pub async fn upload_attachments(&self, id: i64, files: Vec<FilePart>) -> Option<Vec<Record>> {
        let url = self.inner.client.url(&self.inner.resource.attachments_path(id));
        let request = ApiRequest::new(Method::Post, url).with_body(RequestBody::Multipart(files));
        let fallback = self.inner.resource.upload_failed();

        let data = self.data_request(request, fallback).await?;
        let uploaded: Vec<Record> = match data {
            Some(Value::Object(mut map)) => {
                let items = UPLOADED_KEYS
                    .iter()
                    .find_map(|key| map.remove(*key))
                    .unwrap_or(Value::Null);
                normalize_owned(items)
            }
            Some(other) => normalize_owned(other),
            None => Vec::new(),
        }
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect();

        let appended = uploaded.clone();
        self.finish(|state| {
            for item in state.list.data.iter_mut().filter(|item| record_id(item) == Some(id)) {
                append_attachments(item, &appended);
            }
            if let Some(current) = state.current_item.as_mut().filter(|c| record_id(c) == Some(id)) {
                append_attachments(current, &appended);
            }
            state.error = None;
        });
        Some(uploaded)
    }

    /// 添付ファイルをバイト列で取得する
    pub async fn download_attachment(&self, id: i64, file_name: &str) -> Option<Vec<u8>> {
        let url = self.inner.client.url(&self.inner.resource.attachment_path(id, file_name));
        self.begin();
        match self.inner.client.call_bytes(ApiRequest::get(url)).await {
            Ok(bytes) => {
                self.finish(|state| state.error = None);
                Some(bytes)
            }
            Err(e) => {
                self.fail(e, || self.inner.resource.download_failed());
                None
            }
        }
    }

    /// 添付ファイルを削除し、キャッシュ中の `Attachments` から取り除く
    pub async fn delete_attachment(&self, id: i64, attachment_id: i64) -> bool {
        let path = self.inner.resource.attachment_path(id, &attachment_id.to_string());
        let url = self.inner.client.url(&path);
        let fallback = self.inner.resource.delete_attachment_failed();

        if self.data_request(ApiRequest::delete(url), fallback).await.is_none() {
            return false;
        }

        self.finish(|state| {
            for item in state.list.data.iter_mut().filter(|item| record_id(item) == Some(id)) {
                remove_attachment(item, attachment_id);
            }
            if let Some(current) = state.current_item.as_mut().filter(|c| record_id(c) == Some(id)) {
                remove_attachment(current, attachment_id);
            }
            state.error = None;
        });
        true
    }

    // =============================================
    // 内部処理
    // =============================================

    /// 単一レコード系の呼び出し
    ///
    /// 失敗時は `error` を設定して None。成功時は `Some(レコード or None)`。
    /// 成功時の読み込み中フラグは呼び出し側の `finish` で下ろす。
    async fn item_request(&self, request: ApiRequest, fallback: String) -> Option<Option<Record>> {
        let data = self.data_request(request, fallback).await?;
        Some(
            data.map(|data| ItemEnvelope { success: true, message: None, data: Some(data) })
                .and_then(ItemEnvelope::into_record),
        )
    }

    async fn data_request(&self, request: ApiRequest, fallback: String) -> Option<Option<Value>> {
        self.begin();
        match self.inner.client.call(request).await {
            Ok(body) => {
                let envelope = ItemEnvelope::from_value(body);
                if envelope.success {
                    Some(envelope.data)
                } else {
                    self.fail(Error::Application(envelope.message.unwrap_or_default()), || fallback);
                    None
                }
            }
            Err(e) => {
                self.fail(e, || fallback);
                None
            }
        }
    }

    fn begin(&self) {
        let pending = self.inner.pending.get() + 1;
        self.inner.pending.set(pending);
        self.update_state(|state| state.loading = true);
    }

    /// 処理を1つ終え、状態を更新する
    fn finish(&self, apply: impl FnOnce(&mut DomainStoreState)) {
        let pending = self.inner.pending.get().saturating_sub(1);
        self.inner.pending.set(pending);
        self.update_state(|state| {
            apply(state);
            state.loading = pending > 0;
        });
    }

    /// 失敗を記録する。メッセージが空なら操作ごとの既定文言を使う
    fn fail(&self, error: Error, fallback: impl FnOnce() -> String) {
        let message = error.to_string();
        let message = if message.trim().is_empty() { fallback() } else { message };
        tracing::warn!(resource = %self.inner.resource.plural, error = %message, "store operation failed");
        self.finish(|state| state.error = Some(message));
    }

    fn update_state(&self, apply: impl FnOnce(&mut DomainStoreState)) {
        let snapshot = {
            let mut state = self.inner.state.borrow_mut();
            apply(&mut state);
            state.clone()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, snapshot: &DomainStoreState) {
        let listeners: Vec<Rc<Listener>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            (**listener)(snapshot);
        }
    }
}

fn payload_record(payload: Value, id: i64) -> Option<Record> {
    match payload {
        Value::Object(mut record) => {
            if record_id(&record).is_none() {
                record.insert("Id".to_string(), Value::from(id));
            }
            Some(record)
        }
        _ => None,
    }
}

fn attachment_key(record: &Record) -> &'static str {
    ATTACHMENT_FIELDS
        .iter()
        .copied()
        .find(|key| record.contains_key(*key))
        .unwrap_or(ATTACHMENT_FIELDS[0])
}

fn append_attachments(record: &mut Record, uploaded: &[Record]) {
    let key = attachment_key(record);
    let mut attachments = normalize_owned(record.remove(key).unwrap_or(Value::Null));
    attachments.extend(uploaded.iter().cloned().map(Value::Object));
    record.insert(key.to_string(), Value::Array(attachments));
}

fn remove_attachment(record: &mut Record, attachment_id: i64) {
    let key = attachment_key(record);
    let Some(existing) = record.remove(key) else {
        return;
    };
    let remaining: Vec<Value> = normalize_owned(existing)
        .into_iter()
        .filter(|item| item.as_object().and_then(record_id) != Some(attachment_id))
        .collect();
    record.insert(key.to_string(), Value::Array(remaining));
}
