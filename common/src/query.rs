//! 検索条件とクエリ文字列

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 検索語のキー
pub const SEARCH_KEY: &str = "search";
/// ソート項目のキー
pub const SORT_BY_KEY: &str = "sortBy";
/// 昇順フラグのキー
pub const SORT_ASCENDING_KEY: &str = "sortAscending";

const RESERVED_KEYS: &[&str] = &[SEARCH_KEY, SORT_BY_KEY, SORT_ASCENDING_KEY, "page", "pageSize"];

/// フィルタ条件（キー → 値）
///
/// 中身は検証しない。更新は丸ごと置き換えるか浅くマージする。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterDescriptor(BTreeMap<String, Value>);

impl FilterDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// 浅いマージ（`other` の値が優先）
    pub fn merge(&mut self, other: &FilterDescriptor) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// 検索語
    pub fn search(&self) -> Option<&str> {
        self.get(SEARCH_KEY).and_then(Value::as_str)
    }

    /// 検索語（`search` が無ければドメイン固有の検索キーを見る）
    pub fn search_term(&self, search_param: &str) -> Option<&str> {
        [SEARCH_KEY, search_param]
            .into_iter()
            .filter_map(|key| self.get(key).and_then(Value::as_str))
            .find(|term| !term.trim().is_empty())
    }

    /// ソート項目
    pub fn sort_by(&self) -> Option<&str> {
        self.get(SORT_BY_KEY).and_then(Value::as_str)
    }

    /// 昇順フラグ
    pub fn sort_ascending(&self) -> Option<bool> {
        self.get(SORT_ASCENDING_KEY).and_then(Value::as_bool)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FilterDescriptor {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// list呼び出しの明示パラメータ（未指定はストアの現在値を使う）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_ascending: Option<bool>,
    pub filters: FilterDescriptor,
}

impl ListParams {
    pub fn page(page: u32) -> Self {
        Self { page: Some(page), ..Default::default() }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

/// 実際に送る条件（明示パラメータとストア既定値をマージ済み）
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_ascending: Option<bool>,
    pub filters: FilterDescriptor,
}

impl EffectiveQuery {
    /// 明示パラメータ優先でストアのフィルタとマージする
    ///
    /// `search_param` 名で保存された検索語も検索語として扱う。
    pub fn merge(
        params: &ListParams,
        stored: &FilterDescriptor,
        search_param: &str,
        page: u32,
        page_size: u32,
    ) -> Self {
        let mut filters = stored.clone();
        filters.merge(&params.filters);
        Self {
            page,
            page_size,
            search: params.search.clone().or_else(|| filters.search_term(search_param).map(str::to_string)),
            sort_by: params.sort_by.clone().or_else(|| filters.sort_by().map(str::to_string)),
            sort_ascending: params.sort_ascending.or_else(|| filters.sort_ascending()),
            filters,
        }
    }
}

/// クエリ文字列を組み立てる
///
/// 順序: page, pageSize, 検索語, sortBy, sortAscending, その他フィルタ（キー順）。
/// null・空文字は送らない。
///
/// # Examples
/// ```
/// use erp_admin_common::query::{build_query, EffectiveQuery, FilterDescriptor};
///
/// let query = EffectiveQuery {
///     page: 2,
///     page_size: 10,
///     search: Some("office chair".to_string()),
///     sort_by: None,
///     sort_ascending: None,
///     filters: FilterDescriptor::new(),
/// };
/// assert_eq!(build_query(&query, "search"), "page=2&pageSize=10&search=office+chair");
/// ```
pub fn build_query(query: &EffectiveQuery, search_param: &str) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("page", &query.page.to_string());
    serializer.append_pair("pageSize", &query.page_size.to_string());

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        serializer.append_pair(search_param, search);
    }
    if let Some(sort_by) = query.sort_by.as_deref().filter(|s| !s.is_empty()) {
        serializer.append_pair(SORT_BY_KEY, sort_by);
    }
    if let Some(ascending) = query.sort_ascending {
        serializer.append_pair(SORT_ASCENDING_KEY, if ascending { "true" } else { "false" });
    }

    for (key, value) in query.filters.iter() {
        if RESERVED_KEYS.contains(&key.as_str()) || key == search_param {
            continue;
        }
        if let Some(text) = query_value(value) {
            serializer.append_pair(key, &text);
        }
    }

    serializer.finish()
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
