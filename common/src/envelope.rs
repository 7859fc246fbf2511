//! APIレスポンスのエンベロープ
//!
//! すべてのレスポンスは `{ success, message, data }` の形を想定する。
//! キーの大文字小文字や `$values` ラッパーの有無はここで吸収する。

use crate::normalize::{normalize_fields, normalize_owned, resolve_references, NESTED_LIST_FIELDS};
use crate::pagination::PaginationBlock;
use serde::Serialize;
use serde_json::{Map, Value};

/// ドメインレコード（業務フィールドは解釈しない）
pub type Record = Map<String, Value>;

const SUCCESS_KEYS: &[&str] = &["success", "Success"];
const MESSAGE_KEYS: &[&str] = &["message", "Message"];
const DATA_KEYS: &[&str] = &["data", "Data"];
const PAGINATION_KEYS: &[&str] = &["pagination", "Pagination", "paginations", "Paginations"];
const PAGED_ITEMS_KEYS: &[&str] = &["Items", "items"];
const ID_KEYS: &[&str] = &["Id", "id"];

/// レコードのIDを取得（数値または数値文字列）
pub fn record_id(record: &Record) -> Option<i64> {
    ID_KEYS.iter().find_map(|key| {
        let value = record.get(*key)?;
        if let Some(n) = value.as_i64() {
            return Some(n);
        }
        value.as_str().and_then(|s| s.trim().parse().ok())
    })
}

/// 一覧取得のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEnvelope {
    pub success: bool,
    pub message: Option<String>,
    pub data: Vec<Record>,
    #[serde(skip)]
    pub pagination_raw: Option<PaginationBlock>,
}

impl ListEnvelope {
    /// 任意のレスポンスJSONから読み取る
    ///
    /// - トップレベルが配列（または `$values`）なら成功扱い
    /// - `success` が無ければ成功扱い
    /// - `data` が `Items` を持つオブジェクトなら、それをページングブロックの候補にもする
    pub fn from_value(value: Value) -> Self {
        let value = resolve_references(value);

        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Self {
                    success: true,
                    message: None,
                    data: into_records(normalize_owned(other)),
                    pagination_raw: None,
                };
            }
        };

        let success = get_bool(&map, SUCCESS_KEYS).unwrap_or(true);
        let message = get_string(&map, MESSAGE_KEYS);
        let mut pagination_raw = PAGINATION_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(PaginationBlock::from_value));

        let data = match take_first(&mut map, DATA_KEYS) {
            Some(Value::Object(mut paged)) if has_any(&paged, PAGED_ITEMS_KEYS) => {
                let items = take_first(&mut paged, PAGED_ITEMS_KEYS).unwrap_or(Value::Null);
                if pagination_raw.is_none() {
                    pagination_raw = PaginationBlock::from_value(&Value::Object(paged));
                }
                normalize_owned(items)
            }
            Some(data) => normalize_owned(data),
            None => Vec::new(),
        };

        Self {
            success,
            message,
            data: into_records(data),
            pagination_raw,
        }
    }

    /// 空の一覧（ストア初期状態）
    pub fn empty() -> Self {
        Self::default()
    }
}

/// 単一レコード系のレスポンス
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemEnvelope {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl ItemEnvelope {
    /// 任意のレスポンスJSONから読み取る
    ///
    /// 空本文（204など）は成功・データなしとして扱う。
    pub fn from_value(value: Value) -> Self {
        let value = resolve_references(value);
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Self {
                    success: true,
                    message: None,
                    data: Some(other).filter(|v| !v.is_null()),
                };
            }
        };

        let success = get_bool(&map, SUCCESS_KEYS).unwrap_or(true);
        let message = get_string(&map, MESSAGE_KEYS);
        let data = take_first(&mut map, DATA_KEYS).filter(|v| !v.is_null());
        Self { success, message, data }
    }

    /// dataをレコードとして取り出す（入れ子の配列も正規化）
    pub fn into_record(self) -> Option<Record> {
        match self.data? {
            Value::Object(mut record) => {
                normalize_fields(&mut record, NESTED_LIST_FIELDS);
                Some(record)
            }
            _ => None,
        }
    }
}

/// メッセージフィールドを取得（エラーレスポンスの本文用）
pub fn message_of(value: &Value) -> Option<String> {
    value.as_object().and_then(|map| get_string(map, MESSAGE_KEYS))
}

fn into_records(items: Vec<Value>) -> Vec<Record> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(mut record) => {
                normalize_fields(&mut record, NESTED_LIST_FIELDS);
                Some(record)
            }
            other => {
                tracing::debug!(value = %other, "skipping non-object list element");
                None
            }
        })
        .collect()
}

fn take_first(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|key| map.remove(*key))
}

fn has_any(map: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|key| map.contains_key(*key))
}

fn get_bool(map: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| {
        let value = map.get(*key)?;
        if let Some(b) = value.as_bool() {
            return Some(b);
        }
        value
            .as_str()
            .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"))
    })
}

fn get_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let value = map.get(*key)?;
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =============================================
    // ListEnvelope テスト
    // =============================================

    #[test]
    fn test_list_wrapped_data_with_pagination() {
        let env = ListEnvelope::from_value(json!({
            "success": true,
            "message": null,
            "data": {"$values": [{"Id": 1}, {"Id": 2}]},
            "pagination": {"PageNumber": 1, "PageSize": 10, "TotalItems": 2, "TotalPages": 1}
        }));

        assert!(env.success);
        assert_eq!(env.message, None);
        assert_eq!(env.data.len(), 2);
        assert_eq!(record_id(&env.data[1]), Some(2));
        let block = env.pagination_raw.unwrap();
        assert_eq!(block.current_page, Some(1));
        assert_eq!(block.total_items, Some(2));
    }

    #[test]
    fn test_list_pascal_case_keys_and_paginations() {
        let env = ListEnvelope::from_value(json!({
            "Success": true,
            "Data": [{"Id": 5, "Items": {"$values": [{"Sku": "X"}]}}],
            "Paginations": {"CurrentPage": 2, "PageSize": 1, "TotalItems": 3}
        }));

        assert!(env.success);
        assert_eq!(env.data[0]["Items"], json!([{"Sku": "X"}]));
        assert_eq!(env.pagination_raw.unwrap().current_page, Some(2));
    }

    #[test]
    fn test_list_paged_data_object() {
        let env = ListEnvelope::from_value(json!({
            "success": true,
            "data": {
                "Items": {"$values": [{"Id": 1}]},
                "PageNumber": 4,
                "PageSize": 1,
                "TotalCount": 9
            }
        }));

        assert_eq!(env.data.len(), 1);
        let block = env.pagination_raw.unwrap();
        assert_eq!(block.current_page, Some(4));
        assert_eq!(block.total_items, Some(9));
    }

    #[test]
    fn test_list_bare_array_is_success() {
        let env = ListEnvelope::from_value(json!([{"Id": 1}, 2, "x", {"Id": 3}]));
        assert!(env.success);
        assert_eq!(env.data.len(), 2);
        assert!(env.pagination_raw.is_none());
    }

    #[test]
    fn test_list_failure_envelope() {
        let env = ListEnvelope::from_value(json!({"success": false, "message": "Access denied", "data": null}));
        assert!(!env.success);
        assert_eq!(env.message.as_deref(), Some("Access denied"));
        assert!(env.data.is_empty());
    }

    #[test]
    fn test_list_null_response() {
        let env = ListEnvelope::from_value(Value::Null);
        assert!(env.data.is_empty());
    }

    // =============================================
    // ItemEnvelope テスト
    // =============================================

    #[test]
    fn test_item_into_record_normalizes_attachments() {
        let env = ItemEnvelope::from_value(json!({
            "success": true,
            "data": {"$id": "1", "Id": 3, "Attachments": {"$id": "2", "$values": [{"Id": 8}]}}
        }));

        assert!(env.success);
        let record = env.into_record().unwrap();
        assert_eq!(record_id(&record), Some(3));
        assert_eq!(record["Attachments"], json!([{"Id": 8}]));
        assert!(!record.contains_key("$id"));
    }

    #[test]
    fn test_item_without_data() {
        let env = ItemEnvelope::from_value(json!({"success": true, "message": "Deleted"}));
        assert!(env.success);
        assert_eq!(env.message.as_deref(), Some("Deleted"));
        assert!(env.into_record().is_none());
    }

    #[test]
    fn test_item_empty_body_is_success() {
        let env = ItemEnvelope::from_value(Value::Null);
        assert!(env.success);
        assert!(env.data.is_none());
    }

    #[test]
    fn test_item_success_as_string() {
        let env = ItemEnvelope::from_value(json!({"Success": "false", "Message": "Invalid"}));
        assert!(!env.success);
        assert_eq!(env.message.as_deref(), Some("Invalid"));
    }

    // =============================================
    // ヘルパー テスト
    // =============================================

    #[test]
    fn test_record_id_variants() {
        let numeric = json!({"Id": 99}).as_object().cloned().unwrap();
        let string = json!({"id": " 12 "}).as_object().cloned().unwrap();
        let missing = json!({"Name": "x"}).as_object().cloned().unwrap();
        assert_eq!(record_id(&numeric), Some(99));
        assert_eq!(record_id(&string), Some(12));
        assert_eq!(record_id(&missing), None);
    }

    #[test]
    fn test_message_of() {
        assert_eq!(message_of(&json!({"message": "Bad request"})).as_deref(), Some("Bad request"));
        assert_eq!(message_of(&json!({"Message": "Conflict"})).as_deref(), Some("Conflict"));
        assert_eq!(message_of(&json!({"message": ""})), None);
        assert_eq!(message_of(&json!("text")), None);
    }
}
