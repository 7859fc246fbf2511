//! 参照保持シリアライズの正規化
//!
//! バックエンドのJSONシリアライザは参照を保持するモードで動いており、
//! 配列が `{"$values": [...]}` で包まれたり、オブジェクトに `$id` が付いて
//! 2回目以降の出現が `{"$ref": "n"}` になったりする。
//! ここではそれを素の配列・オブジェクトに戻す。

use serde_json::{Map, Value};
use std::collections::HashMap;

/// 配列ラッパーのキー
pub const VALUES_KEY: &str = "$values";
const ID_KEY: &str = "$id";
const REF_KEY: &str = "$ref";

/// レコード内で配列として扱うフィールド
pub const NESTED_LIST_FIELDS: &[&str] = &["Items", "items", "Attachments", "attachments"];

/// 配列として期待される値を素の配列に変換
///
/// - 配列 → そのまま
/// - `{"$values": [...]}` → 中身
/// - null・その他の形 → 空
///
/// # Examples
/// ```
/// use erp_admin_common::normalize::normalize;
/// use serde_json::json;
///
/// assert_eq!(normalize(&json!({"$values": [1, 2, 3]})), vec![json!(1), json!(2), json!(3)]);
/// assert_eq!(normalize(&json!([1, 2, 3])), vec![json!(1), json!(2), json!(3)]);
/// assert!(normalize(&json!(null)).is_empty());
/// ```
pub fn normalize(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get(VALUES_KEY) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// `normalize` の所有権を取る版（クローンしない）
pub fn normalize_owned(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(VALUES_KEY) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// レコードの指定フィールドを素の配列に書き換える
///
/// 存在しないフィールドは追加しない。
pub fn normalize_fields(record: &mut Map<String, Value>, fields: &[&str]) {
    for field in fields {
        if let Some(value) = record.get_mut(*field) {
            let items = normalize_owned(value.take());
            *value = Value::Array(items);
        }
    }
}

/// レスポンス全体の参照グラフを解決する
///
/// - `$id` は取り除く
/// - `{"$ref": "n"}` は文書順で先に現れた `$id: "n"` のオブジェクトの複製に置き換える
///   （まだ現れていない参照、つまり循環参照はそのまま残す）
/// - `$values` ラッパーはすべて配列に展開する
pub fn resolve_references(value: Value) -> Value {
    let mut seen = HashMap::new();
    resolve_value(value, &mut seen)
}

fn resolve_value(value: Value, seen: &mut HashMap<String, Value>) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items.into_iter().map(|item| resolve_value(item, seen)).collect(),
        ),
        Value::Object(map) => resolve_object(map, seen),
        other => other,
    }
}

fn resolve_object(mut map: Map<String, Value>, seen: &mut HashMap<String, Value>) -> Value {
    if map.len() == 1 {
        if let Some(reference) = map.get(REF_KEY).and_then(reference_key) {
            if let Some(target) = seen.get(&reference) {
                return target.clone();
            }
            return Value::Object(map);
        }
    }

    let id = map.remove(ID_KEY).as_ref().and_then(reference_key);

    // $id + $values だけのオブジェクトは参照付きの配列
    if let Some(Value::Array(_)) = map.get(VALUES_KEY) {
        let items = normalize_owned(Value::Object(map));
        let resolved = resolve_value(Value::Array(items), seen);
        if let Some(id) = id {
            seen.insert(id, resolved.clone());
        }
        return resolved;
    }

    let resolved: Map<String, Value> = map
        .into_iter()
        .map(|(key, value)| {
            let value = resolve_value(value, seen);
            (key, value)
        })
        .collect();
    let resolved = Value::Object(resolved);

    if let Some(id) = id {
        seen.insert(id, resolved.clone());
    }
    resolved
}

fn reference_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =============================================
    // normalize テスト
    // =============================================

    #[test]
    fn test_normalize_wrapped() {
        let value = json!({"$values": [1, 2, 3]});
        assert_eq!(normalize(&value), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_normalize_plain() {
        let value = json!([1, 2, 3]);
        assert_eq!(normalize(&value), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_normalize_null_and_unknown_shapes() {
        assert!(normalize(&Value::Null).is_empty());
        assert!(normalize(&json!("text")).is_empty());
        assert!(normalize(&json!(42)).is_empty());
        assert!(normalize(&json!({"Id": 1})).is_empty());
        assert!(normalize(&json!({"$values": "not an array"})).is_empty());
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = vec![
            json!([]),
            json!([{"Id": 1}, {"Id": 2}]),
            json!(["a", null, 3]),
        ];
        for x in samples {
            let wrapped = json!({ "$values": x.clone() });
            let once = Value::Array(normalize(&wrapped));
            assert_eq!(normalize(&once), normalize(&x));
            assert_eq!(normalize_owned(wrapped), normalize(&x));
        }
    }

    #[test]
    fn test_normalize_fields() {
        let mut record = json!({
            "Id": 7,
            "Items": {"$values": [{"Sku": "A"}]},
            "Attachments": null,
            "Name": "Requisition"
        })
        .as_object()
        .cloned()
        .unwrap();

        normalize_fields(&mut record, NESTED_LIST_FIELDS);

        assert_eq!(record["Items"], json!([{"Sku": "A"}]));
        assert_eq!(record["Attachments"], json!([]));
        assert_eq!(record["Name"], json!("Requisition"));
        assert!(!record.contains_key("items"));
    }

    // =============================================
    // resolve_references テスト
    // =============================================

    #[test]
    fn test_resolve_strips_ids_and_values() {
        let value = json!({
            "$id": "1",
            "success": true,
            "data": {"$id": "2", "$values": [
                {"$id": "3", "Id": 10, "Name": "Acme"}
            ]}
        });

        let resolved = resolve_references(value);
        assert_eq!(
            resolved,
            json!({"success": true, "data": [{"Id": 10, "Name": "Acme"}]})
        );
    }

    #[test]
    fn test_resolve_refs_to_earlier_objects() {
        let value = json!({"$values": [
            {"$id": "1", "Id": 1, "Supplier": {"$id": "2", "Id": 5, "Name": "Acme"}},
            {"$id": "3", "Id": 2, "Supplier": {"$ref": "2"}}
        ]});

        let resolved = resolve_references(value);
        assert_eq!(resolved[1]["Supplier"], json!({"Id": 5, "Name": "Acme"}));
        assert_eq!(resolved[0]["Supplier"], resolved[1]["Supplier"]);
    }

    #[test]
    fn test_resolve_leaves_cyclic_refs() {
        let value = json!({"$id": "1", "Id": 1, "Parent": {"$ref": "1"}});
        let resolved = resolve_references(value);
        assert_eq!(resolved["Parent"], json!({"$ref": "1"}));
        assert_eq!(resolved["Id"], json!(1));
    }

    #[test]
    fn test_resolve_plain_json_unchanged() {
        let value = json!({"success": true, "data": [{"Id": 1, "Tags": ["a", "b"]}]});
        assert_eq!(resolve_references(value.clone()), value);
    }
}
