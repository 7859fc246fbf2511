//! サブコマンドの実行
//!
//! 各コマンドはドメインストアを1回操作し、結果をJSONで返す。
//! ストアはエラーを状態に格納するだけなので、ここで `AppError::Store` に戻す。

use crate::cli::{DomainArg, PayloadArgs};
use crate::config::Config;
use crate::credentials::credential_chain;
use crate::error::{AppError, Result};
use crate::http::ReqwestTransport;
use erp_admin_common::{ApiClient, DomainStore, FilePart, FilterDescriptor, ListParams, Transport};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// `list` の引数
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub desc: bool,
    pub filters: Vec<(String, String)>,
}

/// reqwestクライアントを組み立てる
pub fn build_client(config: &Config, api_url: Option<&str>) -> Result<Rc<ApiClient<ReqwestTransport>>> {
    let base_url = config.api_base_url(api_url)?;
    let transport = ReqwestTransport::new()?;
    tracing::debug!(%base_url, "API client ready");
    Ok(Rc::new(ApiClient::new(base_url, transport, Box::new(credential_chain(config)))))
}

/// 1ドメイン分のストアを開く
pub fn open_store(config: &Config, api_url: Option<&str>, domain: DomainArg) -> Result<DomainStore<ReqwestTransport>> {
    let client = build_client(config, api_url)?;
    let resource = domain.resource().with_page_size(config.default_page_size);
    Ok(DomainStore::new(client, resource))
}

fn store_failure<T: Transport>(store: &DomainStore<T>) -> AppError {
    AppError::Store(
        store
            .error()
            .unwrap_or_else(|| format!("{}の操作に失敗しました", store.resource().plural)),
    )
}

/// 一覧を取得する
pub async fn list<T: Transport>(store: &DomainStore<T>, options: ListOptions) -> Result<Value> {
    let resource = store.resource();
    let mut filters = FilterDescriptor::new();
    for (key, value) in options.filters {
        if !resource.is_filter_key(&key) {
            tracing::warn!(resource = %resource.plural, %key, "unknown filter key, sending as-is");
        }
        filters.set(key, filter_value(&value));
    }
    if !filters.is_empty() {
        store.set_filters(filters);
    }

    let params = ListParams {
        page: options.page,
        page_size: options.page_size,
        search: options.search,
        sort_ascending: options.sort_by.as_ref().map(|_| !options.desc),
        sort_by: options.sort_by,
        filters: FilterDescriptor::new(),
    };
    store.list(params).await;

    if let Some(message) = store.error() {
        return Err(AppError::Store(message));
    }
    Ok(json!({
        "data": store.records(),
        "pagination": store.pagination(),
    }))
}

/// 1件取得する
pub async fn get<T: Transport>(store: &DomainStore<T>, id: i64) -> Result<Value> {
    store
        .get_one(id)
        .await
        .map(Value::Object)
        .ok_or_else(|| store_failure(store))
}

/// 作成する
pub async fn create<T: Transport>(store: &DomainStore<T>, payload: Value) -> Result<Value> {
    store
        .create(payload)
        .await
        .map(Value::Object)
        .ok_or_else(|| store_failure(store))
}

/// 更新する
pub async fn update<T: Transport>(store: &DomainStore<T>, id: i64, payload: Value) -> Result<Value> {
    store
        .update(id, payload)
        .await
        .map(Value::Object)
        .ok_or_else(|| store_failure(store))
}

/// 削除する
pub async fn delete<T: Transport>(store: &DomainStore<T>, id: i64) -> Result<()> {
    if store.remove(id).await {
        Ok(())
    } else {
        Err(store_failure(store))
    }
}

/// ファイルを読み込んで添付する
pub async fn attach<T: Transport>(store: &DomainStore<T>, id: i64, files: &[PathBuf]) -> Result<Value> {
    let parts = files.iter().map(|path| read_file_part(path)).collect::<Result<Vec<_>>>()?;
    let uploaded = store
        .upload_attachments(id, parts)
        .await
        .ok_or_else(|| store_failure(store))?;
    Ok(Value::Array(uploaded.into_iter().map(Value::Object).collect()))
}

/// 添付ファイルを保存する
pub async fn download<T: Transport>(
    store: &DomainStore<T>,
    id: i64,
    file_name: &str,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let bytes = store
        .download_attachment(id, file_name)
        .await
        .ok_or_else(|| store_failure(store))?;

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(local_file_name(file_name)),
    };
    std::fs::write(&path, bytes)?;
    Ok(path)
}

/// 添付ファイルを削除する
pub async fn detach<T: Transport>(store: &DomainStore<T>, id: i64, attachment_id: i64) -> Result<()> {
    if store.delete_attachment(id, attachment_id).await {
        Ok(())
    } else {
        Err(store_failure(store))
    }
}

/// 削除の確認
pub fn confirm_delete(domain: DomainArg, id: i64) -> Result<bool> {
    let resource = domain.resource();
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!("{} #{} を削除しますか？", resource.name, id))
        .default(false)
        .interact()?;
    Ok(confirmed)
}

/// `--data` / `--file` からJSONオブジェクトを読む
pub fn read_payload(args: &PayloadArgs) -> Result<Value> {
    let text = match (&args.data, &args.file) {
        (Some(data), _) => data.clone(),
        (None, Some(path)) => {
            if !path.exists() {
                return Err(AppError::FileNotFound(path.display().to_string()));
            }
            std::fs::read_to_string(path)?
        }
        (None, None) => return Err(AppError::InvalidArgument("--data か --file を指定してください".into())),
    };

    let payload: Value = serde_json::from_str(&text)?;
    if !payload.is_object() {
        return Err(AppError::InvalidArgument("本文はJSONオブジェクトで指定してください".into()));
    }
    Ok(payload)
}

/// `config` サブコマンド
///
/// 変更があれば保存する。表示は変更後の内容。
pub fn configure(
    config: &mut Config,
    set_token: Option<String>,
    clear_token: bool,
    set_api_url: Option<String>,
) -> Result<bool> {
    let mut changed = false;
    if let Some(url) = set_api_url {
        config.set_api_base_url(url)?;
        changed = true;
    }
    if clear_token {
        config.clear_token();
        changed = true;
    } else if let Some(token) = set_token {
        config.set_token(token);
        changed = true;
    }
    Ok(changed)
}

/// 有効な設定の表示内容
pub fn describe_config(config: &Config, api_url: Option<&str>) -> String {
    let url = match config.api_base_url(api_url) {
        Ok(url) => url,
        Err(_) => "未設定".to_string(),
    };
    let session = match std::env::var(crate::config::TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => "設定あり（優先）",
        _ => "未設定",
    };
    format!(
        "API URL: {}\nトークン（設定ファイル）: {}\nトークン（{}）: {}\nページサイズ: {}",
        url,
        config.masked_token(),
        crate::config::TOKEN_ENV,
        session,
        config.default_page_size
    )
}

/// 絞り込み値の型を推定する（真偽値だけ変換）
fn filter_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}

fn read_file_part(path: &Path) -> Result<FilePart> {
    if !path.is_file() {
        return Err(AppError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::InvalidArgument(path.display().to_string()))?;
    Ok(FilePart::new(file_name, bytes))
}

/// サーバー上の名前からディレクトリ部分を除く
fn local_file_name(file_name: &str) -> String {
    file_name
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or("attachment")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_value() {
        assert_eq!(filter_value("true"), Value::Bool(true));
        assert_eq!(filter_value("USD"), Value::String("USD".into()));
    }

    #[test]
    fn test_local_file_name() {
        assert_eq!(local_file_name("receipt.pdf"), "receipt.pdf");
        assert_eq!(local_file_name("../../etc/passwd"), "passwd");
        assert_eq!(local_file_name("dir\\scan.png"), "scan.png");
        assert_eq!(local_file_name("/"), "attachment");
    }

    #[test]
    fn test_read_payload_requires_object() {
        let args = PayloadArgs { data: Some("[1,2]".into()), file: None };
        assert!(matches!(read_payload(&args), Err(AppError::InvalidArgument(_))));

        let args = PayloadArgs { data: Some(r#"{"Name":"Bolt"}"#.into()), file: None };
        assert_eq!(read_payload(&args).unwrap()["Name"], "Bolt");
    }

    #[test]
    fn test_read_payload_missing_file() {
        let args = PayloadArgs { data: None, file: Some(PathBuf::from("/nonexistent/payload.json")) };
        assert!(matches!(read_payload(&args), Err(AppError::FileNotFound(_))));
    }

    #[test]
    fn test_configure_clear_wins_over_set() {
        let mut config = Config::default();
        config.set_token("old-token".into());
        let changed = configure(&mut config, Some("new".into()), true, None).unwrap();
        assert!(changed);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_configure_rejects_bad_url() {
        let mut config = Config::default();
        assert!(configure(&mut config, None, false, Some("nope".into())).is_err());
        assert!(!configure(&mut config, None, false, None).unwrap());
    }
}
