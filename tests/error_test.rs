//! エラーケーステスト
//!
//! AppErrorの表示と変換を検証

use erp_admin::error::AppError;
use erp_admin_common::error::{CANNOT_CONNECT_MESSAGE, NETWORK_ERROR_MESSAGE};

/// 共通ライブラリのエラーはメッセージをそのまま表示する
#[test]
fn test_common_error_is_transparent() {
    let err: AppError = erp_admin_common::Error::transport("TypeError: Failed to fetch (ERR_NAME_NOT_RESOLVED)").into();
    assert_eq!(err.to_string(), CANNOT_CONNECT_MESSAGE);

    let err: AppError = erp_admin_common::Error::transport("TypeError: Failed to fetch").into();
    assert_eq!(err.to_string(), NETWORK_ERROR_MESSAGE);
}

/// ストアのエラーは前置きなしで表示する
#[test]
fn test_store_error_display() {
    let err = AppError::Store("Failed to fetch suppliers".to_string());
    assert_eq!(err.to_string(), "Failed to fetch suppliers");
}

/// JSON解析エラーの変換
#[test]
fn test_json_error_conversion() {
    let parse = serde_json::from_str::<serde_json::Value>("{ broken").unwrap_err();
    let err: AppError = parse.into();
    assert!(matches!(err, AppError::JsonParse(_)));
    assert!(err.to_string().starts_with("JSON解析エラー"));
}

/// IOエラーの変換
#[test]
fn test_io_error_conversion() {
    let io = std::fs::read("/nonexistent/path/12345/config.json").unwrap_err();
    let err: AppError = io.into();
    assert!(matches!(err, AppError::Io(_)));
}

/// API URL未設定の案内
#[test]
fn test_missing_api_url_mentions_env_var() {
    let message = AppError::MissingApiUrl.to_string();
    assert!(message.contains("ERP_ADMIN_API_URL"));
    assert!(message.contains("--set-api-url"));
}

/// 確認プロンプトの失敗は入力エラーとして表示する
#[test]
fn test_prompt_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotConnected, "not a terminal");
    let err: AppError = dialoguer::Error::from(io).into();
    assert!(matches!(err, AppError::Prompt(_)));
    assert!(err.to_string().starts_with("入力エラー"));
    assert!(err.to_string().contains("not a terminal"));
}
