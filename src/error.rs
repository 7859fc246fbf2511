use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("API URLが設定されていません。`erp-admin config --set-api-url URL` か環境変数 ERP_ADMIN_API_URL で設定してください")]
    MissingApiUrl,

    #[error("引数が不正です: {0}")]
    InvalidArgument(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("{0}")]
    Store(String),

    #[error("操作を中止しました")]
    Cancelled,

    #[error("入力エラー: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("HTTPクライアントの初期化に失敗: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] erp_admin_common::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
