//! エラー型定義
//!
//! HTTPアダプタが返すエラーの分類:
//! - Transport: DNS・ネットワーク・接続拒否（定型メッセージに変換済み）
//! - HttpStatus: 2xx以外のレスポンス
//! - Application: `success=false` のエンベロープ
//!
//! `Display` は画面表示用のメッセージそのものを返す。
//! ストアはこの文字列を `error` フィールドにそのまま格納する。

use thiserror::Error;

/// 名前解決に失敗したときのメッセージ
pub const CANNOT_CONNECT_MESSAGE: &str =
    "Cannot connect to API server. Please check your internet connection or contact administrator.";

/// 接続拒否時のメッセージ
pub const CONNECTION_REFUSED_MESSAGE: &str =
    "Connection refused. The server might be down or unreachable.";

/// 一般的なネットワークエラーのメッセージ
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error. Please check your internet connection and try again.";

const NAME_RESOLUTION_MARKERS: &[&str] = &[
    "err_name_not_resolved",
    "dns error",
    "failed to lookup address",
    "name or service not known",
];

const CONNECTION_REFUSED_MARKERS: &[&str] = &[
    "err_connection_refused",
    "connection refused",
    "econnrefused",
];

const NETWORK_MARKERS: &[&str] = &[
    "failed to fetch",
    "networkerror",
    "network request failed",
    "error sending request",
];

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Transport(String),

    #[error("{message}")]
    HttpStatus { status: u16, message: String },

    #[error("{0}")]
    Application(String),

    #[error("{0}")]
    Decode(String),

    #[error("Request was cancelled")]
    Aborted,
}

impl Error {
    /// トランスポート層の生エラー文字列から分類済みエラーを作る
    pub fn transport(raw: &str) -> Self {
        Error::Transport(classify_transport_message(raw))
    }

    /// HTTPステータスコード（HttpStatus以外はNone）
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// トランスポートエラーの文字列を定型メッセージに変換
///
/// 判定順: 名前解決 → 接続拒否 → 一般ネットワーク。
/// どれにも該当しない場合は元の文字列をそのまま返す。
///
/// # Examples
/// ```
/// use erp_admin_common::error::{classify_transport_message, CANNOT_CONNECT_MESSAGE};
///
/// let message = classify_transport_message("TypeError: Failed to fetch (ERR_NAME_NOT_RESOLVED)");
/// assert_eq!(message, CANNOT_CONNECT_MESSAGE);
/// ```
pub fn classify_transport_message(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let matches = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));

    if matches(NAME_RESOLUTION_MARKERS) {
        CANNOT_CONNECT_MESSAGE.to_string()
    } else if matches(CONNECTION_REFUSED_MARKERS) {
        CONNECTION_REFUSED_MESSAGE.to_string()
    } else if matches(NETWORK_MARKERS) {
        NETWORK_ERROR_MESSAGE.to_string()
    } else {
        raw.to_string()
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
