//! 通信層の抽象
//!
//! 実際の送受信はプラットフォームごとに実装する:
//! - CLI: reqwest
//! - Web: `fetch`（web-sys）
//! - テスト: スクリプト化したモック

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// マルチパートのファイルフィールド名（複数回繰り返す）
pub const MULTIPART_FILE_FIELD: &str = "files";

/// HTTPメソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// アップロードするファイル
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FilePart {
    /// Content-Typeを拡張子から推定して作る
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).map(str::to_string);
        Self { file_name, content_type, bytes }
    }
}

/// 拡張子からContent-Typeを推定する（不明ならNone）
pub fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let mime = match ext.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    };
    Some(mime)
}

/// 呼び出し側が組み立てるリクエスト本文
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Vec<FilePart>),
}

/// 呼び出し側が組み立てるリクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, url).with_body(RequestBody::Json(body))
    }

    pub fn put_json(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, url).with_body(RequestBody::Json(body))
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// エンコード済みの本文
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedBody {
    Empty,
    Text(String),
    Multipart { field: String, files: Vec<FilePart> },
}

/// ヘッダー注入・本文エンコード済みのリクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: PreparedBody,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// 受信したレスポンス（本文は未解釈）
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 送受信そのものの失敗（DNS・接続・ネットワーク）
///
/// メッセージはトランスポートが報告した生の文字列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub message: String,
}

impl TransportFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// 1回の送受信を行う
///
/// リトライ・タイムアウトは行わない。
/// ブラウザのFutureは `Send` でないため `?Send`。
#[async_trait(?Send)]
pub trait Transport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportFailure>;
}

#[async_trait(?Send)]
impl<T: Transport + ?Sized> Transport for std::rc::Rc<T> {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportFailure> {
        (**self).execute(request).await
    }
}

/// 認証トークンの取得元
pub trait TokenSource {
    fn token(&self) -> Option<String>;
}

/// 固定トークン（テスト・明示指定用）
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// セッション側 → 永続側の順でトークンを探す
///
/// 空白だけのトークンは無いものとして扱う。
pub struct CredentialChain {
    sources: Vec<Box<dyn TokenSource>>,
}

impl CredentialChain {
    pub fn new(session: Box<dyn TokenSource>, durable: Box<dyn TokenSource>) -> Self {
        Self { sources: vec![session, durable] }
    }

    /// トークン無し（匿名リクエスト）
    pub fn anonymous() -> Self {
        Self { sources: Vec::new() }
    }
}

impl TokenSource for CredentialChain {
    fn token(&self) -> Option<String> {
        self.sources
            .iter()
            .filter_map(|source| source.token())
            .map(|token| token.trim().to_string())
            .find(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: Option<&str>) -> Box<dyn TokenSource> {
        Box::new(StaticToken(value.map(str::to_string)))
    }

    #[test]
    fn test_chain_prefers_session() {
        let chain = CredentialChain::new(token(Some("session")), token(Some("durable")));
        assert_eq!(chain.token().as_deref(), Some("session"));
    }

    #[test]
    fn test_chain_falls_back_to_durable() {
        let chain = CredentialChain::new(token(None), token(Some("durable")));
        assert_eq!(chain.token().as_deref(), Some("durable"));

        let chain = CredentialChain::new(token(Some("  ")), token(Some("durable")));
        assert_eq!(chain.token().as_deref(), Some("durable"));
    }

    #[test]
    fn test_chain_anonymous() {
        assert_eq!(CredentialChain::anonymous().token(), None);
        let chain = CredentialChain::new(token(None), token(None));
        assert_eq!(chain.token(), None);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("invoice.PDF"), Some("application/pdf"));
        assert_eq!(guess_content_type("scan.final.jpeg"), Some("image/jpeg"));
        assert_eq!(guess_content_type("archive.bin"), None);
        assert_eq!(guess_content_type("README"), None);
        assert_eq!(FilePart::new("a.csv", vec![1]).content_type.as_deref(), Some("text/csv"));
    }

    #[test]
    fn test_raw_response_success_range() {
        let ok = RawResponse { status: 204, body: Vec::new() };
        let redirect = RawResponse { status: 302, body: Vec::new() };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }

    #[test]
    fn test_prepared_header_lookup_ignores_case() {
        let request = PreparedRequest {
            method: Method::Get,
            url: "http://localhost/api".to_string(),
            headers: [("Authorization".to_string(), "Bearer t".to_string())].into_iter().collect(),
            body: PreparedBody::Empty,
        };
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert_eq!(request.header("Content-Type"), None);
    }
}
