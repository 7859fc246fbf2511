//! HTTPアダプタ
//!
//! 1回の呼び出しを行い、失敗を画面表示用のメッセージに正規化する。
//! このレイヤーだけがエラーを返し、ストアがそれを受け止める。

use crate::envelope::message_of;
use crate::error::{Error, Result};
use crate::transport::{
    ApiRequest, PreparedBody, PreparedRequest, RawResponse, RequestBody, TokenSource, Transport,
    MULTIPART_FILE_FIELD,
};
use serde_json::Value;

const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "Content-Type";
const JSON_CONTENT_TYPE: &str = "application/json";

/// APIクライアント
pub struct ApiClient<T> {
    base_url: String,
    transport: T,
    credentials: Box<dyn TokenSource>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(base_url: impl Into<String>, transport: T, credentials: Box<dyn TokenSource>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, transport, credentials }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// パスから絶対URLを作る
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 送信してJSONを受け取る
    ///
    /// - 2xx: 本文をJSONとしてそのまま返す（空本文は `null`）
    /// - 2xx以外: 本文の `message`、なければ `HTTP error <status>`
    /// - 送受信失敗: 定型メッセージに変換
    pub async fn call(&self, request: ApiRequest) -> Result<Value> {
        let response = self.send(request).await?;
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body).map_err(|e| {
            tracing::warn!(error = %e, "response body is not valid JSON");
            Error::Decode(format!("Invalid JSON response: {}", e))
        })
    }

    /// 送信して本文をバイト列のまま受け取る（ファイルダウンロード用）
    pub async fn call_bytes(&self, request: ApiRequest) -> Result<Vec<u8>> {
        let response = self.send(request).await?;
        Ok(response.body)
    }

    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let prepared = self.prepare(request)?;
        let method = prepared.method;
        let url = prepared.url.clone();
        tracing::debug!(%method, %url, "sending request");

        let response = self.transport.execute(prepared).await.map_err(|failure| {
            tracing::warn!(%method, %url, error = %failure, "transport failure");
            Error::transport(&failure.message)
        })?;

        tracing::debug!(%method, %url, status = response.status, "received response");
        if response.is_success() {
            Ok(response)
        } else {
            Err(status_error(&response))
        }
    }

    /// 認証ヘッダーとContent-Typeを注入し、本文をエンコードする
    pub fn prepare(&self, request: ApiRequest) -> Result<PreparedRequest> {
        let ApiRequest { method, url, mut headers, body } = request;

        if let Some(token) = self.credentials.token() {
            headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        }

        let body = match body {
            RequestBody::Multipart(files) => PreparedBody::Multipart {
                field: MULTIPART_FILE_FIELD.to_string(),
                files,
            },
            other => {
                // multipartの境界はトランスポートに任せるため、それ以外のときだけ付与
                headers.insert(CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string());
                match other {
                    RequestBody::Json(value) => PreparedBody::Text(
                        serde_json::to_string(&value).map_err(|e| Error::Decode(e.to_string()))?,
                    ),
                    _ => PreparedBody::Empty,
                }
            }
        };

        Ok(PreparedRequest { method, url, headers, body })
    }
}

fn status_error(response: &RawResponse) -> Error {
    let message = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|body| message_of(&body))
        .unwrap_or_else(|| format!("HTTP error {}", response.status));
    tracing::warn!(status = response.status, %message, "request failed");
    Error::HttpStatus { status: response.status, message }
}
