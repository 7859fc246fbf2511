//! reqwestによるトランスポート
//!
//! 送受信だけを担当する。ヘッダー注入やエラーの分類は共通ライブラリ側で行う。

use async_trait::async_trait;
use erp_admin_common::{Method, PreparedBody, PreparedRequest, RawResponse, Transport, TransportFailure};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::error::Error as StdError;

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// タイムアウトは設定しない（1回の送信のみ）
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("erp-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// 構築済みのクライアントを使う（プロキシ設定などを呼び出し側で決める場合）
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportFailure> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            PreparedBody::Empty => builder,
            PreparedBody::Text(text) => builder.body(text),
            PreparedBody::Multipart { field, files } => {
                let mut form = Form::new();
                for file in files {
                    let mut part = Part::bytes(file.bytes).file_name(file.file_name);
                    if let Some(content_type) = file.content_type {
                        part = part
                            .mime_str(&content_type)
                            .map_err(|e| TransportFailure::new(error_chain(&e)))?;
                    }
                    form = form.part(field.clone(), part);
                }
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportFailure::new(error_chain(&e)))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportFailure::new(error_chain(&e)))?;

        Ok(RawResponse { status, body: body.to_vec() })
    }
}

/// エラーと原因をすべて連結する
///
/// reqwestの `Display` は原因（DNS・接続拒否など）を含まないため、分類用に展開する。
pub fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layer {
        text: &'static str,
        source: Option<Box<Layer>>,
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.text)
        }
    }

    impl StdError for Layer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.source.as_deref().map(|s| s as &(dyn StdError + 'static))
        }
    }

    #[test]
    fn test_error_chain_joins_sources() {
        let error = Layer {
            text: "error sending request",
            source: Some(Box::new(Layer {
                text: "client error (Connect)",
                source: Some(Box::new(Layer { text: "Connection refused (os error 111)", source: None })),
            })),
        };
        assert_eq!(
            error_chain(&error),
            "error sending request: client error (Connect): Connection refused (os error 111)"
        );
    }

    #[test]
    fn test_error_chain_skips_repeated_text() {
        let error = Layer {
            text: "dns error: failed to lookup address",
            source: Some(Box::new(Layer { text: "failed to lookup address", source: None })),
        };
        assert_eq!(error_chain(&error), "dns error: failed to lookup address");
    }
}
