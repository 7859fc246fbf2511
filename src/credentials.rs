//! 認証トークンの取得元
//!
//! セッション側: 環境変数 `ERP_ADMIN_TOKEN`
//! 永続側: 設定ファイルの `token`

use crate::config::{Config, TOKEN_ENV};
use erp_admin_common::{CredentialChain, TokenSource};

/// 環境変数から読むトークン
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: &str) -> Self {
        Self { var: var.to_string() }
    }
}

impl TokenSource for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

/// 設定ファイルに保存されたトークン
pub struct ConfigToken {
    token: Option<String>,
}

impl ConfigToken {
    pub fn new(config: &Config) -> Self {
        Self { token: config.token.clone() }
    }
}

impl TokenSource for ConfigToken {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// CLIの既定チェーン（環境変数 → 設定ファイル）
pub fn credential_chain(config: &Config) -> CredentialChain {
    CredentialChain::new(Box::new(EnvToken::new(TOKEN_ENV)), Box::new(ConfigToken::new(config)))
}
