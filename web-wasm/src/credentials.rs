//! ブラウザストレージのトークン
//!
//! sessionStorage（タブ単位）→ localStorage（永続）の順に探す。

use erp_admin_common::{CredentialChain, TokenSource};
use gloo::storage::{LocalStorage, SessionStorage, Storage};

/// トークンを保存しているキー
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    Session,
    Local,
}

/// ストレージの1キーを読むトークン取得元
pub struct StorageToken {
    area: StorageArea,
    key: String,
}

impl StorageToken {
    pub fn new(area: StorageArea, key: &str) -> Self {
        Self { area, key: key.to_string() }
    }
}

impl TokenSource for StorageToken {
    fn token(&self) -> Option<String> {
        // 生の文字列で保存されているため JSON として読まない
        let storage = match self.area {
            StorageArea::Session => SessionStorage::raw(),
            StorageArea::Local => LocalStorage::raw(),
        };
        storage.get_item(&self.key).ok().flatten()
    }
}

/// ブラウザの既定チェーン
pub fn browser_credentials(key: &str) -> CredentialChain {
    CredentialChain::new(
        Box::new(StorageToken::new(StorageArea::Session, key)),
        Box::new(StorageToken::new(StorageArea::Local, key)),
    )
}
