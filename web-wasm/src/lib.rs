//! ERP Admin WASM
//!
//! 共通ライブラリのドメインストアを fetch API とブラウザストレージで動かし、
//! `StoreHandle` としてJSに公開する。

mod bindings;
mod credentials;
mod download;
mod fetch;

pub use bindings::StoreHandle;
pub use credentials::{browser_credentials, StorageArea, StorageToken, TOKEN_KEY};
pub use download::{attachment_mime_type, save_bytes};
pub use fetch::{js_error_message, FetchTransport};

use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
}
