//! ダウンロードしたバイト列をブラウザで保存させる

use erp_admin_common::guess_content_type;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

const FALLBACK_MIME: &str = "application/octet-stream";

/// 保存時のMIMEタイプ
pub fn attachment_mime_type(file_name: &str) -> &'static str {
    guess_content_type(file_name).unwrap_or(FALLBACK_MIME)
}

/// 保存ダイアログ用のファイル名（パス部分を除く）
pub fn save_as_name(file_name: &str) -> &str {
    file_name
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or("attachment")
}

/// Blob URLを作ってアンカーのクリックで保存する
pub fn save_bytes(file_name: &str, bytes: &[u8]) -> Result<(), JsValue> {
    let array = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::of1(&array);
    let bag = BlobPropertyBag::new();
    bag.set_type(attachment_mime_type(file_name));
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &bag)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("document is not available"))?;
    let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(save_as_name(file_name));
    anchor.click();

    Url::revoke_object_url(&url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_mime_type() {
        assert_eq!(attachment_mime_type("receipt.pdf"), "application/pdf");
        assert_eq!(attachment_mime_type("photo.JPG"), "image/jpeg");
        assert_eq!(attachment_mime_type("data.bin"), FALLBACK_MIME);
    }

    #[test]
    fn test_save_as_name() {
        assert_eq!(save_as_name("uploads/2024/receipt.pdf"), "receipt.pdf");
        assert_eq!(save_as_name("receipt.pdf"), "receipt.pdf");
        assert_eq!(save_as_name("/"), "attachment");
    }
}
