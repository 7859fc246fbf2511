//! リソース定義
//!
//! ドメインごとのベースパス・検索パラメータ名・既定メッセージ。

/// 既定のページサイズ
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// 1つのRESTリソース
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// 単数形（メッセージ用、例: "income"）
    pub name: String,
    /// 複数形（メッセージ用、例: "incomes"）
    pub plural: String,
    /// ベースパス（例: "/api/finance/incomes"）
    pub path: String,
    /// 検索語のクエリパラメータ名（"search" または "searchTerm"）
    pub search_param: String,
    pub default_page_size: u32,
    /// ドメイン固有のフィルタキー
    pub filter_keys: Vec<String>,
}

impl Resource {
    pub fn new(name: &str, plural: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            plural: plural.to_string(),
            path: path.trim_end_matches('/').to_string(),
            search_param: "search".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            filter_keys: Vec::new(),
        }
    }

    pub fn with_search_param(mut self, param: &str) -> Self {
        self.search_param = param.to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = page_size;
        self
    }

    pub fn with_filters(mut self, keys: &[&str]) -> Self {
        self.filter_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// 一覧・作成のパス
    pub fn collection_path(&self) -> String {
        self.path.clone()
    }

    /// 個別レコードのパス
    pub fn item_path(&self, id: i64) -> String {
        format!("{}/{}", self.path, id)
    }

    /// 添付ファイル一覧のパス
    pub fn attachments_path(&self, id: i64) -> String {
        format!("{}/{}/attachments", self.path, id)
    }

    /// 個別添付ファイルのパス（ファイル名・添付IDはパスセグメントとしてエンコード）
    pub fn attachment_path(&self, id: i64, segment: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(segment.as_bytes()).collect();
        // form形式の '+' はパスでは空白にならないため %20 に戻す
        format!("{}/{}", self.attachments_path(id), encoded.replace('+', "%20"))
    }

    /// 既知のフィルタキーか（検索パラメータ名も含む）
    pub fn is_filter_key(&self, key: &str) -> bool {
        key == self.search_param || self.filter_keys.iter().any(|k| k == key)
    }

    pub fn fetch_list_failed(&self) -> String {
        format!("Failed to fetch {}", self.plural)
    }

    pub fn fetch_one_failed(&self) -> String {
        format!("Failed to fetch {}", self.name)
    }

    pub fn create_failed(&self) -> String {
        format!("Failed to create {}", self.name)
    }

    pub fn update_failed(&self) -> String {
        format!("Failed to update {}", self.name)
    }

    pub fn delete_failed(&self) -> String {
        format!("Failed to delete {}", self.name)
    }

    pub fn upload_failed(&self) -> String {
        "Failed to upload attachments".to_string()
    }

    pub fn download_failed(&self) -> String {
        "Failed to download attachment".to_string()
    }

    pub fn delete_attachment_failed(&self) -> String {
        "Failed to delete attachment".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let resource = Resource::new("supplier", "suppliers", "/api/suppliers/");
        assert_eq!(resource.collection_path(), "/api/suppliers");
        assert_eq!(resource.item_path(4), "/api/suppliers/4");
        assert_eq!(resource.attachments_path(4), "/api/suppliers/4/attachments");
        assert_eq!(
            resource.attachment_path(4, "tax form 2024.pdf"),
            "/api/suppliers/4/attachments/tax%20form%202024.pdf"
        );
        assert_eq!(resource.attachment_path(4, "17"), "/api/suppliers/4/attachments/17");
    }

    #[test]
    fn test_default_messages() {
        let resource = Resource::new("income", "incomes", "/api/finance/incomes");
        assert_eq!(resource.fetch_list_failed(), "Failed to fetch incomes");
        assert_eq!(resource.fetch_one_failed(), "Failed to fetch income");
        assert_eq!(resource.create_failed(), "Failed to create income");
        assert_eq!(resource.update_failed(), "Failed to update income");
        assert_eq!(resource.delete_failed(), "Failed to delete income");
    }

    #[test]
    fn test_builders() {
        let resource = Resource::new("income", "incomes", "/api/finance/incomes")
            .with_search_param("searchTerm")
            .with_page_size(25)
            .with_filters(&["currency", "type"]);
        assert_eq!(resource.search_param, "searchTerm");
        assert_eq!(resource.default_page_size, 25);
        assert!(resource.is_filter_key("currency"));
        assert!(!resource.is_filter_key("status"));
        assert!(resource.is_filter_key("searchTerm"));
    }
}
