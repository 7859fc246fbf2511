//! ドメイン一覧とストアの組み立て
//!
//! ストアはグローバルに持たず、ここで明示的に生成して利用側に渡す。

use crate::client::ApiClient;
use crate::resource::Resource;
use crate::store::DomainStore;
use crate::transport::Transport;
use std::rc::Rc;

const FINANCE_FILTERS: &[&str] = &["currency", "type", "dateFrom", "dateTo", "isRecurring"];

/// 収入
pub fn incomes() -> Resource {
    Resource::new("income", "incomes", "/api/finance/incomes")
        .with_search_param("searchTerm")
        .with_filters(FINANCE_FILTERS)
}

/// 支出
pub fn expenses() -> Resource {
    Resource::new("expense", "expenses", "/api/finance/expenses")
        .with_search_param("searchTerm")
        .with_filters(FINANCE_FILTERS)
}

/// 購買申請
pub fn requisitions() -> Resource {
    Resource::new("requisition", "requisitions", "/api/requisitions")
        .with_filters(&["status", "dateFrom", "dateTo"])
}

/// 仕入先
pub fn suppliers() -> Resource {
    Resource::new("supplier", "suppliers", "/api/suppliers").with_filters(&["status", "type"])
}

/// 製品
pub fn products() -> Resource {
    Resource::new("product", "products", "/api/products").with_filters(&["type", "status"])
}

/// 名前（単数・複数どちらでも）からリソースを引く
pub fn by_name(name: &str) -> Option<Resource> {
    all().into_iter().find(|r| r.plural == name || r.name == name)
}

/// 全リソース
pub fn all() -> Vec<Resource> {
    vec![incomes(), expenses(), requisitions(), suppliers(), products()]
}

/// 財務ドメインのストア
pub struct FinanceStores<T> {
    pub incomes: DomainStore<T>,
    pub expenses: DomainStore<T>,
}

/// 全ドメインのストア（1クライアントを共有、状態は共有しない）
pub struct StoreSet<T> {
    pub finance: FinanceStores<T>,
    pub requisitions: DomainStore<T>,
    pub suppliers: DomainStore<T>,
    pub products: DomainStore<T>,
}

impl<T: Transport> StoreSet<T> {
    pub fn new(client: Rc<ApiClient<T>>) -> Self {
        Self {
            finance: FinanceStores {
                incomes: DomainStore::new(Rc::clone(&client), incomes()),
                expenses: DomainStore::new(Rc::clone(&client), expenses()),
            },
            requisitions: DomainStore::new(Rc::clone(&client), requisitions()),
            suppliers: DomainStore::new(Rc::clone(&client), suppliers()),
            products: DomainStore::new(client, products()),
        }
    }

    /// リソース名からストアを引く
    pub fn get(&self, name: &str) -> Option<&DomainStore<T>> {
        [
            &self.finance.incomes,
            &self.finance.expenses,
            &self.requisitions,
            &self.suppliers,
            &self.products,
        ]
        .into_iter()
        .find(|store| store.resource().plural == name || store.resource().name == name)
    }

    /// 全ストアを初期状態に戻す（ログアウト時など）
    pub fn reset_all(&self) {
        self.finance.incomes.reset();
        self.finance.expenses.reset();
        self.requisitions.reset();
        self.suppliers.reset();
        self.products.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ListParams;
    use crate::testing::MockTransport;
    use crate::transport::CredentialChain;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("incomes").unwrap().path, "/api/finance/incomes");
        assert_eq!(by_name("supplier").unwrap().plural, "suppliers");
        assert!(by_name("employees").is_none());
    }

    #[test]
    fn test_finance_uses_search_term() {
        assert_eq!(incomes().search_param, "searchTerm");
        assert_eq!(expenses().search_param, "searchTerm");
        assert_eq!(suppliers().search_param, "search");
        assert!(incomes().is_filter_key("isRecurring"));
    }

    #[test]
    fn test_store_set_states_are_independent() {
        let mock = Rc::new(MockTransport::new());
        let client = Rc::new(ApiClient::new("http://erp.local", Rc::clone(&mock), Box::new(CredentialChain::anonymous())));
        let stores = StoreSet::new(client);
        mock.push_json(200, json!({"success": true, "data": [{"Id": 1}]}));

        block_on(stores.suppliers.list(ListParams::default()));

        assert_eq!(stores.suppliers.records().len(), 1);
        assert!(stores.products.records().is_empty());
        assert!(stores.finance.incomes.records().is_empty());
        assert_eq!(stores.get("products").unwrap().resource().path, "/api/products");

        stores.reset_all();
        assert!(stores.suppliers.records().is_empty());
    }
}
