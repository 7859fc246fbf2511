//! ERP Admin Common Library
//!
//! CLIとWeb(WASM)で共有されるドメインストアとAPIアダプタ

pub mod catalog;
pub mod client;
pub mod envelope;
pub mod error;
pub mod normalize;
pub mod pagination;
pub mod query;
pub mod resource;
pub mod store;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{FinanceStores, StoreSet};
pub use client::ApiClient;
pub use envelope::{record_id, ItemEnvelope, ListEnvelope, Record};
pub use error::{Error, Result};
pub use normalize::{normalize, resolve_references};
pub use pagination::{reconcile, PageRequest, PaginationBlock, PaginationDescriptor};
pub use query::{FilterDescriptor, ListParams};
pub use resource::Resource;
pub use store::{DomainStore, DomainStoreState, SubscriptionId};
pub use transport::{
    ApiRequest, CredentialChain, FilePart, Method, PreparedBody, PreparedRequest, RawResponse,
    RequestBody, StaticToken, TokenSource, Transport, TransportFailure, guess_content_type,
};
