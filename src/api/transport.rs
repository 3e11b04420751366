//! Purpose: Define the transport seam between the session and the remote API.
//! Exports: `Transport`, `Outcome`, `Filter`, `Document`.
//! Role: One method per remote endpoint; implementations own wire shapes.
//! Invariants: Transport failures surface as `ErrorKind::Transport`.
//! Invariants: Methods never touch session state; the caller applies results.
use crate::core::error::Error;
use crate::core::listing::{DatabaseInfo, DatabaseListing, RoleAssignments};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type ApiResult<T> = Result<T, Error>;

/// A schemaless record as returned by the remote API.
pub type Document = Value;

/// Field-to-match-value query mapping for document lookup.
pub type Filter = BTreeMap<String, Value>;

/// Server verdict for drop/create-collection requests. Anything other
/// than `"ok"` in `detail` means the operation failed server-side even
/// though the call itself succeeded.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub detail: String,
}

impl Outcome {
    pub fn ok() -> Self {
        Self {
            detail: "ok".to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.detail == "ok"
    }
}

/// Remote API surface the session depends on. The HTTP implementation
/// lives in `api::remote`; tests script their own.
pub trait Transport {
    /// GET /db
    fn fetch_listing(&self) -> ApiResult<DatabaseListing>;

    /// GET /db/roles
    fn fetch_roles(&self) -> ApiResult<RoleAssignments>;

    /// POST /db/create; returns the updated empty group.
    fn create_database(&self, database: &str, collection: &str) -> ApiResult<Vec<DatabaseInfo>>;

    /// POST /db/drop
    fn drop_database(&self, database: &str) -> ApiResult<Outcome>;

    /// POST /collection/create
    fn create_collection(&self, database: &str, collection: &str) -> ApiResult<Outcome>;

    /// GET /collection/documents for one page.
    fn fetch_page(&self, database: &str, collection: &str, page: u64) -> ApiResult<Vec<Document>>;

    /// POST /documents/find
    fn find_documents(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
    ) -> ApiResult<Vec<Document>>;
}
