//! Purpose: Define the stable public Rust API boundary for folio.
//! Exports: Session, transport seam, and core state types.
//! Role: Public, additive-only surface; hides internal wire modules.
//! Invariants: This module is the only public path to session primitives.

mod remote;
mod session;
mod transport;

pub use crate::core::cursor::{PageCursorStore, Side};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::listing::{DatabaseInfo, DatabaseListing, ListingCache, RoleAssignments};
pub use remote::HttpClient;
pub use session::DbSession;
pub use transport::{ApiResult, Document, Filter, Outcome, Transport};
