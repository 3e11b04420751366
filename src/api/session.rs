//! Purpose: Coordinate listing, roles, and page cursors over a transport.
//! Exports: `DbSession`.
//! Role: The only component that mutates session state; owns both stores.
//! Invariants: Every cache write is a single wholesale replacement.
//! Invariants: A failed remote call leaves all session state untouched.
//! Invariants: Cursors never retreat below page 0.
#![allow(clippy::result_large_err)]

use super::transport::{ApiResult, Document, Filter, Transport};
use crate::core::cursor::{PageCursorStore, Side};
use crate::core::error::{Error, ErrorKind};
use crate::core::listing::{DatabaseListing, ListingCache, RoleAssignments};

/// Session over one remote document database API.
///
/// Owns the listing cache and the cursor store; all mutations go through
/// `&mut self`, so two in-flight page loads for the same pair cannot
/// observe each other's stale cursor within a single session value.
pub struct DbSession<T: Transport> {
    transport: T,
    cache: ListingCache,
    cursors: PageCursorStore,
}

impl<T: Transport> DbSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            cache: ListingCache::new(),
            cursors: PageCursorStore::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn listing(&self) -> &DatabaseListing {
        self.cache.listing()
    }

    pub fn roles(&self) -> &RoleAssignments {
        self.cache.roles()
    }

    pub fn cursors(&self) -> &PageCursorStore {
        &self.cursors
    }

    /// External setters for the observer surface. The session trusts the
    /// caller to supply well-formed values.
    pub fn set_listing(&mut self, listing: DatabaseListing) {
        self.cache.replace_listing(listing);
    }

    pub fn set_roles(&mut self, roles: RoleAssignments) {
        self.cache.replace_roles(roles);
    }

    pub fn set_cursor(&mut self, database: &str, collection: &str, page: u64) {
        self.cursors.set_cursor(database, collection, page);
    }

    /// Fetches the current listing and replaces the cached one wholesale.
    pub fn refresh_listing(&mut self) -> ApiResult<()> {
        let listing = self.transport.fetch_listing()?;
        tracing::debug!(
            non_empty = listing.non_empty.len(),
            empty = listing.empty.len(),
            "listing refreshed"
        );
        self.cache.replace_listing(listing);
        Ok(())
    }

    /// Fetches the caller's role assignments and replaces the cached ones.
    pub fn refresh_roles(&mut self) -> ApiResult<()> {
        let roles = self.transport.fetch_roles()?;
        self.cache.replace_roles(roles);
        Ok(())
    }

    /// Registers a new implied database seeded with one collection.
    ///
    /// Applies a partial merge: the response carries only the updated
    /// empty group, so the cached `non_empty` group is kept as-is and
    /// stays only as fresh as the last full `refresh_listing`. This
    /// trades a round trip for possible staleness on the non-empty side.
    pub fn create_database(&mut self, database: &str, collection: &str) -> ApiResult<()> {
        let empty = self.transport.create_database(database, collection)?;
        let merged = DatabaseListing {
            non_empty: self.cache.listing().non_empty.clone(),
            empty,
        };
        self.cache.replace_listing(merged);
        Ok(())
    }

    /// Drops a database, then resyncs the whole listing. A drop can
    /// remove the name from either group, and the session cannot tell
    /// which without a round trip.
    pub fn drop_database(&mut self, database: &str) -> ApiResult<()> {
        let outcome = self.transport.drop_database(database)?;
        if !outcome.is_ok() {
            return Err(Error::new(ErrorKind::Operation)
                .with_message("failed to drop database")
                .with_database(database));
        }
        self.refresh_listing()
    }

    /// Creates a collection, then resyncs the whole listing. A new
    /// collection may move its database from the empty group to the
    /// non-empty one, which the session does not predict locally.
    pub fn create_collection(&mut self, database: &str, collection: &str) -> ApiResult<()> {
        let outcome = self.transport.create_collection(database, collection)?;
        if !outcome.is_ok() {
            return Err(Error::new(ErrorKind::Operation)
                .with_message("failed to create collection")
                .with_database(database)
                .with_collection(collection));
        }
        self.refresh_listing()
    }

    /// Loads one page of documents in the given scroll direction and
    /// applies the one-step cursor policy:
    ///
    /// - `End` with a non-empty page advances the cursor; an empty page
    ///   holds it so repeated loads cannot run past the end of the data.
    /// - `Start` retreats unconditionally on the result contents, but
    ///   never below page 0.
    ///
    /// The fetched documents are returned regardless of which branch was
    /// taken. A failed fetch leaves the cursor unchanged.
    pub fn find_documents_in_page(
        &mut self,
        database: &str,
        collection: &str,
        side: Side,
    ) -> ApiResult<Vec<Document>> {
        if !self.cursors.has_database(database) {
            self.cursors.set_cursor(database, collection, 0);
        }
        let next_page = self.cursors.cursor(database, collection);
        let documents = self.transport.fetch_page(database, collection, next_page)?;
        tracing::debug!(
            database,
            collection,
            page = next_page,
            count = documents.len(),
            ?side,
            "page fetched"
        );

        match side {
            Side::End if !documents.is_empty() => {
                self.cursors.set_cursor(database, collection, next_page + 1);
            }
            Side::Start if next_page > 0 => {
                self.cursors.set_cursor(database, collection, next_page - 1);
            }
            _ => {}
        }

        Ok(documents)
    }

    /// Stateless filtered lookup; shares the transport/error contract
    /// with paging but touches no session state.
    pub fn find_documents(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
    ) -> ApiResult<Vec<Document>> {
        self.transport.find_documents(database, collection, filter)
    }
}
