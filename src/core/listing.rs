//! Purpose: Hold the cached database listing and role assignments.
//! Exports: `DatabaseInfo`, `DatabaseListing`, `RoleAssignments`, `ListingCache`.
//! Role: Pure session state; no I/O, no validation on replacement.
//! Invariants: Each slot is replaced wholesale, never patched in place.
//! Invariants: Listing groups are expected to partition database names.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One known database with its collection names. Databases in the
/// `empty` group carry the collection names implied at creation time.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    #[serde(default)]
    pub collections: Vec<String>,
}

impl DatabaseInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: Vec::new(),
        }
    }

    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = collections.into_iter().map(Into::into).collect();
        self
    }
}

/// The last known set of databases, split into those backed by at least
/// one document (`non_empty`) and those created but not yet materialized
/// server-side (`empty`, the "implied" databases).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DatabaseListing {
    #[serde(default)]
    pub non_empty: Vec<DatabaseInfo>,
    #[serde(default)]
    pub empty: Vec<DatabaseInfo>,
}

impl DatabaseListing {
    pub fn contains(&self, name: &str) -> bool {
        self.non_empty.iter().chain(&self.empty).any(|db| db.name == name)
    }

    /// True when no database name appears in both groups. The cache does
    /// not enforce this; well-formed server responses already satisfy it.
    pub fn is_partition(&self) -> bool {
        self.non_empty
            .iter()
            .all(|db| self.empty.iter().all(|other| other.name != db.name))
    }
}

/// Roles the current caller holds, keyed by database name. Consumed
/// read-only by the UI; may go stale relative to the listing between
/// refreshes.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleAssignments(pub BTreeMap<String, Vec<String>>);

impl RoleAssignments {
    pub fn roles_for(&self, database: &str) -> &[String] {
        self.0.get(database).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Two independent get/replace slots for the listing and the roles.
/// Callers supply well-formed values; replacement is a single atomic
/// assignment with no other side effects.
#[derive(Clone, Debug, Default)]
pub struct ListingCache {
    listing: DatabaseListing,
    roles: RoleAssignments,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listing(&self) -> &DatabaseListing {
        &self.listing
    }

    pub fn replace_listing(&mut self, listing: DatabaseListing) {
        self.listing = listing;
    }

    pub fn roles(&self) -> &RoleAssignments {
        &self.roles
    }

    pub fn replace_roles(&mut self, roles: RoleAssignments) {
        self.roles = roles;
    }
}

#[cfg(test)]
mod tests {
    use super::{DatabaseInfo, DatabaseListing, ListingCache, RoleAssignments};
    use std::collections::BTreeMap;

    fn listing(non_empty: &[&str], empty: &[&str]) -> DatabaseListing {
        DatabaseListing {
            non_empty: non_empty.iter().map(|name| DatabaseInfo::new(*name)).collect(),
            empty: empty.iter().map(|name| DatabaseInfo::new(*name)).collect(),
        }
    }

    #[test]
    fn replace_listing_is_wholesale() {
        let mut cache = ListingCache::new();
        cache.replace_listing(listing(&["shop"], &["drafts"]));
        cache.replace_listing(listing(&["blog"], &[]));

        assert!(cache.listing().contains("blog"));
        assert!(!cache.listing().contains("shop"));
        assert!(!cache.listing().contains("drafts"));
    }

    #[test]
    fn roles_slot_is_independent_of_listing() {
        let mut cache = ListingCache::new();
        let mut by_db = BTreeMap::new();
        by_db.insert("shop".to_string(), vec!["reader".to_string()]);
        cache.replace_roles(RoleAssignments(by_db));
        cache.replace_listing(listing(&["blog"], &[]));

        assert_eq!(cache.roles().roles_for("shop"), ["reader".to_string()]);
        assert!(cache.roles().roles_for("blog").is_empty());
    }

    #[test]
    fn partition_check_flags_overlap() {
        assert!(listing(&["shop"], &["drafts"]).is_partition());
        assert!(!listing(&["shop"], &["shop"]).is_partition());
    }
}
