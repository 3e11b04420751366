// Per-(database, collection) page cursors driving bidirectional infinite scroll.
use std::collections::HashMap;

/// Direction of an infinite-scroll load: `End` appends further pages,
/// `Start` loads earlier ones.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    Start,
    End,
}

/// Stores the index of the next forward page per (database, collection)
/// pair. Pure state; the paging policy lives in the session controller.
///
/// A pair that was never written reads as page 0. Buckets are created
/// lazily and never removed; cursors for dropped collections are
/// harmless dead entries.
#[derive(Clone, Debug, Default)]
pub struct PageCursorStore {
    cursors: HashMap<String, HashMap<String, u64>>,
}

impl PageCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next page index for the pair, 0 when the pair is unknown.
    pub fn cursor(&self, database: &str, collection: &str) -> u64 {
        self.cursors
            .get(database)
            .and_then(|bucket| bucket.get(collection))
            .copied()
            .unwrap_or(0)
    }

    /// Whether a cursor bucket exists for the database.
    pub fn has_database(&self, database: &str) -> bool {
        self.cursors.contains_key(database)
    }

    /// Stores `page` for the pair, creating the database bucket if needed.
    /// No bounds validation happens here; the caller decides direction.
    pub fn set_cursor(&mut self, database: &str, collection: &str, page: u64) {
        self.cursors
            .entry(database.to_string())
            .or_default()
            .insert(collection.to_string(), page);
    }
}
