// Session-level contract tests driven through a scripted transport.
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::HashMap;

use folio::api::{
    ApiResult, DatabaseInfo, DatabaseListing, DbSession, Error, ErrorKind, Filter, Outcome,
    RoleAssignments, Side, Transport,
};

/// In-memory stand-in for the remote API. Pages and outcomes are scripted
/// up front; every call is logged so tests can assert on traffic.
#[derive(Default)]
struct FakeApi {
    listing: RefCell<DatabaseListing>,
    roles: RoleAssignments,
    pages: HashMap<(String, String, u64), Vec<Value>>,
    drop_detail: Option<String>,
    calls: RefCell<Vec<String>>,
}

impl FakeApi {
    fn with_listing(self, listing: DatabaseListing) -> Self {
        *self.listing.borrow_mut() = listing;
        self
    }

    fn with_page(mut self, database: &str, collection: &str, page: u64, docs: Vec<Value>) -> Self {
        self.pages
            .insert((database.to_string(), collection.to_string(), page), docs);
        self
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }
}

impl Transport for FakeApi {
    fn fetch_listing(&self) -> ApiResult<DatabaseListing> {
        self.log("fetch_listing");
        Ok(self.listing.borrow().clone())
    }

    fn fetch_roles(&self) -> ApiResult<RoleAssignments> {
        self.log("fetch_roles");
        Ok(self.roles.clone())
    }

    fn create_database(&self, database: &str, collection: &str) -> ApiResult<Vec<DatabaseInfo>> {
        self.log(format!("create_database {database}"));
        let mut empty = self.listing.borrow().empty.clone();
        empty.push(DatabaseInfo::new(database).with_collections([collection]));
        self.listing.borrow_mut().empty = empty.clone();
        Ok(empty)
    }

    fn drop_database(&self, database: &str) -> ApiResult<Outcome> {
        self.log(format!("drop_database {database}"));
        if let Some(detail) = &self.drop_detail {
            return Ok(Outcome {
                detail: detail.clone(),
            });
        }
        let mut listing = self.listing.borrow_mut();
        listing.non_empty.retain(|db| db.name != database);
        listing.empty.retain(|db| db.name != database);
        Ok(Outcome::ok())
    }

    fn create_collection(&self, database: &str, collection: &str) -> ApiResult<Outcome> {
        self.log(format!("create_collection {database}/{collection}"));
        Ok(Outcome::ok())
    }

    fn fetch_page(&self, database: &str, collection: &str, page: u64) -> ApiResult<Vec<Value>> {
        self.log(format!("fetch_page {database}/{collection}/{page}"));
        let key = (database.to_string(), collection.to_string(), page);
        Ok(self.pages.get(&key).cloned().unwrap_or_default())
    }

    fn find_documents(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
    ) -> ApiResult<Vec<Value>> {
        self.log(format!("find_documents {database}/{collection}"));
        if filter.is_empty() {
            return Err(Error::new(ErrorKind::Transport).with_message("empty filter rejected"));
        }
        Ok(vec![json!({"from": collection})])
    }
}

fn named(names: &[&str]) -> Vec<DatabaseInfo> {
    names.iter().map(|name| DatabaseInfo::new(*name)).collect()
}

fn order_docs(count: usize, page: u64) -> Vec<Value> {
    (0..count)
        .map(|id| json!({"order": format!("{page}-{id}")}))
        .collect()
}

#[test]
fn end_to_end_paging_scenario() {
    // Page 0 has a full page, page 1 is past the end.
    let api = FakeApi::default().with_page("shop", "orders", 0, order_docs(20, 0));
    let mut session = DbSession::new(api);

    let first = session
        .find_documents_in_page("shop", "orders", Side::End)
        .expect("page 0");
    assert_eq!(first.len(), 20);
    assert_eq!(session.cursors().cursor("shop", "orders"), 1);

    let second = session
        .find_documents_in_page("shop", "orders", Side::End)
        .expect("page 1");
    assert!(second.is_empty());
    assert_eq!(session.cursors().cursor("shop", "orders"), 1);

    session
        .find_documents_in_page("shop", "orders", Side::Start)
        .expect("page 1 again");
    assert_eq!(session.cursors().cursor("shop", "orders"), 0);
}

#[test]
fn cursor_never_goes_negative_over_any_sequence() {
    let api = FakeApi::default()
        .with_page("shop", "orders", 0, order_docs(3, 0))
        .with_page("shop", "orders", 1, order_docs(3, 1));
    let mut session = DbSession::new(api);

    let sequence = [
        Side::Start,
        Side::Start,
        Side::End,
        Side::Start,
        Side::Start,
        Side::End,
        Side::End,
        Side::End,
        Side::Start,
        Side::Start,
        Side::Start,
    ];
    for side in sequence {
        session
            .find_documents_in_page("shop", "orders", side)
            .expect("page");
        // u64 makes underflow a panic rather than a wrap; reaching this
        // assertion at all means the guard held.
        assert!(session.cursors().cursor("shop", "orders") <= 2);
    }
    assert_eq!(session.cursors().cursor("shop", "orders"), 0);
}

#[test]
fn mutation_refresh_keeps_listing_consistent() {
    let api = FakeApi::default().with_listing(DatabaseListing {
        non_empty: named(&["shop"]),
        empty: vec![],
    });
    let mut session = DbSession::new(api);
    session.refresh_listing().expect("initial refresh");

    // createDatabase merges only the empty group.
    session.create_database("scratch", "notes").expect("create");
    assert_eq!(session.listing().non_empty, named(&["shop"]));
    assert_eq!(session.listing().empty.len(), 1);
    assert_eq!(session.listing().empty[0].name, "scratch");
    assert_eq!(session.listing().empty[0].collections, ["notes"]);
    assert!(session.listing().is_partition());

    // dropDatabase resyncs the whole listing from the server.
    session.drop_database("scratch").expect("drop");
    assert_eq!(session.listing().non_empty, named(&["shop"]));
    assert!(session.listing().empty.is_empty());

    let calls = session_calls(&session);
    let fetches = calls.iter().filter(|c| *c == "fetch_listing").count();
    assert_eq!(fetches, 2, "initial refresh plus one drop resync");
}

#[test]
fn failed_drop_reports_operation_error_without_refetch() {
    let api = FakeApi {
        drop_detail: Some("database is protected".to_string()),
        ..Default::default()
    }
    .with_listing(DatabaseListing {
        non_empty: named(&["shop"]),
        empty: named(&["drafts"]),
    });
    let mut session = DbSession::new(api);
    session.refresh_listing().expect("initial refresh");
    let before = session.listing().clone();

    let err = session.drop_database("shop").expect_err("drop must fail");
    assert_eq!(err.kind(), ErrorKind::Operation);
    assert_eq!(session.listing(), &before);

    let calls = session_calls(&session);
    let fetches = calls.iter().filter(|c| *c == "fetch_listing").count();
    assert_eq!(fetches, 1, "no resync after a failed drop");
}

#[test]
fn filtered_find_shares_the_error_contract() {
    let api = FakeApi::default();
    let mut session = DbSession::new(api);
    session.set_cursor("shop", "orders", 3);

    let err = session
        .find_documents("shop", "orders", &Filter::new())
        .expect_err("transport failure");
    assert_eq!(err.kind(), ErrorKind::Transport);

    let filter = Filter::from([("status".to_string(), json!("open"))]);
    let found = session
        .find_documents("shop", "orders", &filter)
        .expect("find");
    assert_eq!(found, vec![json!({"from": "orders"})]);
    assert_eq!(session.cursors().cursor("shop", "orders"), 3);
}

fn session_calls(session: &DbSession<FakeApi>) -> Vec<String> {
    session.transport().calls.borrow().clone()
}
