//! Purpose: Shared library crate used by the `folio` CLI and tests.
//! Exports: `api` (session, transport, errors) and `core` (state stores).
//! Role: Client-side coordination layer for a remote document database.
//! Invariants: All session state lives in explicitly owned structs.
//! Invariants: Remote wire shapes stay private to the `api` module.
pub mod api;
pub mod core;
