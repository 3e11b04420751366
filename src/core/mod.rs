// Core modules implementing session state and error modeling.
pub mod cursor;
pub mod error;
pub mod listing;
