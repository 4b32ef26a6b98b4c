//! Service layer for the coffee catalog.
//! - `storage` holds the `Store` abstraction and its backends.
//! - `catalog` implements create, list and partial update on top of a store.
//! - Errors are collected in `errors::ServiceError`.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod catalog;
