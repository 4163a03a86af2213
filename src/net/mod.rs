//! Networking: the single outbound HTTP client and its wire types.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` owns the configured client and both interceptors, `catalog` binds
//! the peripheral book/review/admin endpoints on top of it, `error` is the
//! normalized failure taxonomy and `types` the auth wire schema.

pub mod api;
pub mod catalog;
pub mod error;
pub mod types;
