//! # bookreview
//!
//! Client-side session and API-access layer for the book review service.
//!
//! This crate owns credential persistence (`storage`), the single outbound
//! HTTP client with its request/response interceptors (`net`), the session
//! state machine and route guard (`state`), and env-driven client
//! configuration (`config`). Views (the `cli` crate, or any other front end)
//! only talk to [`state::session::SessionManager`] and
//! [`state::guard::RouteGuard`].

pub mod config;
pub mod net;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{ClientConfig, ConfigError};
pub use net::api::{ApiClient, AuthSignal};
pub use net::error::ApiError;
pub use net::types::{LoginRequest, RegisterRequest, Role, User};
pub use state::guard::{GuardDecision, RouteGuard};
pub use state::session::{LoginOutcome, RegisterOutcome, SessionManager, SessionSnapshot, SessionStatus};
pub use storage::{FileTokenStore, MemoryTokenStore, StorageError, TokenStore};
