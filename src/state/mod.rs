//! Client-side session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! `session` owns the auth state machine and credential lifecycle; `guard`
//! turns a session snapshot into a render/redirect decision for views.

pub mod guard;
pub mod session;
