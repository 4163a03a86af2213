//! Normalized API failure taxonomy.
//!
//! ERROR HANDLING
//! ==============
//! The response interceptor maps every failure onto [`ApiError`] and returns
//! it to the caller; nothing is swallowed. Display strings are the
//! user-facing annotations; the raw server body stays reachable through
//! [`ApiError::server_message`].

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied. You do not have permission to perform this action.";
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";

/// Errors produced by [`crate::net::api::ApiClient`] calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No connection could be made (refused, DNS, reset).
    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network(#[source] reqwest::Error),

    /// The overall request deadline elapsed.
    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    /// HTTP 401. The session layer has already been signalled.
    #[error("{}", display_body(*.status, .message))]
    Unauthorized { status: u16, message: String },

    /// HTTP 403.
    #[error("{}", ACCESS_DENIED_MESSAGE)]
    Forbidden { message: String },

    /// HTTP 5xx.
    #[error("{}", SERVER_ERROR_MESSAGE)]
    Server { status: u16, message: String },

    /// Any other non-success status; the server message passes through.
    #[error("{}", display_body(*.status, .message))]
    Rejected { status: u16, message: String },

    /// A success response whose body did not match the expected schema.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The request could not be built (bad path, unserializable body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Map a non-success HTTP status and its raw body onto the taxonomy.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_message(body);
        match status {
            401 => Self::Unauthorized { status, message },
            403 => Self::Forbidden { message },
            500..=599 => Self::Server { status, message },
            _ => Self::Rejected { status, message },
        }
    }

    /// Map a transport-level `reqwest` failure.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Network(err)
        }
    }

    /// True when the backend could not be reached at all.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// HTTP status, when a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Server { status, .. } | Self::Rejected { status, .. } => {
                Some(*status)
            }
            Self::Forbidden { .. } => Some(403),
            _ => None,
        }
    }

    /// The server-provided message, if the response carried a non-empty body.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message, .. }
            | Self::Forbidden { message }
            | Self::Server { message, .. }
            | Self::Rejected { message, .. } => Some(message.as_str()).filter(|m| !m.is_empty()),
            _ => None,
        }
    }
}

fn display_body(status: u16, message: &str) -> String {
    if message.is_empty() { format!("request failed with status {status}") } else { message.to_owned() }
}

/// Pull a human-readable message out of an error body.
///
/// Plain text is used as-is; a JSON string is unwrapped; a JSON object yields
/// its `message` or `error` field.
pub(crate) fn extract_message(body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Object(map)) => ["message", "error"]
            .iter()
            .find_map(|k| map.get(*k).and_then(serde_json::Value::as_str))
            .filter(|s| !s.is_empty())
            .map_or_else(|| trimmed.to_owned(), str::to_owned),
        _ => trimmed.to_owned(),
    }
}
