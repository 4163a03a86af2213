//! Durable credential storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! The HTTP client reads the access token from a [`TokenStore`] before every
//! request; only the session manager writes or clears entries. The two
//! credential keys are always removed together via [`clear_credentials`].

mod file;
mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

/// Key under which the bearer access token is persisted.
pub const ACCESS_TOKEN_KEY: &str = "token";
/// Key under which the refresh token is persisted.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Errors produced by token store writes.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("credential store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential store encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Plain key/value persistence for credentials. No validation, no expiry.
pub trait TokenStore: Send + Sync {
    /// Read a value. Unreadable storage reads as absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing storage could not be updated.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Remove both credential entries.
///
/// Both removals are attempted even if the first fails; the first error wins.
///
/// # Errors
///
/// Returns the first [`StorageError`] encountered.
pub fn clear_credentials(store: &dyn TokenStore) -> Result<(), StorageError> {
    let access = store.remove(ACCESS_TOKEN_KEY);
    let refresh = store.remove(REFRESH_TOKEN_KEY);
    access.and(refresh)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
