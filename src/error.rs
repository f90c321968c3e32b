//! # Error Types
//!
//! Error handling for the login service.
//!
//! This module defines every error variant the service can produce, from
//! low-level I/O failures on the credential store to protocol violations on
//! the wire.
//!
//! ## Error Categories
//! - **Frame Errors**: garbage on the wire, dropped without a reply
//! - **Client Errors**: bad characters, unknown login kinds (answered with a failure reply)
//! - **Store Errors**: precondition violations, identifier exhaustion, durability failures
//! - **Configuration Errors**: invalid settings detected at startup
//!
//! Clients never see these values directly. The dispatcher maps client errors
//! to fixed failure replies and logs everything else.
//!
//! ## Example Usage
//! ```rust
//! use stnp_login::error::{LoginError, Result};
//! use stnp_login::store::CredentialStore;
//! use tracing::error;
//!
//! fn first_guest(store: &CredentialStore) -> Result<u32> {
//!     store.allocate_anonymous()
//! }
//!
//! let store = CredentialStore::in_memory();
//! match first_guest(&store) {
//!     Ok(id) => assert_eq!(id, 0),
//!     Err(e) => error!(error = %e, "allocation failed"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Frame validation errors
    pub const ERR_SHORT_FRAME: &str = "Datagram shorter than the login header";
    pub const ERR_WRONG_TAG: &str = "Datagram is not a login extension message";
    pub const ERR_WRONG_LENGTH: &str = "Login request must be exactly 34 bytes";
    pub const ERR_WRONG_MARKER: &str = "Unknown login reply marker";

    /// Store errors
    pub const ERR_LOCK_POISONED: &str = "Credential store lock poisoned";
    pub const ERR_ANONYMOUS_COUNTER: &str = "next_anonymous_id outside the anonymous range";
    pub const ERR_REGISTERED_COUNTER: &str = "next_registered_id outside the registered range";

    /// Client errors
    pub const ERR_NO_REPLY: &str = "No reply from login server";
}

/// Primary error type for all login service operations
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed frame: {0}")]
    MalformedFrame(&'static str),

    #[error("Invalid character {value} at byte {offset}")]
    InvalidCharacter { offset: usize, value: u8 },

    #[error("Unknown login kind: {0}")]
    UnknownLoginKind(u8),

    #[error("Invalid failure reason: {0:?}")]
    InvalidReason(String),

    #[error("Account already exists: {0}")]
    AccountExists(String),

    #[error("Registered identifier space exhausted")]
    IdSpaceExhausted,

    #[error("Corrupt credential store: {0}")]
    CorruptStore(String),

    #[error("Credential store lock poisoned")]
    LockPoisoned,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Timeout occurred")]
    Timeout,
}

impl LoginError {
    /// Store invariant breaches: the current request is abandoned and operators
    /// should be told, but the process keeps serving.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LoginError::AccountExists(_)
                | LoginError::IdSpaceExhausted
                | LoginError::CorruptStore(_)
                | LoginError::LockPoisoned
        )
    }
}

/// Type alias for Results using LoginError
pub type Result<T> = std::result::Result<T, LoginError>;
