//! # Credential Store
//!
//! Registered accounts plus the two identifier counters.
//!
//! ## Identifier Spaces
//! ```text
//! anonymous   [0x0000_0000, 0x8000_0000)   wrapping counter
//! registered  [0x8000_0000, 0x1_0000_0000) monotonic counter
//! ```
//!
//! ## Persistence
//! One JSON document:
//! ```text
//! {"accounts": {"<username>": {"password": "<hex>", "user_id": <int>}},
//!  "next_anonymous_id": <int>, "next_registered_id": <int>}
//! ```
//! Rewritten in full after each mutation through a temporary file and an
//! atomic rename.

pub mod account;
pub mod credential_store;

pub use account::{Account, AccountRecord, StoreState};
pub use credential_store::{CredentialStore, StoreGuard};
