//! # stnp-login
//!
//! Login server for the STNP login extension.
//!
//! Game clients send fixed-size UDP datagrams to obtain a guest identity,
//! create an account, or log in with a username and password. Sibling
//! services resolve identifiers back to usernames over a small REST API.
//!
//! ## Layout
//! - [`core`]: charset, packets and codecs
//! - [`store`]: credential store and its JSON persistence
//! - [`protocol`]: the dispatcher applying the login rules
//! - [`transport`]: the UDP server loop
//! - [`service`]: REST lookup and the UDP client
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging and metrics
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use stnp_login::core::packet::{LoginKind, LoginReply};
//! use stnp_login::protocol::Dispatcher;
//! use stnp_login::store::CredentialStore;
//!
//! let dispatcher = Dispatcher::new(Arc::new(CredentialStore::in_memory()));
//! let reply = dispatcher.dispatch(&[255, 0]).unwrap();
//! assert_eq!(reply, Some(LoginReply::logged_in(LoginKind::Anonymous, 0)));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod store;
pub mod transport;
pub mod utils;

pub use crate::core::packet::{LoginKind, LoginReply, LoginRequest, Password};
pub use crate::error::{LoginError, Result};
pub use crate::protocol::Dispatcher;
pub use crate::store::CredentialStore;
