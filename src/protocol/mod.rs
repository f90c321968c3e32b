//! # Login Protocol
//!
//! Business rules of the STNP login extension.
//!
//! ## Login Kinds
//! - **Anonymous**: a fresh guest identifier, always granted
//! - **Password**: checks the password, registering unknown usernames on first use
//! - **CreateAccount**: registers a new username, refusing existing ones
//!
//! ## Outcomes
//! Each datagram yields exactly one of: a logged-in reply, a login-failed
//! reply carrying a fixed reason, or silence for garbage on the wire and
//! internal errors.

pub mod dispatcher;


pub use dispatcher::Dispatcher;
