//! # Services
//!
//! Endpoints built around the core login protocol.
//!
//! ## Components
//! - **REST**: username lookup for ranking and replay services
//! - **Client**: UDP client speaking the login extension

pub mod client;
pub mod rest;
