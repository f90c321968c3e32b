//! # Transport Layer
//!
//! Datagram transport for the login service. It moves bytes between the
//! UDP socket and the dispatcher and keeps no state about clients.

pub mod udp;
