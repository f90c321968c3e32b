//! # Core Protocol Components
//!
//! Wire format of the STNP login extension: the restricted character set,
//! the fixed-size packets, and tokio codecs for framing them over UDP.
//!
//! ## Components
//! - **Charset**: 37-symbol table used for usernames and failure reasons
//! - **Packet**: request and reply frames
//! - **Codec**: `tokio_util` codecs for `UdpFramed`
//!
//! ## Wire Format
//! ```text
//! request    [255] [kind(1)] [username(16)] [password(16)]
//! logged in  [255] [0] [kind(1)] [user_id LE(4)]
//! failed     [255] [1] [reason(72)]
//! ```
//!
//! There is no length prefix: every message has a fixed size and one
//! datagram carries exactly one message.

pub mod charset;
pub mod codec;
pub mod packet;
