use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::packet::{LoginReply, LoginRequest};
use crate::error::{LoginError, Result};

/// Server side of the login extension over `UdpFramed`.
///
/// Datagrams are handed up untouched: classifying them (drop, failure reply,
/// or login) is the dispatcher's job.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerCodec;

impl Decoder for ServerCodec {
    type Item = Bytes;
    type Error = LoginError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }
        Ok(Some(src.split().freeze()))
    }
}

impl Encoder<LoginReply> for ServerCodec {
    type Error = LoginError;

    fn encode(&mut self, reply: LoginReply, dst: &mut BytesMut) -> Result<()> {
        let bytes = reply.to_bytes()?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

/// Client side of the login extension over `UdpFramed`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientCodec;

impl Encoder<LoginRequest> for ClientCodec {
    type Error = LoginError;

    fn encode(&mut self, request: LoginRequest, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&request.to_bytes());
        Ok(())
    }
}

impl Decoder for ClientCodec {
    type Item = LoginReply;
    type Error = LoginError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }
        // consume the whole datagram first so a bad reply is not re-read
        let datagram = src.split();
        LoginReply::from_bytes(&datagram).map(Some)
    }
}
