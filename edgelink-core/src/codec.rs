//! Framing of the WebRTC signaling stream: a little-endian `u32` byte length
//! followed by that many bytes of JSON.

use crate::error::CodecError;
use crate::model::SignalMessage;
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const LEN_PREFIX: usize = 4;

/// Largest JSON body accepted in either direction.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

pub fn encode(msg: &SignalMessage) -> Result<Bytes, CodecError> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(json.len()));
    }

    let mut buf = BytesMut::with_capacity(LEN_PREFIX + json.len());
    buf.put_u32_le(json.len() as u32);
    buf.put_slice(&json);
    Ok(buf.freeze())
}

/// Accumulates stream bytes and yields whole messages.
#[derive(Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Mutable access for readers that fill the buffer in place.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the next complete message, or `None` if more bytes are needed.
    pub fn decode(&mut self) -> Result<Option<SignalMessage>, CodecError> {
        if self.buf.len() < LEN_PREFIX {
            return Ok(None);
        }

        let mut prefix = &self.buf[..LEN_PREFIX];
        let len = prefix.get_u32_le() as usize;
        if len > MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge(len));
        }
        if self.buf.len() < LEN_PREFIX + len {
            return Ok(None);
        }

        self.buf.advance(LEN_PREFIX);
        let body = self.buf.split_to(len);
        Ok(Some(serde_json::from_slice(&body)?))
    }
}
