//! Received message — the unit moved from the radio callback to storage.
//!
//! The driver only lends the frame for the duration of its callback, so a
//! `Message` always owns a copy of the payload.

use bytes::Bytes;

use crate::peer::MacAddr;

/// An owned copy of one received frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    source: MacAddr,
    payload: Bytes,
    declared_len: usize,
}

impl Message {
    /// Copy a frame handed over by the driver.
    ///
    /// `len` is the length the driver reported. It is clamped to the bytes
    /// actually supplied so a bad length can never read past the buffer.
    pub fn from_frame(source: MacAddr, data: &[u8], len: usize) -> Self {
        let take = len.min(data.len());
        Self {
            source,
            payload: Bytes::copy_from_slice(&data[..take]),
            declared_len: len,
        }
    }

    pub fn source(&self) -> MacAddr {
        self.source
    }

    /// Payload bytes, exactly as delivered (after length clamping).
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Length reported by the driver.
    pub fn declared_len(&self) -> usize {
        self.declared_len
    }

    /// True when the driver reported more bytes than it supplied.
    pub fn is_truncated(&self) -> bool {
        self.declared_len > self.payload.len()
    }

    /// The bytes that make up the persisted record: the payload up to the
    /// first NUL, if any.
    pub fn record(&self) -> &[u8] {
        match self.payload.iter().position(|b| *b == 0) {
            Some(end) => &self.payload[..end],
            None => &self.payload,
        }
    }

    /// Record rendered as text for diagnostics. Invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.record()).into_owned()
    }
}
