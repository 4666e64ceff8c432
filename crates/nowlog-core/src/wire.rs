//! nowlog link wire format — how frames travel on the UDP stand-in link.
//!
//! A datagram is one `FrameHeader` immediately followed by the payload.
//! The header mirrors what a real radio reports per frame: sender address,
//! channel and an encryption flag.
//!
//! All types are #[repr(C, packed)] and use zerocopy derives. There is no
//! unsafe code in this module.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::peer::{MacAddr, MAC_ADDR_LEN};

/// Largest payload a single frame may carry.
pub const MAX_PAYLOAD_LEN: usize = 250;

/// Default UDP port of the stand-in link.
pub const DEFAULT_LINK_PORT: u16 = 47_600;

/// Frame was sent encrypted with the peer's link key.
pub const FLAG_ENCRYPTED: u8 = 0x01;

// ── Frame Header ──────────────────────────────────────────────────────────────

/// Wire size: 10 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FrameHeader {
    /// Sender hardware address.
    pub src_addr: [u8; MAC_ADDR_LEN],

    /// Channel the frame was sent on.
    pub channel: u8,

    /// Bit flags:
    ///   bit    0: FLAG_ENCRYPTED
    ///   bits 1-7: reserved, must be zero
    pub flags: u8,

    /// Payload length, little-endian.
    pub length: [u8; 2],
}

assert_eq_size!(FrameHeader, [u8; 10]);

pub const FRAME_HEADER_LEN: usize = std::mem::size_of::<FrameHeader>();

impl FrameHeader {
    pub fn new(src: MacAddr, channel: u8, flags: u8, length: u16) -> Self {
        Self {
            src_addr: src.octets(),
            channel,
            flags,
            length: length.to_le_bytes(),
        }
    }

    pub fn source(&self) -> MacAddr {
        MacAddr(self.src_addr)
    }

    pub fn length(&self) -> u16 {
        u16::from_le_bytes(self.length)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("datagram of {0} bytes is shorter than the frame header")]
    Truncated(usize),
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD_LEN}-byte frame limit")]
    PayloadTooLarge(usize),
}

// ── Encode / decode ───────────────────────────────────────────────────────────

/// Build a datagram carrying `payload`.
pub fn encode_frame(
    src: MacAddr,
    channel: u8,
    flags: u8,
    payload: &[u8],
) -> Result<Vec<u8>, WireError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(WireError::PayloadTooLarge(payload.len()));
    }
    let header = FrameHeader::new(src, channel, flags, payload.len() as u16);
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Split a datagram into its header and the payload bytes that follow.
///
/// The header's `length` is not reconciled with the bytes present; that is
/// left to the receiver, which clamps to what it was given.
pub fn decode_frame(buf: &[u8]) -> Result<(FrameHeader, &[u8]), WireError> {
    let header = FrameHeader::read_from_prefix(buf).ok_or(WireError::Truncated(buf.len()))?;
    let declared = header.length() as usize;
    if declared > MAX_PAYLOAD_LEN {
        return Err(WireError::PayloadTooLarge(declared));
    }
    Ok((header, &buf[FRAME_HEADER_LEN..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_stable() {
        let header = FrameHeader::new(MacAddr([1, 2, 3, 4, 5, 6]), 6, FLAG_ENCRYPTED, 0x0102);
        assert_eq!(
            header.as_bytes(),
            &[1, 2, 3, 4, 5, 6, 6, FLAG_ENCRYPTED, 0x02, 0x01]
        );
        assert_eq!(FRAME_HEADER_LEN, MAC_ADDR_LEN + 4);
    }

    #[test]
    fn decode_returns_header_and_payload() {
        let src = MacAddr([0x1c, 0x69, 0x20, 0x89, 0xe7, 0x28]);
        let buf = encode_frame(src, 6, 0, b"hello").unwrap();
        let (header, payload) = decode_frame(&buf).unwrap();
        assert_eq!(header.source(), src);
        assert_eq!(header.channel, 6);
        assert_eq!(header.length(), 5);
        assert!(!header.is_encrypted());
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn short_datagram_is_rejected() {
        assert_eq!(decode_frame(&[0u8; 4]).unwrap_err(), WireError::Truncated(4));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let src = MacAddr::default();
        let big = vec![b'x'; MAX_PAYLOAD_LEN + 1];
        assert_eq!(
            encode_frame(src, 6, 0, &big),
            Err(WireError::PayloadTooLarge(MAX_PAYLOAD_LEN + 1))
        );

        let mut forged = FrameHeader::new(src, 6, 0, 1000).as_bytes().to_vec();
        forged.extend_from_slice(b"x");
        assert_eq!(
            decode_frame(&forged).unwrap_err(),
            WireError::PayloadTooLarge(1000)
        );
    }
}
