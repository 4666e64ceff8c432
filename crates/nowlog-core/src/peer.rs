//! Peer identity — hardware addresses and trusted-peer descriptors.
//!
//! A `PeerDescriptor` is built once from configuration and never mutated.
//! Changing a peer's trust parameters means building a new descriptor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

// ── MAC address ───────────────────────────────────────────────────────────────

/// Length of a hardware address in bytes.
pub const MAC_ADDR_LEN: usize = 6;

/// Length of a link key in bytes.
pub const LMK_LEN: usize = 16;

/// 6-byte link-layer hardware address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddr(pub [u8; MAC_ADDR_LEN]);

impl MacAddr {
    pub const fn new(bytes: [u8; MAC_ADDR_LEN]) -> Self {
        Self(bytes)
    }

    pub fn octets(&self) -> [u8; MAC_ADDR_LEN] {
        self.0
    }
}

impl From<[u8; MAC_ADDR_LEN]> for MacAddr {
    fn from(bytes: [u8; MAC_ADDR_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({self})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseMacError {
    #[error("invalid hex in address {0:?}")]
    InvalidHex(String),
    #[error("address {0:?} is not 6 bytes")]
    WrongLength(String),
}

impl FromStr for MacAddr {
    type Err = ParseMacError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` or `aabbccddeeff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        let bytes =
            hex::decode(&digits).map_err(|_| ParseMacError::InvalidHex(s.to_string()))?;
        let octets: [u8; MAC_ADDR_LEN] = bytes
            .try_into()
            .map_err(|_| ParseMacError::WrongLength(s.to_string()))?;
        Ok(Self(octets))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Interface role ────────────────────────────────────────────────────────────

/// Which local radio interface a peer is reachable through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceRole {
    #[default]
    #[serde(rename = "sta")]
    Station,
    #[serde(rename = "ap")]
    AccessPoint,
}

impl fmt::Display for InterfaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceRole::Station => f.write_str("STA"),
            InterfaceRole::AccessPoint => f.write_str("AP"),
        }
    }
}

// ── Local master key ──────────────────────────────────────────────────────────

/// 16-byte pre-shared link key. Passed to the radio driver as-is.
///
/// Wiped on drop. `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct LocalMasterKey([u8; LMK_LEN]);

impl LocalMasterKey {
    pub fn new(bytes: [u8; LMK_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse 32 hex characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim()).ok()?;
        let key: [u8; LMK_LEN] = bytes.try_into().ok()?;
        Some(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; LMK_LEN] {
        &self.0
    }
}

impl fmt::Debug for LocalMasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LocalMasterKey(..)")
    }
}

// ── Peer descriptor ───────────────────────────────────────────────────────────

/// Identity and link policy for one trusted remote node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDescriptor {
    address: MacAddr,
    channel: u8,
    interface: InterfaceRole,
    lmk: Option<LocalMasterKey>,
}

impl PeerDescriptor {
    pub fn new(
        address: MacAddr,
        channel: u8,
        interface: InterfaceRole,
        lmk: Option<LocalMasterKey>,
    ) -> Self {
        Self {
            address,
            channel,
            interface,
            lmk,
        }
    }

    /// Unencrypted station-side peer, the common case.
    pub fn station(address: MacAddr, channel: u8) -> Self {
        Self::new(address, channel, InterfaceRole::Station, None)
    }

    pub fn address(&self) -> MacAddr {
        self.address
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn interface(&self) -> InterfaceRole {
        self.interface
    }

    pub fn lmk(&self) -> Option<&LocalMasterKey> {
        self.lmk.as_ref()
    }

    /// True when a key is present; the driver must encrypt frames for this peer.
    pub fn encrypt(&self) -> bool {
        self.lmk.is_some()
    }
}
