//! TON account addresses
//!
//! An address is a workchain id plus the 256-bit hash of the account's
//! state init. Two textual forms are accepted:
//! - raw: `<workchain>:<64 hex chars>`
//! - user-friendly: 36 bytes (`tag ‖ workchain ‖ hash ‖ crc16`) in base64 or base64url

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;

const FRIENDLY_LEN: usize = 36;
const FRIENDLY_TEXT_LEN: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("invalid workchain: {0}")]
    InvalidWorkchain(String),

    #[error("invalid account hash: {0}")]
    InvalidHash(String),

    #[error("invalid user-friendly address length: expected 48 characters, got {0}")]
    InvalidLength(usize),

    #[error("invalid base64 in address")]
    InvalidBase64,

    #[error("unknown address tag 0x{0:02x}")]
    UnknownTag(u8),

    #[error("address checksum mismatch")]
    ChecksumMismatch,
}

/// Rendering options for the user-friendly form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FriendlyFormat {
    pub bounceable: bool,
    pub testnet: bool,
    pub url_safe: bool,
}

impl Default for FriendlyFormat {
    fn default() -> Self {
        Self {
            bounceable: true,
            testnet: false,
            url_safe: true,
        }
    }
}

/// A parsed, chain-scoped account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TonAddress {
    workchain: i8,
    hash: [u8; 32],
}

impl TonAddress {
    pub const fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// `0:abcd…` form
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    pub fn to_friendly(&self, format: FriendlyFormat) -> String {
        let mut tag = if format.bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if format.testnet {
            tag |= TAG_TEST_ONLY;
        }

        let mut bytes = [0u8; FRIENDLY_LEN];
        bytes[0] = tag;
        bytes[1] = self.workchain as u8;
        bytes[2..34].copy_from_slice(&self.hash);
        let crc = crc16(&bytes[..34]);
        bytes[34..].copy_from_slice(&crc.to_be_bytes());

        if format.url_safe {
            URL_SAFE.encode(bytes)
        } else {
            STANDARD.encode(bytes)
        }
    }

    fn parse_raw(s: &str) -> Result<Self, AddressError> {
        let (workchain, hash) = s
            .split_once(':')
            .ok_or_else(|| AddressError::InvalidWorkchain(s.to_string()))?;

        let workchain: i8 = workchain
            .parse()
            .map_err(|_| AddressError::InvalidWorkchain(workchain.to_string()))?;

        if hash.len() != 64 {
            return Err(AddressError::InvalidHash(format!(
                "expected 64 hex characters, got {}",
                hash.len()
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hash, &mut bytes)
            .map_err(|e| AddressError::InvalidHash(e.to_string()))?;

        Ok(Self::new(workchain, bytes))
    }

    fn parse_friendly(s: &str) -> Result<Self, AddressError> {
        if s.len() != FRIENDLY_TEXT_LEN {
            return Err(AddressError::InvalidLength(s.len()));
        }

        // Accept both alphabets; normalize to the standard one
        let normalized: String = s
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                other => other,
            })
            .collect();
        let bytes = STANDARD
            .decode(normalized)
            .map_err(|_| AddressError::InvalidBase64)?;
        if bytes.len() != FRIENDLY_LEN {
            return Err(AddressError::InvalidLength(s.len()));
        }

        let tag = bytes[0] & !TAG_TEST_ONLY;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(AddressError::UnknownTag(bytes[0]));
        }

        let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc16(&bytes[..34]) != expected {
            return Err(AddressError::ChecksumMismatch);
        }

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);
        Ok(Self::new(bytes[1] as i8, hash))
    }
}

impl FromStr for TonAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if s.contains(':') {
            Self::parse_raw(s)
        } else {
            Self::parse_friendly(s)
        }
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_friendly(FriendlyFormat::default()))
    }
}

impl Serialize for TonAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TonAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// CRC-16/XMODEM
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
