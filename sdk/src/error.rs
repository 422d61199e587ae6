//! Error types for the ledger interaction layer

use thiserror::Error;

use crate::address::AddressError;
use crate::amount::AmountError;
use crate::cell::CellError;
use crate::signer::DerivationError;

#[derive(Debug, Error)]
pub enum SdkError {
    /// Missing or malformed configuration (admin mnemonic, contract address)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The RPC endpoint could not be reached at startup
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single RPC call failed or timed out
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Malformed request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Amount conversion or binary serialization failure
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Key derivation failed: {0}")]
    Derivation(#[from] DerivationError),
}

impl From<reqwest::Error> for SdkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Rpc(format!("request timed out: {err}"))
        } else {
            Self::Rpc(err.to_string())
        }
    }
}

impl From<AddressError> for SdkError {
    fn from(err: AddressError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<AmountError> for SdkError {
    fn from(err: AmountError) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<CellError> for SdkError {
    fn from(err: CellError) -> Self {
        Self::Encoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SdkError>;
