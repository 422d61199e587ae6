//! Warriors SDK - ledger interaction layer for the Clash Warriors airdrop
//!
//! This SDK provides:
//! - Address and amount parsing
//! - Cell and bag-of-cells encoding
//! - Mnemonic key derivation and the admin wallet
//! - An RPC client for getter calls and message broadcast
//! - Typed operations on the airdrop contract

pub mod address;
pub mod amount;
pub mod cell;
pub mod client;
pub mod contract;
pub mod error;
pub mod message;
pub mod signer;
pub mod wallet;

// Re-export key types
pub use address::{AddressError, FriendlyFormat, TonAddress};
pub use amount::{AmountError, Coins};
pub use client::{GetMethodOutput, LedgerClient, StackEntry, ToncenterClient};
pub use contract::{BalanceLookup, ContractHandle};
pub use error::{Result, SdkError};
pub use message::{build_withdraw_payload, MessageBody, WithdrawTransaction};
pub use signer::{derive_key_pair, is_basic_seed, split_mnemonic, KeyPair};
pub use wallet::WalletIdentity;

#[cfg(any(test, feature = "testing"))]
pub use client::MockLedgerClient;

/// Address of the deployed airdrop contract
pub const DEFAULT_CONTRACT_ADDRESS: &str = "EQDS6o3DqwMIrrPgLUt5bDUga-6kNeOBVNe19AZUvC_kHrJd";
