//! Clash Warriors Gateway
//!
//! HTTP front for the airdrop contract:
//! - Reports token balances, falling back to zero when the ledger is unreachable
//! - Sends admin-signed claims
//! - Builds unsigned withdraw payloads for the client's own wallet
//! - Keeps the hosting instance awake with a periodic self-ping

pub mod api;
pub mod config;
pub mod context;
pub mod keepalive;
pub mod metrics;

pub use config::Config;
pub use context::GatewayContext;
