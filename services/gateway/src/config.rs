//! Service configuration

use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::fmt;
use std::time::Duration;
use warriors_sdk::{client::DEFAULT_ENDPOINT, Coins, TonAddress, DEFAULT_CONTRACT_ADDRESS};

/// Browser origins allowed when `ALLOWED_ORIGINS` is not set
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://clashwarriors.tech",
    "https://www.clashwarriors.tech",
    "http://localhost:3000",
    "http://localhost:5173",
];

#[derive(Clone)]
pub struct Config {
    /// API server port
    pub port: u16,

    /// Admin wallet mnemonic; claims are refused without it
    pub admin_mnemonic: Option<String>,

    /// Ledger RPC API key
    pub api_key: Option<String>,

    /// Ledger JSON-RPC endpoint
    pub endpoint: String,

    /// Airdrop contract
    pub contract_address: TonAddress,

    /// Public hostname of this service, pinged to keep it awake
    pub external_hostname: Option<String>,

    /// Normalized browser origins allowed to call the API
    pub allowed_origins: Vec<String>,

    /// Amount sent per claim
    pub claim_amount: Coins,

    /// Contract getter answering balance queries
    pub balance_getter: String,

    /// Self-ping interval
    pub keepalive_interval: Duration,

    /// Workchain of the admin wallet
    pub wallet_workchain: i8,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let contract_address: TonAddress = var("CONTRACT_ADDRESS")
            .unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_string())
            .parse()
            .context("Invalid CONTRACT_ADDRESS")?;

        let allowed_origins = match var("ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(normalize_origin)
                .collect::<Result<Vec<_>>>()?,
            None => DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| normalize_origin(o))
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(Config {
            port: var("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("Invalid PORT")?,

            admin_mnemonic: var("ADMIN_MNEMONIC"),

            api_key: var("TONCENTER_API_KEY"),

            endpoint: var("TONCENTER_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),

            contract_address,

            external_hostname: var("RENDER_EXTERNAL_HOSTNAME"),

            allowed_origins,

            claim_amount: Coins::from_decimal_str(
                &var("CLAIM_AMOUNT").unwrap_or_else(|| "1".to_string()),
            )
            .context("Invalid CLAIM_AMOUNT")?,

            balance_getter: var("BALANCE_GETTER").unwrap_or_else(|| "balanceOf".to_string()),

            keepalive_interval: Duration::from_secs(
                var("KEEPALIVE_INTERVAL")
                    .unwrap_or_else(|| "30".to_string())
                    .parse::<u64>()
                    .context("Invalid KEEPALIVE_INTERVAL")?
                    .max(1),
            ),

            wallet_workchain: var("WALLET_WORKCHAIN")
                .unwrap_or_else(|| "0".to_string())
                .parse()
                .context("Invalid WALLET_WORKCHAIN")?,
        })
    }
}

// Keeps the mnemonic and API key out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("admin_mnemonic", &self.admin_mnemonic.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("contract_address", &self.contract_address.to_string())
            .field("external_hostname", &self.external_hostname)
            .field("allowed_origins", &self.allowed_origins)
            .field("claim_amount", &self.claim_amount.to_decimal_string())
            .field("balance_getter", &self.balance_getter)
            .field("keepalive_interval", &self.keepalive_interval)
            .field("wallet_workchain", &self.wallet_workchain)
            .finish()
    }
}

/// `scheme://host[:port]` exactly as browsers send it in the `Origin` header
fn normalize_origin(origin: &str) -> Result<String> {
    let url = Url::parse(origin).with_context(|| format!("Invalid origin {origin:?}"))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        bail!("Invalid origin {origin:?}: expected http(s)://host[:port]");
    }
    Ok(url.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.admin_mnemonic.is_none());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.contract_address.to_string(), DEFAULT_CONTRACT_ADDRESS);
        assert!(config
            .allowed_origins
            .contains(&"https://clashwarriors.tech".to_string()));
        assert_eq!(config.claim_amount.nano(), 1_000_000_000);
        assert_eq!(config.balance_getter, "balanceOf");
        assert_eq!(config.keepalive_interval, Duration::from_secs(30));
        assert_eq!(config.wallet_workchain, 0);
        assert!(config.external_hostname.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("TONCENTER_API_KEY", "key"),
            ("RENDER_EXTERNAL_HOSTNAME", "warriors.onrender.com"),
            ("ALLOWED_ORIGINS", "https://a.example, http://localhost:8080/ ,"),
            ("CLAIM_AMOUNT", "2.5"),
            ("KEEPALIVE_INTERVAL", "10"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.external_hostname.as_deref(), Some("warriors.onrender.com"));
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "http://localhost:8080"]
        );
        assert_eq!(config.claim_amount.nano(), 2_500_000_000);
        assert_eq!(config.keepalive_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config_from(&[("ADMIN_MNEMONIC", "   "), ("PORT", "")]).unwrap();
        assert!(config.admin_mnemonic.is_none());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_malformed_values_are_fatal() {
        assert!(config_from(&[("CONTRACT_ADDRESS", "not-an-address")]).is_err());
        assert!(config_from(&[("PORT", "http")]).is_err());
        assert!(config_from(&[("CLAIM_AMOUNT", "-1")]).is_err());
        assert!(config_from(&[("ALLOWED_ORIGINS", "clashwarriors.tech")]).is_err());
        assert!(config_from(&[("WALLET_WORKCHAIN", "300")]).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config_from(&[
            ("ADMIN_MNEMONIC", "tattoo stock spice"),
            ("TONCENTER_API_KEY", "super-secret"),
        ])
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("tattoo"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
