use anyhow::{Context as _, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warriors_gateway::{api, keepalive, metrics, Config, GatewayContext};
use warriors_sdk::client::DEFAULT_TIMEOUT;
use warriors_sdk::{
    is_basic_seed, split_mnemonic, Coins, LedgerClient, ToncenterClient, WalletIdentity,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clash Warriors Gateway");

    // Load configuration
    let config = Config::from_env()?;

    // Derive the admin wallet once; a malformed phrase is fatal
    let admin = match &config.admin_mnemonic {
        Some(phrase) => Some(load_admin(phrase, config.wallet_workchain)?),
        None => {
            warn!("ADMIN_MNEMONIC not set, claims will be refused");
            None
        }
    };

    // Connect to the ledger; the process must not serve against a dead endpoint
    let ledger: Arc<dyn LedgerClient> = Arc::new(
        ToncenterClient::connect(&config.endpoint, config.api_key.clone(), DEFAULT_TIMEOUT)
            .await
            .context("Failed to connect to ledger RPC")?,
    );

    // Initialize metrics
    let metrics_registry = metrics::init_metrics().context("Failed to register metrics")?;

    let context = Arc::new(GatewayContext {
        ledger,
        contract: config.contract_address,
        admin,
        claim_amount: config.claim_amount,
        gas: Coins::DEFAULT_GAS,
        balance_getter: config.balance_getter.clone(),
    });
    info!(contract = %config.contract_address, "Serving airdrop contract");

    // Start background services; keep-alive failures never stop the gateway
    match &config.external_hostname {
        Some(host) => {
            tokio::spawn(keepalive::run_keepalive(
                keepalive::health_url(host),
                config.keepalive_interval,
            ));
        }
        None => info!("RENDER_EXTERNAL_HOSTNAME not set, keep-alive disabled"),
    }

    // Start API server
    let api_handle = tokio::spawn(api::run_api_server(
        config.port,
        context,
        config.allowed_origins.clone(),
        metrics_registry,
    ));

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        res = api_handle => {
            error!("API service exited: {:?}", res);
        }
    }

    info!("Shutting down Clash Warriors Gateway");
    Ok(())
}

fn load_admin(phrase: &str, workchain: i8) -> Result<WalletIdentity> {
    let wallet =
        WalletIdentity::from_mnemonic(phrase, workchain).context("Invalid ADMIN_MNEMONIC")?;
    if !is_basic_seed(&split_mnemonic(phrase))? {
        warn!("ADMIN_MNEMONIC does not look like a wallet-generated phrase");
    }

    info!(address = %wallet.address(), "Admin wallet ready");
    Ok(wallet)
}
