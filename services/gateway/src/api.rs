//! REST API for the airdrop gateway

use prometheus::{Encoder, Registry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use warriors_sdk::{build_withdraw_payload, BalanceLookup, TonAddress};

use crate::context::GatewayContext;
use crate::metrics;

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Deserialize)]
pub struct WalletRequest {
    #[serde(default)]
    pub wallet: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawPayloadRequest {
    /// Decimal amount in TON, as a string or a JSON number
    #[serde(default)]
    pub amount: Option<Value>,
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    wallet: String,
    amount: BalanceLookup,
}

pub async fn run_api_server(
    port: u16,
    context: Arc<GatewayContext>,
    allowed_origins: Vec<String>,
    metrics_registry: Registry,
) {
    let routes = routes(context, allowed_origins, Arc::new(metrics_registry));

    info!("API server listening on port {}", port);

    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}

/// All routes behind the origin allow-list
pub fn routes(
    context: Arc<GatewayContext>,
    allowed_origins: Vec<String>,
    metrics_registry: Arc<Registry>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    // Health check endpoint
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "alive" })));

    // Metrics endpoint
    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_metrics(metrics_registry))
        .and_then(get_metrics);

    let balance = warp::path("balance")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body::<WalletRequest>())
        .and(with_context(context.clone()))
        .and_then(balance_handler);

    let claim = warp::path("claim-airdrop")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body::<WalletRequest>())
        .and(with_context(context.clone()))
        .and_then(claim_handler);

    let withdraw = warp::path("withdraw-payload")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body::<WithdrawPayloadRequest>())
        .and(with_context(context))
        .and_then(withdraw_payload_handler);

    let cors = warp::cors()
        .allow_origins(allowed_origins.iter().map(String::as_str))
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    // Error replies are recovered inside the CORS wrapper so browsers can read them
    let api = health
        .or(metrics)
        .or(balance)
        .or(claim)
        .or(withdraw)
        .recover(handle_rejection)
        .with(cors);

    with_allowed_origin(Arc::new(allowed_origins))
        .and(api)
        .recover(handle_rejection)
}

// Helper filters
fn with_context(
    context: Arc<GatewayContext>,
) -> impl Filter<Extract = (Arc<GatewayContext>,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

fn with_metrics(
    registry: Arc<Registry>,
) -> impl Filter<Extract = (Arc<Registry>,), Error = Infallible> + Clone {
    warp::any().map(move || registry.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Requests without an `Origin` header always pass
fn with_allowed_origin(
    allowed: Arc<Vec<String>>,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::optional::<String>("origin")
        .and_then(move |origin: Option<String>| {
            let allowed = allowed.clone();
            async move {
                match origin {
                    Some(origin) if !allowed.contains(&origin) => {
                        Err(warp::reject::custom(ApiError::OriginNotAllowed(origin)))
                    }
                    _ => Ok(()),
                }
            }
        })
        .untuple_one()
}

fn required(field: Option<String>, name: &'static str) -> Result<String, Rejection> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| warp::reject::custom(ApiError::MissingField(name)))
}

// Handler functions
async fn get_metrics(registry: Arc<Registry>) -> Result<impl Reply, Rejection> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer).map_err(|e| {
        warp::reject::custom(ApiError::Internal {
            error: "Failed to encode metrics",
            details: e.to_string(),
        })
    })?;
    Ok(warp::reply::with_header(
        buffer,
        "Content-Type",
        encoder.format_type(),
    ))
}

async fn balance_handler(
    request: WalletRequest,
    context: Arc<GatewayContext>,
) -> Result<impl Reply, Rejection> {
    // Echoed back exactly as sent
    let wallet = request
        .wallet
        .filter(|w| !w.trim().is_empty())
        .ok_or_else(|| warp::reject::custom(ApiError::MissingField("wallet")))?;
    metrics::BALANCE_QUERIES_TOTAL.inc();

    let amount = context
        .contract()
        .get_balance(wallet.trim(), &context.balance_getter)
        .await;
    if !amount.is_known() {
        metrics::BALANCE_FALLBACKS_TOTAL.inc();
    }

    Ok(warp::reply::json(&BalanceResponse { wallet, amount }))
}

async fn claim_handler(
    request: WalletRequest,
    context: Arc<GatewayContext>,
) -> Result<impl Reply, Rejection> {
    let wallet = required(request.wallet, "wallet")?;
    let target: TonAddress = wallet.parse().map_err(|e| {
        warp::reject::custom(ApiError::InvalidInput(format!("Invalid wallet address: {e}")))
    })?;

    let result = context
        .contract()
        .claim(
            context.admin.as_ref(),
            &target,
            context.claim_amount,
            context.gas,
        )
        .await;

    match result {
        Ok(()) => {
            metrics::CLAIMS_SENT_TOTAL.inc();
            Ok(warp::reply::json(&json!({ "success": true })))
        }
        Err(e) => {
            metrics::CLAIMS_FAILED_TOTAL.inc();
            error!(wallet = %target, "Claim failed: {}", e);
            Err(warp::reject::custom(ApiError::Internal {
                error: "Failed to claim airdrop",
                details: e.to_string(),
            }))
        }
    }
}

async fn withdraw_payload_handler(
    request: WithdrawPayloadRequest,
    context: Arc<GatewayContext>,
) -> Result<impl Reply, Rejection> {
    let amount = match request.amount {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let amount = required(amount, "amount")?;

    let transaction = build_withdraw_payload(&amount, &context.contract, context.gas)
        .map_err(|e| {
            warn!(%amount, "Withdraw payload rejected: {}", e);
            warp::reject::custom(ApiError::Internal {
                error: "Failed to build withdraw payload",
                details: e.to_string(),
            })
        })?;
    metrics::WITHDRAW_PAYLOADS_TOTAL.inc();

    Ok(warp::reply::json(&json!({
        "success": true,
        "transaction": transaction,
    })))
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "error": "Not found" }))
    } else if let Some(api_error) = err.find::<ApiError>() {
        if let ApiError::OriginNotAllowed(origin) = api_error {
            metrics::CORS_REJECTIONS_TOTAL.inc();
            warn!(%origin, "Blocked request from disallowed origin");
        }
        api_error.to_response()
    } else if let Some(e) = err.find::<warp::filters::cors::CorsForbidden>() {
        metrics::CORS_REJECTIONS_TOTAL.inc();
        warn!("Blocked cross-origin request: {}", e);
        (
            StatusCode::FORBIDDEN,
            json!({ "error": "Not allowed by CORS" }),
        )
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            json!({ "error": format!("Invalid JSON body: {e}") }),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "error": "Method not allowed" }),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "error": "Request body too large" }),
        )
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            json!({ "error": "Content-Length required" }),
        )
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
    {
        (
            StatusCode::BAD_REQUEST,
            json!({ "error": "Request must be JSON" }),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Internal server error" }),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

// Error handling
#[derive(Debug)]
enum ApiError {
    MissingField(&'static str),
    InvalidInput(String),
    OriginNotAllowed(String),
    Internal {
        error: &'static str,
        details: String,
    },
}

impl ApiError {
    fn to_response(&self) -> (StatusCode, Value) {
        match self {
            ApiError::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("{field} is required") }),
            ),
            ApiError::InvalidInput(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ApiError::OriginNotAllowed(_) => (
                StatusCode::FORBIDDEN,
                json!({ "error": "Not allowed by CORS" }),
            ),
            ApiError::Internal { error, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": error, "details": details }),
            ),
        }
    }
}

impl warp::reject::Reject for ApiError {}
