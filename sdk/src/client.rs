//! Ledger RPC client
//!
//! Speaks the toncenter v2 JSON-RPC dialect: every call is a POST of
//! `{"id", "jsonrpc", "method", "params"}` and every answer is wrapped in
//! `{"ok", "result" | "error", "code"}`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::address::TonAddress;
use crate::cell::{deserialize_boc, serialize_boc, Cell, CellBuilder, CellError};
use crate::error::{Result, SdkError};

pub const DEFAULT_ENDPOINT: &str = "https://toncenter.com/api/v2/jsonRPC";

/// Upper bound for a single RPC round trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const API_KEY_HEADER: &str = "X-API-Key";

/// A TVM stack value passed to or returned from a getter
#[derive(Debug, Clone, PartialEq)]
pub enum StackEntry {
    Num(i128),
    Slice(Arc<Cell>),
    Cell(Arc<Cell>),
}

impl StackEntry {
    /// Address argument, encoded as a slice holding a `MsgAddressInt`
    pub fn address(address: &TonAddress) -> std::result::Result<Self, CellError> {
        let cell = CellBuilder::new().store_address(address)?.build();
        Ok(StackEntry::Slice(Arc::new(cell)))
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            StackEntry::Num(n) => Some(*n),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            StackEntry::Num(n) if *n < 0 => json!(["num", format!("-0x{:x}", n.unsigned_abs())]),
            StackEntry::Num(n) => json!(["num", format!("0x{n:x}")]),
            StackEntry::Slice(cell) => {
                json!(["tvm.Slice", STANDARD.encode(serialize_boc(cell, false))])
            }
            StackEntry::Cell(cell) => {
                json!(["tvm.Cell", STANDARD.encode(serialize_boc(cell, false))])
            }
        }
    }

    fn from_json(value: &Value) -> Result<Self> {
        let malformed = || SdkError::Rpc(format!("malformed stack entry: {value}"));

        let pair = value.as_array().filter(|a| a.len() == 2).ok_or_else(malformed)?;
        let kind = pair[0].as_str().ok_or_else(malformed)?;
        match kind {
            "num" => {
                let text = pair[1].as_str().ok_or_else(malformed)?;
                parse_num(text).ok_or_else(malformed).map(StackEntry::Num)
            }
            "cell" | "slice" | "tvm.Cell" | "tvm.Slice" => {
                // Results carry `{"bytes": ..}` objects, arguments carry plain strings
                let encoded = pair[1]
                    .as_str()
                    .or_else(|| pair[1].get("bytes").and_then(Value::as_str))
                    .ok_or_else(malformed)?;
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| SdkError::Rpc(format!("stack entry is not base64: {e}")))?;
                let cell = deserialize_boc(&bytes)?;
                if matches!(kind, "cell" | "tvm.Cell") {
                    Ok(StackEntry::Cell(cell))
                } else {
                    Ok(StackEntry::Slice(cell))
                }
            }
            other => Err(SdkError::Rpc(format!("unsupported stack entry type {other}"))),
        }
    }
}

fn parse_num(text: &str) -> Option<i128> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    // from_str_radix would accept a second sign
    if digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, 16).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Result of a getter invocation
#[derive(Debug, Clone, PartialEq)]
pub struct GetMethodOutput {
    pub exit_code: i32,
    pub stack: Vec<StackEntry>,
}

/// Read and write access to the ledger
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Invoke a getter on `address`
    async fn run_get_method(
        &self,
        address: &TonAddress,
        method: &str,
        stack: Vec<StackEntry>,
    ) -> Result<GetMethodOutput>;

    /// Broadcast a serialized external message
    async fn send_boc(&self, boc: &[u8]) -> Result<()>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    id: u64,
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RunResult {
    exit_code: i32,
    #[serde(default)]
    stack: Vec<Value>,
}

/// `LedgerClient` over HTTP
pub struct ToncenterClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ToncenterClient {
    /// Build the client and make sure the endpoint answers
    pub async fn connect(
        endpoint: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkError::Connection(e.to_string()))?;

        let client = Self {
            http,
            endpoint: endpoint.to_string(),
            api_key,
        };

        client
            .call("getMasterchainInfo", json!({}))
            .await
            .map_err(|e| SdkError::Connection(format!("{endpoint}: {e}")))?;

        info!(endpoint, "Connected to ledger RPC");
        Ok(client)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let mut request = self.http.post(&self.endpoint).json(&RpcRequest {
            id: 1,
            jsonrpc: "2.0",
            method,
            params,
        });
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body: RpcResponse = response.json().await?;

        if !body.ok {
            return Err(SdkError::Rpc(format!(
                "{method} failed with code {}: {}",
                body.code.unwrap_or_else(|| i64::from(status.as_u16())),
                body.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        body.result
            .ok_or_else(|| SdkError::Rpc(format!("{method} returned no result")))
    }
}

#[async_trait]
impl LedgerClient for ToncenterClient {
    async fn run_get_method(
        &self,
        address: &TonAddress,
        method: &str,
        stack: Vec<StackEntry>,
    ) -> Result<GetMethodOutput> {
        let params = json!({
            "address": address.to_string(),
            "method": method,
            "stack": stack.iter().map(StackEntry::to_json).collect::<Vec<_>>(),
        });
        let result = self.call("runGetMethod", params).await?;
        let raw: RunResult = serde_json::from_value(result)
            .map_err(|e| SdkError::Rpc(format!("unexpected runGetMethod result: {e}")))?;

        let stack = raw
            .stack
            .iter()
            .map(StackEntry::from_json)
            .collect::<Result<Vec<_>>>()?;
        debug!(%address, method, exit_code = raw.exit_code, "getter returned");

        Ok(GetMethodOutput {
            exit_code: raw.exit_code,
            stack,
        })
    }

    async fn send_boc(&self, boc: &[u8]) -> Result<()> {
        self.call("sendBoc", json!({ "boc": STANDARD.encode(boc) }))
            .await?;
        Ok(())
    }
}
