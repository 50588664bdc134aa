//! EIP-1193 wallet bridge over JSON-RPC.
//!
//! Speaks JSON-RPC 2.0 over HTTP to a bridge that forwards requests to the
//! user's wallet (a browser extension relay, a desktop wallet's RPC port,
//! or a local dev signer). Error codes follow EIP-1193:
//! `4001` user rejected, `4100` unauthorized, `4900`/`4901` disconnected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WalletError;
use crate::wallet::WalletGateway;

const USER_REJECTED: i64 = 4001;
const UNAUTHORIZED: i64 = 4100;
const DISCONNECTED: i64 = 4900;
const CHAIN_DISCONNECTED: i64 = 4901;

pub struct Eip1193RpcGateway {
    endpoint: String,
    client: reqwest::Client,
    probe_timeout: Duration,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Why a JSON-RPC call failed, before it is mapped onto a `WalletError`.
#[derive(Debug)]
enum CallFailure {
    Transport(String),
    Rpc(RpcErrorObject),
    Malformed(String),
}

impl Eip1193RpcGateway {
    pub fn new(endpoint: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
            probe_timeout,
            next_id: AtomicU64::new(1),
        }
    }

    /// Issue one JSON-RPC call. `timeout` is only set for probes; calls that
    /// wait on the user must not time out.
    async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, CallFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        tracing::debug!(method, id, endpoint = %self.endpoint, "wallet rpc call");

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| CallFailure::Transport(format!("{method} request failed: {e}")))?;
        let status = response.status();
        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| CallFailure::Malformed(format!("{method} json decode failed: {e}")))?;

        if let Some(err) = body.error {
            tracing::debug!(method, code = err.code, message = %err.message, "wallet rpc error");
            return Err(CallFailure::Rpc(err));
        }
        if !status.is_success() {
            return Err(CallFailure::Transport(format!(
                "{method} returned HTTP {status}"
            )));
        }
        body.result
            .ok_or_else(|| CallFailure::Malformed(format!("{method} response missing result")))
    }
}

fn is_rejection(code: i64) -> bool {
    matches!(code, USER_REJECTED | UNAUTHORIZED)
}

fn is_disconnect(code: i64) -> bool {
    matches!(code, DISCONNECTED | CHAIN_DISCONNECTED)
}

fn accounts_error(failure: CallFailure) -> WalletError {
    match failure {
        CallFailure::Rpc(err) if is_rejection(err.code) => WalletError::UserRejected,
        CallFailure::Rpc(err) if is_disconnect(err.code) => {
            WalletError::ProviderUnavailable(format!("wallet disconnected: {}", err.message))
        }
        CallFailure::Rpc(err) => WalletError::InvalidResponse(format!(
            "eth_requestAccounts failed ({}): {}",
            err.code, err.message
        )),
        CallFailure::Transport(msg) => WalletError::ProviderUnavailable(msg),
        CallFailure::Malformed(msg) => WalletError::InvalidResponse(msg),
    }
}

fn signing_error(failure: CallFailure) -> WalletError {
    match failure {
        CallFailure::Rpc(err) if is_rejection(err.code) => WalletError::UserRejected,
        CallFailure::Rpc(err) if is_disconnect(err.code) => {
            WalletError::ProviderUnavailable(format!("wallet disconnected: {}", err.message))
        }
        CallFailure::Rpc(err) => {
            WalletError::SigningFailed(format!("personal_sign failed ({}): {}", err.code, err.message))
        }
        CallFailure::Transport(msg) | CallFailure::Malformed(msg) => WalletError::SigningFailed(msg),
    }
}

fn chain_error(failure: CallFailure) -> WalletError {
    match failure {
        CallFailure::Rpc(err) if is_disconnect(err.code) => {
            WalletError::ProviderUnavailable(format!("wallet disconnected: {}", err.message))
        }
        CallFailure::Rpc(err) => {
            WalletError::InvalidResponse(format!("eth_chainId failed ({}): {}", err.code, err.message))
        }
        CallFailure::Transport(msg) => WalletError::ProviderUnavailable(msg),
        CallFailure::Malformed(msg) => WalletError::InvalidResponse(msg),
    }
}

#[async_trait]
impl WalletGateway for Eip1193RpcGateway {
    async fn is_available(&self) -> bool {
        match self
            .call("eth_chainId", serde_json::json!([]), Some(self.probe_timeout))
            .await
        {
            Ok(_) => true,
            Err(failure) => {
                tracing::debug!(?failure, endpoint = %self.endpoint, "wallet probe failed");
                false
            }
        }
    }

    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let result = self
            .call("eth_requestAccounts", serde_json::json!([]), None)
            .await
            .map_err(accounts_error)?;
        let items = result.as_array().ok_or_else(|| {
            WalletError::InvalidResponse("eth_requestAccounts: array expected".to_string())
        })?;
        items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    WalletError::InvalidResponse("eth_requestAccounts: string expected".to_string())
                })
            })
            .collect()
    }

    async fn current_chain_id(&self) -> Result<u64, WalletError> {
        let result = self
            .call("eth_chainId", serde_json::json!([]), None)
            .await
            .map_err(chain_error)?;
        json_chain_id_to_u64(&result)
    }

    async fn sign_message(&self, message: &str, account: &str) -> Result<String, WalletError> {
        let payload_hex = format!("0x{}", encode_hex_lower(message.as_bytes()));
        let result = self
            .call(
                "personal_sign",
                serde_json::json!([payload_hex, account]),
                None,
            )
            .await
            .map_err(signing_error)?;
        result.as_str().map(str::to_string).ok_or_else(|| {
            WalletError::SigningFailed("personal_sign response must be a hex string".to_string())
        })
    }
}

pub(crate) fn json_chain_id_to_u64(value: &Value) -> Result<u64, WalletError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let raw = value.as_str().ok_or_else(|| {
        WalletError::InvalidResponse("chain id must be string or number".to_string())
    })?;
    parse_chain_id_str(raw)
}

fn parse_chain_id_str(raw: &str) -> Result<u64, WalletError> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16)
            .map_err(|e| WalletError::InvalidResponse(format!("invalid hex chain id: {e}"))),
        None => raw
            .parse()
            .map_err(|e| WalletError::InvalidResponse(format!("invalid chain id: {e}"))),
    }
}

fn encode_hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(nibble_to_hex(b >> 4));
        out.push(nibble_to_hex(b & 0x0f));
    }
    out
}

fn nibble_to_hex(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        10..=15 => (b'a' + (nibble - 10)) as char,
        _ => '0',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(code: i64) -> CallFailure {
        CallFailure::Rpc(RpcErrorObject {
            code,
            message: "nope".to_string(),
        })
    }

    #[test]
    fn chain_id_accepts_hex_decimal_and_numbers() {
        assert_eq!(json_chain_id_to_u64(&serde_json::json!("0x38")).expect("hex"), 56);
        assert_eq!(json_chain_id_to_u64(&serde_json::json!("0X1")).expect("hex"), 1);
        assert_eq!(json_chain_id_to_u64(&serde_json::json!("128")).expect("dec"), 128);
        assert_eq!(json_chain_id_to_u64(&serde_json::json!(66)).expect("num"), 66);
        assert!(json_chain_id_to_u64(&serde_json::json!("0xzz")).is_err());
        assert!(json_chain_id_to_u64(&serde_json::json!(null)).is_err());
    }

    #[test]
    fn rejection_codes_map_to_user_rejected() {
        assert_eq!(accounts_error(rpc(4001)), WalletError::UserRejected);
        assert_eq!(accounts_error(rpc(4100)), WalletError::UserRejected);
        assert_eq!(signing_error(rpc(4001)), WalletError::UserRejected);
    }

    #[test]
    fn other_codes_map_per_operation() {
        assert!(matches!(
            accounts_error(rpc(-32603)),
            WalletError::InvalidResponse(_)
        ));
        assert!(matches!(
            accounts_error(rpc(4900)),
            WalletError::ProviderUnavailable(_)
        ));
        assert!(matches!(signing_error(rpc(-32603)), WalletError::SigningFailed(_)));
        assert!(matches!(
            signing_error(rpc(4900)),
            WalletError::ProviderUnavailable(_)
        ));
        assert!(matches!(chain_error(rpc(-32601)), WalletError::InvalidResponse(_)));
        assert!(matches!(
            signing_error(CallFailure::Transport("connection reset".to_string())),
            WalletError::SigningFailed(_)
        ));
    }

    #[test]
    fn message_is_hex_encoded_utf8() {
        assert_eq!(encode_hex_lower(b"0xab;n1"), "307861623b6e31");
        assert_eq!(encode_hex_lower(&[0x00, 0xff, 0x10]), "00ff10");
    }
}
