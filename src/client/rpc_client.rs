// JSON-RPC client for a NEAR node
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::crypto::PublicKey;
use crate::error::{NearCliError, Result};
use crate::transaction::SignedTransaction;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AccountView {
    pub amount: String,
    pub locked: String,
    pub code_hash: String,
    pub storage_usage: u64,
    pub block_height: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AccessKeyView {
    pub nonce: u64,
    pub block_hash: String,
}

pub struct RpcClient {
    url: String,
    client: Client,
    request_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url,
            client,
            request_id: AtomicU64::new(1),
        })
    }

    // Helper for sending requests
    async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        debug!("RPC {} #{} -> {}", method, id, self.url);

        let response = self.client
            .post(&self.url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_response(status, &body)
    }

    async fn query(&self, params: Value) -> Result<Value> {
        let result = self.send_request("query", params).await?;
        // Older nodes report query failures inside the result
        if let Some(error) = result.get("error").and_then(|e| e.as_str()) {
            return Err(NearCliError::Rpc(error.to_string()));
        }
        Ok(result)
    }

    pub async fn view_account(&self, account_id: &str) -> Result<AccountView> {
        let result = self
            .query(json!({
                "request_type": "view_account",
                "finality": "final",
                "account_id": account_id,
            }))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn view_access_key(&self, account_id: &str, public_key: &PublicKey) -> Result<AccessKeyView> {
        let result = self
            .query(json!({
                "request_type": "view_access_key",
                "finality": "final",
                "account_id": account_id,
                "public_key": public_key.to_string(),
            }))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Submit and wait for the final outcome; returns the transaction hash.
    pub async fn broadcast_tx_commit(&self, signed: &SignedTransaction) -> Result<String> {
        let result = self
            .send_request("broadcast_tx_commit", json!([signed.to_base64()?]))
            .await?;
        check_outcome(&result)
    }
}

/// Nodes send JSON-RPC errors with non-2xx statuses too (408 for timeouts),
/// so the body is inspected before the status.
fn parse_response(status: StatusCode, body: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => {
            if let Some(error) = json.get("error") {
                return Err(rpc_error(error));
            }
            if !status.is_success() {
                return Err(NearCliError::Rpc(format!("HTTP {}: {}", status, json)));
            }
            Ok(json["result"].clone())
        }
        Err(_) if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT => {
            Err(NearCliError::Timeout(format!("HTTP {}", status)))
        }
        Err(_) if !status.is_success() => {
            let snippet: String = body.chars().take(200).collect();
            Err(NearCliError::Rpc(format!("HTTP {}: {}", status, snippet.trim())))
        }
        Err(e) => Err(e.into()),
    }
}

/// Map a JSON-RPC error object to an error, keeping timeouts distinguishable.
fn rpc_error(error: &Value) -> NearCliError {
    let cause = error["cause"]["name"].as_str().unwrap_or_default();
    let data = match &error["data"] {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let message = error["message"].as_str().unwrap_or("Unknown error");

    let text = if data.is_empty() { message.to_string() } else { format!("{}: {}", message, data) };
    if cause == "TIMEOUT_ERROR" || data.contains("Timeout") {
        NearCliError::Timeout(text)
    } else if cause.is_empty() {
        NearCliError::Rpc(text)
    } else {
        NearCliError::Rpc(format!("{} ({})", text, cause))
    }
}

fn check_outcome(result: &Value) -> Result<String> {
    if let Some(failure) = result["status"].get("Failure") {
        return Err(NearCliError::AccountCreation(failure.to_string()));
    }
    Ok(result["transaction"]["hash"].as_str().unwrap_or("").to_string())
}
