//! Ledger adapter over a node's Ethereum JSON-RPC API.
//!
//! Signing is delegated to the node (`eth_sendTransaction`), which is how a
//! local dev node or a wallet bridge exposing unlocked accounts behaves. Key
//! management stays out of this process.

use async_trait::async_trait;
use docchain_types::TxHash;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::adapter::{LedgerAdapter, LedgerCall, Receipt, TxEvent};
use crate::error::LedgerError;

/// Consecutive failed receipt lookups tolerated before giving up.
const MAX_POLL_FAILURES: u32 = 10;

/// Longest wait between receipt lookups while the node keeps failing.
const MAX_POLL_BACKOFF: Duration = Duration::from_secs(30);

/// JSON-RPC client for an Ethereum-compatible node.
///
/// Wraps `reqwest::Client` with the node's URL and provides the calls the
/// [`LedgerAdapter`] contract needs.
#[derive(Clone)]
pub struct JsonRpcProvider {
    http: reqwest::Client,
    rpc_url: String,
    poll_interval: Duration,
    next_id: std::sync::Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl JsonRpcProvider {
    /// Create a provider targeting `rpc_url`, polling for receipts every
    /// `poll_interval`.
    pub fn new(rpc_url: impl Into<String>, poll_interval: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LedgerError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            poll_interval,
            next_id: std::sync::Arc::new(AtomicU64::new(1)),
        })
    }

    /// The configured node URL.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Send a JSON-RPC request and return the `result` field.
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method}: request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "{method}: node returned HTTP {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method}: invalid JSON response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(LedgerError::from_rpc(err.code, err.message));
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }

    fn tx_object(call: &LedgerCall, gas_limit: Option<u64>) -> Result<Value, LedgerError> {
        let data = format!("0x{}", hex::encode(call.calldata()?));
        let mut tx = json!({
            "to": call.target.contract_address,
            "data": data,
        });
        if let Some(from) = &call.from {
            tx["from"] = json!(from);
        }
        if let Some(gas) = gas_limit {
            tx["gas"] = json!(format!("0x{gas:x}"));
        }
        Ok(tx)
    }

    /// One receipt lookup; `None` while the transaction is still pending.
    async fn fetch_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, LedgerError> {
        let value = self
            .rpc_call("eth_getTransactionReceipt", json!([tx_hash.as_str()]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let receipt: RpcReceipt = serde_json::from_value(value)
            .map_err(|e| LedgerError::Transport(format!("invalid receipt: {e}")))?;
        if receipt.status.as_deref() == Some("0x0") {
            return Err(LedgerError::Reverted(receipt.transaction_hash));
        }
        Ok(Some(Receipt {
            tx_hash: TxHash::new(receipt.transaction_hash),
            block_number: receipt.block_number.as_deref().and_then(parse_quantity),
        }))
    }

    /// Poll until the transaction is mined.
    ///
    /// The transaction is already broadcast, so node and transport errors
    /// are retried with a doubling delay; only a receipt, a revert, or
    /// [`MAX_POLL_FAILURES`] errors in a row end the wait.
    async fn poll_receipt(&self, tx_hash: &TxHash) -> Result<Receipt, LedgerError> {
        let mut failures = 0u32;
        let mut delay = self.poll_interval;
        loop {
            match self.fetch_receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {
                    failures = 0;
                    delay = self.poll_interval;
                }
                Err(e @ (LedgerError::Transport(_) | LedgerError::Rpc { .. })) => {
                    failures += 1;
                    if failures >= MAX_POLL_FAILURES {
                        tracing::warn!(tx = %tx_hash, failures, "giving up on receipt: {e}");
                        return Err(e);
                    }
                    delay = (delay * 2).min(MAX_POLL_BACKOFF);
                    tracing::warn!(
                        tx = %tx_hash,
                        failures,
                        retry_in_ms = delay.as_millis() as u64,
                        "receipt poll failed: {e}"
                    );
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl LedgerAdapter for JsonRpcProvider {
    fn name(&self) -> &str {
        "json-rpc"
    }

    async fn request_accounts(&self) -> Result<Vec<String>, LedgerError> {
        let result = match self.rpc_call("eth_requestAccounts", json!([])).await {
            Ok(v) => v,
            // Plain nodes don't implement the wallet method.
            Err(LedgerError::Rpc { code: -32601, .. }) => {
                self.rpc_call("eth_accounts", json!([])).await?
            }
            Err(LedgerError::Transport(msg)) => return Err(LedgerError::Unavailable(msg)),
            Err(e) => return Err(e),
        };
        serde_json::from_value(result)
            .map_err(|e| LedgerError::Transport(format!("invalid accounts response: {e}")))
    }

    async fn estimate_gas(&self, call: &LedgerCall) -> Result<u64, LedgerError> {
        let tx = Self::tx_object(call, None)?;
        let result = self.rpc_call("eth_estimateGas", json!([tx])).await?;
        result
            .as_str()
            .and_then(parse_quantity)
            .ok_or_else(|| LedgerError::Transport(format!("invalid gas estimate: {result}")))
    }

    async fn send(
        &self,
        call: &LedgerCall,
        gas_limit: u64,
    ) -> Result<mpsc::Receiver<TxEvent>, LedgerError> {
        let tx = Self::tx_object(call, Some(gas_limit))?;
        let (events, rx) = mpsc::channel(2);
        let provider = self.clone();

        tokio::spawn(async move {
            let tx_hash = match provider.rpc_call("eth_sendTransaction", json!([tx])).await {
                Ok(Value::String(h)) => TxHash::new(h),
                Ok(other) => {
                    let _ = events
                        .send(TxEvent::Error(LedgerError::Transport(format!(
                            "unexpected eth_sendTransaction result: {other}"
                        ))))
                        .await;
                    return;
                }
                Err(e) => {
                    let _ = events.send(TxEvent::Error(e)).await;
                    return;
                }
            };

            if events.send(TxEvent::Hash(tx_hash.clone())).await.is_err() {
                return;
            }

            let last = match provider.poll_receipt(&tx_hash).await {
                Ok(receipt) => TxEvent::Receipt(receipt),
                Err(e) => TxEvent::Error(e),
            };
            let _ = events.send(last).await;
        });

        Ok(rx)
    }
}

/// Parse a JSON-RPC hex quantity such as `"0x1a"`.
pub fn parse_quantity(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::FunctionSpec;
    use crate::adapter::LedgerTarget;
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use docchain_types::{DocumentId, FileHash};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    fn call() -> LedgerCall {
        LedgerCall {
            target: LedgerTarget {
                contract_address: "0x00000000000000000000000000000000000000aa".into(),
                function: FunctionSpec {
                    name: "registerDocument".into(),
                    inputs: vec!["string".into(), "string".into(), "string".into()],
                },
            },
            from: Some("0x00000000000000000000000000000000000000bb".into()),
            document_id: DocumentId::new("d1"),
            file_name: "a.pdf".into(),
            file_hash: FileHash::new([1u8; 32]),
        }
    }

    #[test]
    fn parses_quantities() {
        assert_eq!(parse_quantity("0x5"), Some(5));
        assert_eq!(parse_quantity("0x493e0"), Some(300_000));
        assert_eq!(parse_quantity("0x"), None);
        assert_eq!(parse_quantity("12"), None);
    }

    #[test]
    fn tx_object_carries_gas_and_sender() {
        let tx = JsonRpcProvider::tx_object(&call(), Some(300_000)).unwrap();
        assert_eq!(tx["gas"], "0x493e0");
        assert_eq!(tx["from"], "0x00000000000000000000000000000000000000bb");
        assert!(tx["data"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn tx_object_for_estimate_has_no_gas() {
        let tx = JsonRpcProvider::tx_object(&call(), None).unwrap();
        assert!(tx.get("gas").is_none());
    }

    /// Minimal node: accepts any transaction as `0xabc` and fails the
    /// first `receipt_errors` receipt lookups with a rate-limit error.
    struct MockNode {
        receipt_errors: AtomicUsize,
        receipt_lookups: AtomicUsize,
        status: &'static str,
    }

    async fn rpc(State(node): State<Arc<MockNode>>, Json(req): Json<Value>) -> Json<Value> {
        let id = req["id"].clone();
        let reply = match req["method"].as_str() {
            Some("eth_sendTransaction") => json!({"jsonrpc": "2.0", "id": id, "result": "0xabc"}),
            Some("eth_getTransactionReceipt") => {
                node.receipt_lookups.fetch_add(1, Ordering::SeqCst);
                let failing = node
                    .receipt_errors
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if failing {
                    json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {"code": -32005, "message": "rate limited"}
                    })
                } else {
                    json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": {
                            "transactionHash": "0xabc",
                            "blockNumber": "0x5",
                            "status": node.status
                        }
                    })
                }
            }
            _ => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": "method not found"}
            }),
        };
        Json(reply)
    }

    async fn spawn_node(receipt_errors: usize, status: &'static str) -> (String, Arc<MockNode>) {
        let node = Arc::new(MockNode {
            receipt_errors: AtomicUsize::new(receipt_errors),
            receipt_lookups: AtomicUsize::new(0),
            status,
        });
        let app = Router::new()
            .route("/", post(rpc))
            .with_state(node.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        (format!("http://{addr}"), node)
    }

    async fn drain(mut rx: mpsc::Receiver<TxEvent>) -> Vec<TxEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn receipt_wait_survives_node_errors() {
        let (url, node) = spawn_node(3, "0x1").await;
        let provider = JsonRpcProvider::new(url, Duration::from_millis(5)).unwrap();

        let events = drain(provider.send(&call(), 300_000).await.unwrap()).await;
        assert_eq!(
            events,
            vec![
                TxEvent::Hash(TxHash::new("0xabc")),
                TxEvent::Receipt(Receipt {
                    tx_hash: TxHash::new("0xabc"),
                    block_number: Some(5),
                }),
            ]
        );
        assert_eq!(node.receipt_lookups.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn reverted_receipt_ends_the_wait() {
        let (url, _node) = spawn_node(0, "0x0").await;
        let provider = JsonRpcProvider::new(url, Duration::from_millis(5)).unwrap();

        let events = drain(provider.send(&call(), 300_000).await.unwrap()).await;
        assert_eq!(
            events,
            vec![
                TxEvent::Hash(TxHash::new("0xabc")),
                TxEvent::Error(LedgerError::Reverted("0xabc".into())),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_node_reports_unavailable() {
        let provider =
            JsonRpcProvider::new("http://127.0.0.1:9", Duration::from_millis(10)).unwrap();
        let err = provider.request_accounts().await.unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
    }
}
