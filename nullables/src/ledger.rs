//! Nullable ledger adapter: scripted transaction events, recorded calls.

use async_trait::async_trait;
use docchain_ledger::{LedgerAdapter, LedgerCall, LedgerError, TxEvent};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, Notify};

/// Account the null wallet exposes by default.
pub const NULL_ACCOUNT: &str = "0x00000000000000000000000000000000000000a1";

/// Gas estimate returned unless estimation is set to fail.
pub const NULL_GAS_ESTIMATE: u64 = 120_000;

/// A call handed to [`NullLedger::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCall {
    pub call: LedgerCall,
    pub gas_limit: u64,
}

/// Holds [`NullLedger::send`] until released, so a test can observe a
/// registration while it waits on the wallet.
pub struct LedgerGate {
    notify: Arc<Notify>,
}

impl LedgerGate {
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

/// A test wallet that emits scripted events instead of signing anything.
pub struct NullLedger {
    accounts: Mutex<Result<Vec<String>, LedgerError>>,
    script: Mutex<Vec<TxEvent>>,
    sent: Mutex<Vec<SentCall>>,
    send_error: Mutex<Option<LedgerError>>,
    gate: Mutex<Option<Arc<Notify>>>,
    fail_estimate: AtomicBool,
    estimate: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(Ok(vec![NULL_ACCOUNT.to_string()])),
            script: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
            gate: Mutex::new(None),
            fail_estimate: AtomicBool::new(false),
            estimate: AtomicU64::new(NULL_GAS_ESTIMATE),
        }
    }

    /// Events the next `send` emits, in order. The stream closes after
    /// the last one.
    pub fn script(&self, events: Vec<TxEvent>) {
        *lock(&self.script) = events;
    }

    /// What `request_accounts` answers.
    pub fn set_accounts(&self, accounts: Result<Vec<String>, LedgerError>) {
        *lock(&self.accounts) = accounts;
    }

    /// Make the next `send` fail before anything is submitted.
    pub fn fail_send(&self, error: LedgerError) {
        *lock(&self.send_error) = Some(error);
    }

    pub fn fail_estimate(&self, fail: bool) {
        self.fail_estimate.store(fail, Ordering::SeqCst);
    }

    pub fn set_estimate(&self, gas: u64) {
        self.estimate.store(gas, Ordering::SeqCst);
    }

    /// Block `send` until the returned gate is released.
    pub fn hold(&self) -> LedgerGate {
        let notify = Arc::new(Notify::new());
        *lock(&self.gate) = Some(notify.clone());
        LedgerGate { notify }
    }

    /// Every call handed to `send` (for assertions).
    pub fn sent(&self) -> Vec<SentCall> {
        lock(&self.sent).clone()
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerAdapter for NullLedger {
    fn name(&self) -> &str {
        "null"
    }

    async fn request_accounts(&self) -> Result<Vec<String>, LedgerError> {
        lock(&self.accounts).clone()
    }

    async fn estimate_gas(&self, _call: &LedgerCall) -> Result<u64, LedgerError> {
        if self.fail_estimate.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: "execution reverted".into(),
            });
        }
        Ok(self.estimate.load(Ordering::SeqCst))
    }

    async fn send(
        &self,
        call: &LedgerCall,
        gas_limit: u64,
    ) -> Result<mpsc::Receiver<TxEvent>, LedgerError> {
        lock(&self.sent).push(SentCall {
            call: call.clone(),
            gas_limit,
        });

        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(error) = lock(&self.send_error).take() {
            return Err(error);
        }

        let events = std::mem::take(&mut *lock(&self.script));
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers the whole script.
            let _ = tx.try_send(event);
        }
        Ok(rx)
    }
}
