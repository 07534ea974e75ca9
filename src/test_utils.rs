//! Test Utilities Module
//!
//! Deterministic stand-ins for the network, storage and alert collaborators.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::eth::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::alert::AlertNotifier;
use crate::probe::errors::ProbeError;
use crate::probe::result::ProbeResult;
use crate::rpc::ProbeRpc;
use crate::sink::{ObjectUploader, ResultSink};
use crate::wallet::ProbeWallet;

/// Well-known development key (first Hardhat/Anvil account)
pub const TEST_PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address derived from [`TEST_PRIVATE_KEY`]
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

pub fn test_wallet() -> ProbeWallet {
    let signer: PrivateKeySigner = TEST_PRIVATE_KEY.parse().expect("valid test key");
    ProbeWallet::from_signer(signer)
}

pub fn test_address() -> Address {
    TEST_ADDRESS.parse().expect("valid test address")
}

/// Scriptable RPC. Records the name of every call in order.
pub struct MockRpc {
    balance: Mutex<U256>,
    nonce: Mutex<u64>,
    advance_nonce_on_send: bool,
    base_fee: U256,
    priority_fee: U256,
    gas_limit: u64,
    broadcast_delay: Option<Duration>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
    sent: Mutex<Vec<Bytes>>,
    estimated: Mutex<Vec<TransactionRequest>>,
}

impl MockRpc {
    /// 10 native units, nonce 1, 25 gwei base fee, 1 gwei tip, 21000 gas
    pub fn new() -> Self {
        Self {
            balance: Mutex::new(U256::from(10_000_000_000_000_000_000u128)),
            nonce: Mutex::new(1),
            advance_nonce_on_send: false,
            base_fee: U256::from(25_000_000_000u64),
            priority_fee: U256::from(1_000_000_000u64),
            gas_limit: 21_000,
            broadcast_delay: None,
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            estimated: Mutex::new(Vec::new()),
        }
    }

    pub fn with_balance(self, wei: u128) -> Self {
        *self.balance.lock() = U256::from(wei);
        self
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        *self.nonce.lock() = nonce;
        self
    }

    pub fn with_fees(mut self, base_fee_wei: u128, priority_fee_wei: u128) -> Self {
        self.base_fee = U256::from(base_fee_wei);
        self.priority_fee = U256::from(priority_fee_wei);
        self
    }

    /// Each successful broadcast bumps the account nonce, like a mempool would
    pub fn advancing_nonce(mut self) -> Self {
        self.advance_nonce_on_send = true;
        self
    }

    pub fn with_broadcast_delay(mut self, delay: Duration) -> Self {
        self.broadcast_delay = Some(delay);
        self
    }

    /// Make the named operation fail on every call
    pub fn failing(self, operation: &'static str) -> Self {
        self.failing.lock().insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().clone()
    }

    pub fn estimated(&self) -> Vec<TransactionRequest> {
        self.estimated.lock().clone()
    }

    fn record(&self, operation: &'static str) -> Result<(), ProbeError> {
        self.calls.lock().push(operation);
        if self.failing.lock().contains(operation) {
            if operation == "send_raw_transaction" {
                return Err(ProbeError::Broadcast("replacement transaction underpriced".to_string()));
            }
            return Err(ProbeError::network(operation, "connection refused"));
        }
        Ok(())
    }
}

impl Default for MockRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProbeRpc for MockRpc {
    async fn get_balance(&self, _address: Address) -> Result<U256, ProbeError> {
        self.record("get_balance")?;
        Ok(*self.balance.lock())
    }

    async fn get_transaction_count(&self, _address: Address) -> Result<u64, ProbeError> {
        self.record("get_transaction_count")?;
        Ok(*self.nonce.lock())
    }

    async fn get_base_fee(&self) -> Result<U256, ProbeError> {
        self.record("get_base_fee")?;
        Ok(self.base_fee)
    }

    async fn get_max_priority_fee(&self) -> Result<U256, ProbeError> {
        self.record("get_max_priority_fee")?;
        Ok(self.priority_fee)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, ProbeError> {
        self.record("estimate_gas")?;
        self.estimated.lock().push(tx.clone());
        Ok(self.gas_limit)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<(), ProbeError> {
        if let Some(delay) = self.broadcast_delay {
            tokio::time::sleep(delay).await;
        }
        self.record("send_raw_transaction")?;
        self.sent.lock().push(Bytes::copy_from_slice(raw));
        if self.advance_nonce_on_send {
            *self.nonce.lock() += 1;
        }
        Ok(())
    }
}

/// Keeps every persisted result in memory
#[derive(Default)]
pub struct RecordingSink {
    results: Mutex<Vec<ProbeResult>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the result, then reports a persistence failure
    pub fn failing() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn results(&self) -> Vec<ProbeResult> {
        self.results.lock().clone()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn persist(&self, result: &ProbeResult) -> Result<(), ProbeError> {
        self.results.lock().push(result.clone());
        if self.fail {
            return Err(ProbeError::Persistence("bucket unavailable".to_string()));
        }
        Ok(())
    }
}

/// Records `(key, file size)` of each upload
#[derive(Default)]
pub struct MockUploader {
    uploads: Mutex<Vec<(String, u64)>>,
    fail: bool,
}

impl MockUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn uploads(&self) -> Vec<(String, u64)> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl ObjectUploader for MockUploader {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), ProbeError> {
        if self.fail {
            return Err(ProbeError::Persistence("access denied".to_string()));
        }
        let size = tokio::fs::metadata(local_path).await?.len();
        self.uploads.lock().push((key.to_string(), size));
        Ok(())
    }
}

/// Captures alert messages on a channel so tests can wait for detached sends
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<String>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    count: AtomicUsize,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
            count: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for the next alert
    pub async fn next_message(&self, timeout: Duration) -> Option<String> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<(), ProbeError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.send(message.to_string());
        if self.fail {
            return Err(ProbeError::AlertDelivery("webhook returned 500".to_string()));
        }
        Ok(())
    }
}
