//! One probe attempt: balance check, nonce guard, fees, sign, broadcast, record

use std::sync::Arc;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::eth::TransactionRequest;
use rust_decimal::Decimal;
use tracing::Instrument;

use super::errors::ProbeError;
use super::fees::FeeEstimator;
use super::nonce_guard::NonceGuard;
use super::result::{now_ms, ProbeResult};
use super::watchdog::BalanceWatchdog;
use crate::metrics::metrics;
use crate::observability::CorrelationId;
use crate::rpc::ProbeRpc;
use crate::sink::ResultSink;
use crate::wallet::ProbeWallet;

/// EIP-1559 envelope type
const EIP1559_TX_TYPE: u8 = 2;

/// Per-deployment transaction parameters
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub chain_id: u64,
    pub recipient: Address,
    pub amount_wei: U256,
    /// gwei; `None` means derive from the network
    pub max_fee: Option<Decimal>,
    /// gwei; `None` means ask the network
    pub max_priority_fee: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Nonce unchanged since the previous attempt; nothing was recorded
    Skipped { nonce: u64 },
    /// Result to persist, successful or not
    Completed(ProbeResult),
}

pub struct TransactionProber {
    rpc: Arc<dyn ProbeRpc>,
    wallet: ProbeWallet,
    fees: FeeEstimator,
    nonce_guard: NonceGuard,
    watchdog: BalanceWatchdog,
    sink: Arc<dyn ResultSink>,
    settings: ProbeSettings,
}

impl TransactionProber {
    pub fn new(
        rpc: Arc<dyn ProbeRpc>,
        wallet: ProbeWallet,
        watchdog: BalanceWatchdog,
        sink: Arc<dyn ResultSink>,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            fees: FeeEstimator::new(Arc::clone(&rpc)),
            rpc,
            wallet,
            nonce_guard: NonceGuard::new(),
            watchdog,
            sink,
            settings,
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn nonce_guard(&self) -> &NonceGuard {
        &self.nonce_guard
    }

    /// Run one attempt and persist its result.
    ///
    /// Never fails: attempt errors end up in the result, sink errors are
    /// logged.
    pub async fn probe_once(&self) -> AttemptOutcome {
        let correlation_id = CorrelationId::new();
        let span = tracing::info_span!("probe", correlation_id = %correlation_id);

        async move {
            let m = metrics();
            m.probe_attempts.inc();
            m.probe_in_flight.inc();
            let outcome = self.run_attempt().await;
            m.probe_in_flight.dec();

            match &outcome {
                AttemptOutcome::Skipped { nonce } => {
                    m.probe_skipped.inc();
                    tracing::info!(nonce = *nonce, "Nonce unchanged since last attempt, skipping");
                }
                AttemptOutcome::Completed(result) => {
                    if result.is_success() {
                        m.probe_success.inc();
                        m.broadcast_latency.observe(result.latency_ms as f64 / 1000.0);
                        tracing::info!("{}", result.progress_line());
                    } else {
                        let kind = result.error_kind.unwrap_or("unknown");
                        m.probe_failed.with_label_values(&[kind]).inc();
                        tracing::warn!(kind, error = %result.error_message, "failed to execute probe");
                        tracing::warn!("{}", result.progress_line());
                    }

                    if let Err(e) = self.sink.persist(result).await {
                        m.persist_failed.inc();
                        tracing::error!(error = %e, "Failed to persist probe result");
                    }
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    /// Run one attempt without persisting.
    ///
    /// Returns [`AttemptOutcome::Skipped`] only when the nonce guard
    /// suppresses the submission; every other path yields a result.
    pub async fn run_attempt(&self) -> AttemptOutcome {
        let mut result = ProbeResult::new(self.settings.chain_id);
        let address = self.wallet.address();

        if let Err(e) = self.watchdog.check_and_alert(address).await {
            result.record_error(e);
            return AttemptOutcome::Completed(result);
        }

        let nonce = match self.rpc.get_transaction_count(address).await {
            Ok(nonce) => nonce,
            Err(e) => {
                result.record_error(e);
                return AttemptOutcome::Completed(result);
            }
        };

        if !self.nonce_guard.should_proceed(nonce) {
            return AttemptOutcome::Skipped { nonce };
        }
        tracing::debug!(nonce, "Nonce advanced, submitting probe");

        if let Err(e) = self.submit(address, nonce, &mut result).await {
            result.record_error(e);
        }
        AttemptOutcome::Completed(result)
    }

    /// Fee estimation through broadcast. Fields are written into `result` as
    /// soon as they are known so that a later failure keeps them.
    async fn submit(&self, from: Address, nonce: u64, result: &mut ProbeResult) -> Result<(), ProbeError> {
        let fees = self
            .fees
            .estimate_fees(self.settings.max_fee, self.settings.max_priority_fee)
            .await?;
        let (max_fee_per_gas, max_priority_fee_per_gas) = fees.to_wei()?;

        let mut tx = TransactionRequest::default()
            .with_from(from)
            .with_to(self.settings.recipient)
            .with_value(self.settings.amount_wei)
            .with_nonce(nonce)
            .with_chain_id(self.settings.chain_id)
            .with_max_fee_per_gas(max_fee_per_gas)
            .with_max_priority_fee_per_gas(max_priority_fee_per_gas);
        tx.transaction_type = Some(EIP1559_TX_TYPE);

        let gas_limit = self.rpc.estimate_gas(&tx).await?;
        let tx = tx.with_gas_limit(gas_limit);

        let signed = self.wallet.sign(tx).await?;
        result.tx_hash = signed.tx_hash.to_string();

        let start_time = now_ms();
        let broadcast = self.rpc.send_raw_transaction(&signed.raw).await;
        let end_time = now_ms();
        result.record_broadcast_window(start_time, end_time);

        broadcast
    }
}
