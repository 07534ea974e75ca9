//! Low balance alerting

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;

use super::errors::ProbeError;
use crate::alert::AlertNotifier;
use crate::metrics::metrics;
use crate::rpc::ProbeRpc;
use crate::units::{from_wei, NATIVE_DECIMALS};

/// Alert settings resolved from configuration
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Alert when balance drops below this many native units
    pub threshold: Decimal,
    /// Native coin ticker used in alert text
    pub symbol: String,
    /// Block explorer base URL for address links
    pub explorer_url: String,
}

pub struct BalanceWatchdog {
    rpc: Arc<dyn ProbeRpc>,
    notifier: Arc<dyn AlertNotifier>,
    config: WatchdogConfig,
}

impl BalanceWatchdog {
    pub fn new(rpc: Arc<dyn ProbeRpc>, notifier: Arc<dyn AlertNotifier>, config: WatchdogConfig) -> Self {
        Self {
            rpc,
            notifier,
            config,
        }
    }

    /// Fetch the balance of `address` and alert if it is below the threshold.
    ///
    /// Only the balance query can fail this call. Alert delivery runs on a
    /// detached task and its failure is logged there. Alerts repeat on every
    /// call while the balance stays low.
    pub async fn check_and_alert(&self, address: Address) -> Result<Decimal, ProbeError> {
        let balance_wei: U256 = self.rpc.get_balance(address).await?;
        let balance = from_wei(balance_wei, NATIVE_DECIMALS)?;

        if balance < self.config.threshold {
            let message = self.alert_message(address, balance);
            tracing::warn!(%address, %balance, threshold = %self.config.threshold, "Balance below alert threshold");
            metrics().balance_alerts.inc();

            let notifier = Arc::clone(&self.notifier);
            tokio::spawn(async move {
                if let Err(e) = notifier.send(&message).await {
                    tracing::error!(error = %e, "Failed to deliver balance alert");
                }
            });
        } else {
            tracing::debug!(%address, %balance, "Balance above alert threshold");
        }

        Ok(balance)
    }

    fn alert_message(&self, address: Address, balance: Decimal) -> String {
        format!(
            "Current balance of <{}/address/{}|{}> is less than {} {}! balance={} {}",
            self.config.explorer_url.trim_end_matches('/'),
            address,
            address,
            self.config.threshold.normalize(),
            self.config.symbol,
            balance,
            self.config.symbol
        )
    }
}
