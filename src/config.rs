//! Configuration module for the latency prober
//!
//! Values come from an optional TOML file layered under environment
//! variables (`PROBER_<SECTION>__<KEY>`, e.g. `PROBER_RPC__URL`). A `.env`
//! file in the working directory is loaded first.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::probe::errors::ProbeError;
use crate::probe::watchdog::WatchdogConfig;
use crate::units::{to_wei, NATIVE_DECIMALS};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PROBER";

/// Shortest accepted probe interval
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc: RpcConfig,
    pub wallet: WalletConfig,
    pub probe: ProbeConfig,
    pub alert: AlertConfig,
    pub storage: StorageConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    pub url: String,

    /// Network chain id (43113 = Avalanche Fuji C-Chain)
    pub chain_id: u64,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Hex private key of the prober account
    pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Milliseconds between probe attempts
    pub interval_ms: u64,

    /// Amount sent per probe, in native units
    pub amount: Decimal,

    /// Recipient address; the prober's own address when unset
    pub recipient: Option<String>,

    /// Fixed max fee per gas in gwei; base fee + priority fee when unset
    pub max_fee_gwei: Option<Decimal>,

    /// Fixed priority fee per gas in gwei; network suggestion when unset
    pub max_priority_fee_gwei: Option<Decimal>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alert when balance is below this many native units
    pub balance_threshold: Decimal,

    /// Native coin ticker used in alert text
    pub native_symbol: String,

    /// Block explorer base URL, used for address links in alerts
    pub explorer_url: String,

    /// Chat webhook endpoint; alerts are only logged when unset
    pub webhook_url: Option<String>,

    pub channel: String,

    /// Bearer token for the webhook
    pub auth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,

    /// AWS region override; the SDK default chain is used when unset
    pub region: Option<String>,

    /// Object key prefix inside the bucket
    pub key_prefix: String,

    /// Directory for artifacts before upload
    pub artifact_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    pub enable_metrics: bool,

    /// Metrics port
    pub metrics_port: u16,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.avax-test.network/ext/bc/C/rpc".to_string() }
fn default_chain_id() -> u64 { 43113 }
fn default_interval_ms() -> u64 { 60_000 }
fn default_balance_threshold() -> Decimal { Decimal::new(1, 1) }
fn default_native_symbol() -> String { "AVAX".to_string() }
fn default_explorer_url() -> String { "https://testnet.snowtrace.io".to_string() }
fn default_artifact_dir() -> String { ".".to_string() }
fn default_metrics_port() -> u16 { 9090 }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            chain_id: default_chain_id(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            amount: Decimal::ZERO,
            recipient: None,
            max_fee_gwei: None,
            max_priority_fee_gwei: None,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            balance_threshold: default_balance_threshold(),
            native_symbol: default_native_symbol(),
            explorer_url: default_explorer_url(),
            webhook_url: None,
            channel: String::new(),
            auth_token: String::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: None,
            key_prefix: String::new(),
            artifact_dir: default_artifact_dir(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: default_metrics_port(),
        }
    }
}

impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for AlertConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertConfig")
            .field("balance_threshold", &self.balance_threshold)
            .field("native_symbol", &self.native_symbol)
            .field("explorer_url", &self.explorer_url)
            .field("webhook_url", &self.webhook_url)
            .field("channel", &self.channel)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

fn invalid(message: impl Into<String>) -> ProbeError {
    ProbeError::Configuration(message.into())
}

impl Config {
    /// Load from `path` (optional) and the environment, then validate
    pub fn load(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every probe fail or the loop misbehave
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.rpc.url.trim().is_empty() {
            return Err(invalid("rpc.url must not be empty"));
        }
        if self.rpc.chain_id == 0 {
            return Err(invalid("rpc.chain_id must be non-zero"));
        }
        if self.wallet.private_key.trim().is_empty() {
            return Err(invalid("wallet.private_key must be set"));
        }
        self.probe_interval()?;
        self.amount_wei()?;
        self.recipient_override()?;

        for (name, fee) in [
            ("probe.max_fee_gwei", self.probe.max_fee_gwei),
            ("probe.max_priority_fee_gwei", self.probe.max_priority_fee_gwei),
        ] {
            if matches!(fee, Some(f) if f.is_sign_negative()) {
                return Err(invalid(format!("{} must not be negative", name)));
            }
        }
        if let (Some(max), Some(tip)) = (self.probe.max_fee_gwei, self.probe.max_priority_fee_gwei) {
            if max < tip {
                return Err(invalid(format!(
                    "probe.max_fee_gwei ({}) is less than probe.max_priority_fee_gwei ({})",
                    max, tip
                )));
            }
        }

        if self.alert.balance_threshold.is_sign_negative() {
            return Err(invalid("alert.balance_threshold must not be negative"));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(invalid("storage.bucket must be set"));
        }
        Ok(())
    }

    pub fn probe_interval(&self) -> Result<Duration, ProbeError> {
        let interval = Duration::from_millis(self.probe.interval_ms);
        if interval < MIN_PROBE_INTERVAL {
            return Err(invalid(format!(
                "probe.interval_ms must be at least {} (got {})",
                MIN_PROBE_INTERVAL.as_millis(),
                self.probe.interval_ms
            )));
        }
        Ok(interval)
    }

    pub fn amount_wei(&self) -> Result<U256, ProbeError> {
        to_wei(self.probe.amount, NATIVE_DECIMALS).map(U256::from)
    }

    /// Explicit recipient, if configured
    pub fn recipient_override(&self) -> Result<Option<Address>, ProbeError> {
        match self.probe.recipient.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Address::from_str(raw)
                .map(Some)
                .map_err(|e| invalid(format!("probe.recipient {} is not an address: {}", raw, e))),
        }
    }

    pub fn watchdog_config(&self) -> WatchdogConfig {
        WatchdogConfig {
            threshold: self.alert.balance_threshold,
            symbol: self.alert.native_symbol.clone(),
            explorer_url: self.alert.explorer_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.wallet.private_key =
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string();
        config.storage.bucket = "latency-probe".to_string();
        config
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.rpc.chain_id, 43113);
        assert_eq!(config.probe.interval_ms, 60_000);
        assert_eq!(config.probe.amount, Decimal::ZERO);
        assert_eq!(config.alert.balance_threshold.to_string(), "0.1");
        assert!(config.probe.recipient.is_none());
    }

    #[test]
    fn test_valid_config_passes() {
        let config = valid_config();
        config.validate().unwrap();
        assert_eq!(config.probe_interval().unwrap(), Duration::from_secs(60));
        assert_eq!(config.amount_wei().unwrap(), U256::ZERO);
    }

    #[test]
    fn test_rejects_zero_and_sub_second_interval() {
        let mut config = valid_config();
        config.probe.interval_ms = 0;
        assert!(config.validate().is_err());

        config.probe.interval_ms = 500;
        assert!(config.validate().is_err());

        config.probe.interval_ms = 1_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_missing_key_and_bucket() {
        let mut config = valid_config();
        config.wallet.private_key.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.storage.bucket.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recipient_parsing() {
        let mut config = valid_config();
        assert_eq!(config.recipient_override().unwrap(), None);

        config.probe.recipient = Some("0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string());
        assert!(config.recipient_override().unwrap().is_some());

        config.probe.recipient = Some("not-an-address".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_fee_overrides() {
        let mut config = valid_config();
        config.probe.max_fee_gwei = Some(Decimal::from(1));
        config.probe.max_priority_fee_gwei = Some(Decimal::from(2));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_amount() {
        let mut config = valid_config();
        config.probe.amount = Decimal::from(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = valid_config();
        config.alert.auth_token = "xoxb-secret".to_string();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"));
        assert!(!debug.contains("xoxb-secret"));
    }
}
