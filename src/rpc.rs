//! RPC access used by the probe cycle

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::eth::TransactionRequest;
use alloy::transports::http::Http;
use async_trait::async_trait;
use reqwest::Client;

use crate::probe::errors::ProbeError;

/// Network calls made by one probe attempt. All amounts are in wei.
#[async_trait]
pub trait ProbeRpc: Send + Sync {
    async fn get_balance(&self, address: Address) -> Result<U256, ProbeError>;

    async fn get_transaction_count(&self, address: Address) -> Result<u64, ProbeError>;

    async fn get_base_fee(&self) -> Result<U256, ProbeError>;

    async fn get_max_priority_fee(&self) -> Result<U256, ProbeError>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, ProbeError>;

    /// Submit an EIP-2718 encoded signed transaction
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<(), ProbeError>;
}

/// JSON-RPC over HTTP backed by an alloy provider
pub struct AlloyRpc {
    provider: RootProvider<Http<Client>>,
    endpoint: String,
}

impl AlloyRpc {
    pub fn new(endpoint: &str) -> Result<Self, ProbeError> {
        let url: reqwest::Url = endpoint
            .parse()
            .map_err(|e| ProbeError::Configuration(format!("invalid RPC URL {}: {}", endpoint, e)))?;
        Ok(Self {
            provider: ProviderBuilder::new().on_http(url),
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ProbeRpc for AlloyRpc {
    async fn get_balance(&self, address: Address) -> Result<U256, ProbeError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| ProbeError::network("get_balance", e))
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, ProbeError> {
        self.provider
            .get_transaction_count(address)
            .await
            .map_err(|e| ProbeError::network("get_transaction_count", e))
    }

    async fn get_base_fee(&self) -> Result<U256, ProbeError> {
        // Avalanche C-Chain style endpoint; returns the current base fee in wei
        self.provider
            .raw_request::<_, U256>("eth_baseFee".into(), ())
            .await
            .map_err(|e| ProbeError::network("get_base_fee", e))
    }

    async fn get_max_priority_fee(&self) -> Result<U256, ProbeError> {
        self.provider
            .get_max_priority_fee_per_gas()
            .await
            .map(U256::from)
            .map_err(|e| ProbeError::network("get_max_priority_fee", e))
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, ProbeError> {
        self.provider
            .estimate_gas(tx)
            .await
            .map_err(|e| ProbeError::network("estimate_gas", e))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<(), ProbeError> {
        self.provider
            .send_raw_transaction(raw)
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::Broadcast(e.to_string()))
    }
}
