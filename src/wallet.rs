//! Wallet management module

use std::str::FromStr;
use std::sync::Arc;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{keccak256, Address, Bytes, B256};
use alloy::rpc::types::eth::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};

use crate::probe::errors::ProbeError;

/// Signed, EIP-2718 encoded transaction ready for broadcast
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub tx_hash: B256,
}

/// Prober identity: signing key and derived address, immutable after startup
#[derive(Clone)]
pub struct ProbeWallet {
    signer: Arc<PrivateKeySigner>,
    wallet: EthereumWallet,
}

impl ProbeWallet {
    /// Create a wallet from a hex private key, with or without `0x` prefix
    pub fn from_private_key(key: &str) -> Result<Self> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        if key.is_empty() {
            anyhow::bail!("Signer private key is empty");
        }
        if key.chars().all(|c| c == '0') {
            anyhow::bail!("Invalid private key: all-zero key rejected");
        }
        let signer = PrivateKeySigner::from_str(key).context("Invalid signer private key")?;
        Ok(Self::from_signer(signer))
    }

    pub fn from_signer(signer: PrivateKeySigner) -> Self {
        let wallet = EthereumWallet::from(signer.clone());
        Self {
            signer: Arc::new(signer),
            wallet,
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a fully populated type-2 request.
    ///
    /// The hash is keccak256 over the encoded signed payload, so it is known
    /// before broadcast is attempted.
    pub async fn sign(&self, mut tx: TransactionRequest) -> Result<SignedTransaction, ProbeError> {
        tx.from = Some(self.address());
        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|e| ProbeError::Signing(e.to_string()))?;
        let raw = Bytes::from(envelope.encoded_2718());
        let tx_hash = keccak256(&raw);
        Ok(SignedTransaction { raw, tx_hash })
    }
}

impl std::fmt::Debug for ProbeWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeWallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
