//! EIP-1559 fee estimation
//!
//! Fees are resolved as gwei decimals and converted to wei only when the
//! transaction is built.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::errors::ProbeError;
use crate::rpc::ProbeRpc;
use crate::units::{from_wei, to_wei, GWEI_DECIMALS};

/// Resolved fee pair in gwei
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee: Decimal,
    pub max_priority_fee: Decimal,
}

impl FeeEstimate {
    pub fn max_fee_gwei(&self) -> String {
        self.max_fee.normalize().to_string()
    }

    pub fn max_priority_fee_gwei(&self) -> String {
        self.max_priority_fee.normalize().to_string()
    }

    /// `(max_fee_per_gas, max_priority_fee_per_gas)` in wei
    pub fn to_wei(&self) -> Result<(u128, u128), ProbeError> {
        Ok((
            to_wei(self.max_fee, GWEI_DECIMALS)?,
            to_wei(self.max_priority_fee, GWEI_DECIMALS)?,
        ))
    }
}

pub struct FeeEstimator {
    rpc: Arc<dyn ProbeRpc>,
}

impl FeeEstimator {
    pub fn new(rpc: Arc<dyn ProbeRpc>) -> Self {
        Self { rpc }
    }

    /// Resolve max fee and priority fee, fetching whatever was not overridden.
    ///
    /// Missing priority fee comes from `eth_maxPriorityFeePerGas`; missing max
    /// fee is `base_fee + max_priority_fee`. Fails with
    /// [`ProbeError::FeeConfiguration`] if the resolved max fee is below the
    /// priority fee.
    pub async fn estimate_fees(
        &self,
        max_fee: Option<Decimal>,
        max_priority_fee: Option<Decimal>,
    ) -> Result<FeeEstimate, ProbeError> {
        let max_priority_fee = match max_priority_fee {
            Some(fee) => fee,
            None => from_wei(self.rpc.get_max_priority_fee().await?, GWEI_DECIMALS)?,
        };

        let max_fee = match max_fee {
            Some(fee) => fee,
            None => {
                let base_fee = from_wei(self.rpc.get_base_fee().await?, GWEI_DECIMALS)?;
                base_fee + max_priority_fee
            }
        };

        if max_fee < max_priority_fee {
            return Err(ProbeError::FeeConfiguration {
                max_fee: max_fee.normalize().to_string(),
                max_priority_fee: max_priority_fee.normalize().to_string(),
            });
        }

        tracing::debug!(
            max_fee_gwei = %max_fee.normalize(),
            max_priority_fee_gwei = %max_priority_fee.normalize(),
            "Fees estimated"
        );

        Ok(FeeEstimate {
            max_fee,
            max_priority_fee,
        })
    }
}
