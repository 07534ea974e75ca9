//! Transaction latency prober
//!
//! Periodically submits a minimal EIP-1559 transaction, measures how long the
//! broadcast call takes, and records every attempt as a Parquet artifact in
//! object storage. Also alerts when the prober account runs low on funds.

pub mod alert;
pub mod config;
pub mod endpoints;
pub mod metrics;
pub mod observability;
pub mod probe;
pub mod rpc;
pub mod sink;
pub mod units;
pub mod wallet;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use alloy::primitives::Address;
pub use probe::{AttemptOutcome, ProbeError, ProbeResult, ProbeScheduler, TransactionProber};
