//! Probe cycle
//!
//! - **fees**: EIP-1559 fee estimation with optional overrides
//! - **nonce_guard**: duplicate-submission guard across ticks
//! - **watchdog**: balance threshold alerts
//! - **prober**: one attempt, from balance check to persisted result
//! - **scheduler**: fixed-interval, non-blocking tick loop

pub mod errors;
pub mod fees;
pub mod nonce_guard;
pub mod prober;
pub mod result;
pub mod scheduler;
pub mod watchdog;

pub use errors::ProbeError;
pub use fees::{FeeEstimate, FeeEstimator};
pub use nonce_guard::NonceGuard;
pub use prober::{AttemptOutcome, ProbeSettings, TransactionProber};
pub use result::ProbeResult;
pub use scheduler::ProbeScheduler;
pub use watchdog::{BalanceWatchdog, WatchdogConfig};
