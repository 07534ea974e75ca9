//! Probe result record

use super::errors::ProbeError;

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Outcome of one probe attempt that got past the nonce guard (or failed
/// before reaching it).
///
/// Fields that were never reached keep their zero values; fields already
/// filled in when a later step fails are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Attempt start, ms since epoch
    pub executed_at: i64,

    /// keccak256 of the signed payload, `0x`-prefixed; empty if never signed
    pub tx_hash: String,

    /// Immediately before broadcast
    pub start_time: i64,

    /// Immediately after broadcast returned
    pub end_time: i64,

    pub chain_id: u64,

    pub latency_ms: i64,

    /// Empty on success
    pub error_message: String,

    /// [`ProbeError::kind`] of the failure, `None` on success
    pub error_kind: Option<&'static str>,
}

impl ProbeResult {
    pub fn new(chain_id: u64) -> Self {
        Self::started_at(now_ms(), chain_id)
    }

    pub fn started_at(executed_at: i64, chain_id: u64) -> Self {
        Self {
            executed_at,
            tx_hash: String::new(),
            start_time: 0,
            end_time: 0,
            chain_id,
            latency_ms: 0,
            error_message: String::new(),
            error_kind: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }

    pub fn record_error(&mut self, err: ProbeError) {
        self.error_kind = Some(err.kind());
        self.error_message = err.to_string();
    }

    pub(crate) fn record_broadcast_window(&mut self, start_time: i64, end_time: i64) {
        self.start_time = start_time;
        self.end_time = end_time;
        self.latency_ms = end_time - start_time;
    }

    /// Comma separated progress line written to the log stream
    pub fn progress_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.executed_at,
            self.chain_id,
            self.tx_hash,
            self.start_time,
            self.end_time,
            self.latency_ms,
            self.error_message
        )
    }
}
