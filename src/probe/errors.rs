use thiserror::Error;

/// Error taxonomy for a single probe attempt and its side channels.
///
/// Every variant is captured into the attempt's result record or logged;
/// none of them is allowed to escape the attempt and stop the scheduler.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProbeError {
    /// Resolved max fee is below the priority fee
    #[error("Invalid fee configuration: max fee per gas {max_fee} gwei is less than max priority fee per gas {max_priority_fee} gwei")]
    FeeConfiguration {
        max_fee: String,
        max_priority_fee: String,
    },

    /// Any read-side RPC call (balance, nonce, fee data, gas estimate)
    #[error("Network query failed ({operation}): {message}")]
    NetworkQuery {
        operation: &'static str,
        message: String,
    },

    /// Transaction could not be signed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Signed transaction rejected or the broadcast call failed
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    /// Artifact write or upload failed
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Alert webhook delivery failed
    #[error("Alert delivery failed: {0}")]
    AlertDelivery(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ProbeError {
    pub fn network(operation: &'static str, err: impl std::fmt::Display) -> Self {
        ProbeError::NetworkQuery {
            operation,
            message: err.to_string(),
        }
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::FeeConfiguration { .. } => "fee_configuration",
            ProbeError::NetworkQuery { .. } => "network_query",
            ProbeError::Signing(_) => "signing",
            ProbeError::Broadcast(_) => "broadcast",
            ProbeError::Persistence(_) => "persistence",
            ProbeError::AlertDelivery(_) => "alert_delivery",
            ProbeError::Configuration(_) => "configuration",
        }
    }
}

impl From<parquet::errors::ParquetError> for ProbeError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        ProbeError::Persistence(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for ProbeError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ProbeError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        ProbeError::Persistence(err.to_string())
    }
}
