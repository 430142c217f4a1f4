use serde::Serialize;
use thiserror::Error;

/// Bridge-wide error type
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The native engine rejected a request. `reason` is the engine's own diagnostic.
    #[error("{code}: {reason}")]
    NativeOperationFailed { code: &'static str, reason: String },

    #[error("Fatal contract violation: {0}")]
    FatalContractViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    pub fn native(code: &'static str, reason: impl Into<String>) -> Self {
        Self::NativeOperationFailed {
            code,
            reason: reason.into(),
        }
    }

    /// Error code reported to the host alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFoundError",
            Self::InvalidArgument(_) => "InvalidArgumentError",
            Self::NativeOperationFailed { code, .. } => *code,
            Self::FatalContractViolation(_) => "FatalError",
            Self::Config(_) => "ConfigError",
            Self::Serialization(_) => "SerializationError",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Rejected-command payload handed back to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub code: String,
    pub message: String,
}

impl From<&BridgeError> for Rejection {
    fn from(err: &BridgeError) -> Self {
        let rejection = Rejection {
            code: err.code().to_string(),
            message: err.to_string(),
        };

        tracing::error!(
            error_code = %rejection.code,
            error_message = %rejection.message,
            "Command rejected"
        );

        rejection
    }
}

impl From<BridgeError> for Rejection {
    fn from(err: BridgeError) -> Self {
        Rejection::from(&err)
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
