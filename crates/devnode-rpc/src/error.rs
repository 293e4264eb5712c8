//! RPC client error types

use thiserror::Error;

/// Errors returned by the RPC client
#[derive(Error, Debug, Clone)]
pub enum RpcError {
    /// WebSocket connection could not be established
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The node answered with a JSON-RPC error object
    #[error("{code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// No response within the request timeout
    #[error("Request {method} timed out after {duration_ms}ms")]
    Timeout { method: String, duration_ms: u64 },

    /// The connection is closed
    #[error("Connection closed")]
    Disconnected,

    /// Result could not be decoded into the expected type
    #[error("Failed to decode result: {0}")]
    Decode(String),

    /// The node sent something that is not valid JSON-RPC
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// WebSocket transport failure
    #[error("Transport error: {0}")]
    Transport(String),
}

impl RpcError {
    /// JSON-RPC error code, if the node returned one
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            RpcError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the error came from the connection rather than the node
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            RpcError::Connect { .. } | RpcError::Disconnected | RpcError::Transport(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RpcError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        RpcError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Decode(err.to_string())
    }
}

impl From<hex::FromHexError> for RpcError {
    fn from(err: hex::FromHexError) -> Self {
        RpcError::Decode(err.to_string())
    }
}

/// Result type for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_display_matches_node_format() {
        let err = RpcError::Rpc {
            code: -32603,
            message: "execution fatal".to_string(),
            data: None,
        };
        assert_eq!(err.to_string(), "-32603: execution fatal");
        assert_eq!(err.rpc_code(), Some(-32603));
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_connection_errors() {
        assert!(RpcError::Disconnected.is_connection_error());
        assert_eq!(RpcError::Disconnected.rpc_code(), None);
    }
}
