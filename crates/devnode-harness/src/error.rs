//! Harness error types

use devnode_core::HarnessError;
use devnode_rpc::RpcError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Reasons the node never reached `Ready`
#[derive(Error, Debug)]
pub enum StartupError {
    /// The executable does not exist or is not runnable
    #[error("Missing node binary ({path})")]
    BinaryNotFound { path: PathBuf },

    /// The OS refused to start the process for another reason
    #[error("Failed to spawn node: {0}")]
    Spawn(#[source] std::io::Error),

    /// The node was not ready and primed within the startup timeout
    #[error("Node did not become ready within {after:?}")]
    Timeout {
        after: Duration,
        command_line: String,
        logs: String,
    },

    /// The process exited before printing the readiness marker
    #[error("Node exited before becoming ready ({status})")]
    ProcessExited {
        status: String,
        command_line: String,
        logs: String,
    },

    /// The RPC client could not connect after the marker was seen
    #[error("Failed to connect RPC client: {0}")]
    Connect(#[source] RpcError),

    /// The priming request failed
    #[error("Priming call failed: {0}")]
    Priming(#[source] RpcError),

    /// The configuration was rejected before spawning
    #[error(transparent)]
    Config(#[from] HarnessError),
}

impl StartupError {
    /// Multi-line report for stderr: the build hint for a missing binary,
    /// otherwise the command line and the buffered node output
    pub fn diagnostics(&self) -> String {
        match self {
            StartupError::BinaryNotFound { path } => format!(
                "Missing node binary ({}).\nPlease compile the node, or point ACALA_BINARY / ACALA_BUILD at an existing build.",
                path.display()
            ),
            StartupError::Timeout {
                command_line, logs, ..
            }
            | StartupError::ProcessExited {
                command_line, logs, ..
            } => format!(
                "Failed to start node: {}\nCommand: {}\nLogs:\n{}",
                self, command_line, logs
            ),
            other => format!("Failed to start node: {}", other),
        }
    }

    /// Whether startup gave up waiting for the readiness marker
    pub fn is_timeout(&self) -> bool {
        matches!(self, StartupError::Timeout { .. })
    }
}

/// Errors from [`next_block`](crate::block::next_block)
#[derive(Error, Debug)]
pub enum BlockError {
    /// An RPC call failed
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The signer could not produce the extrinsic
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The signer uses a signature scheme the chain does not know
    #[error("Unsupported signature scheme: {0}")]
    UnsupportedSignature(String),

    /// The transaction reached a terminal state without being included
    #[error("Extrinsic not included: {0}")]
    NotIncluded(String),

    /// The status stream ended before inclusion
    #[error("Status subscription closed before inclusion")]
    SubscriptionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_hint() {
        let err = StartupError::BinaryNotFound {
            path: PathBuf::from("../target/debug/acala"),
        };
        let report = err.diagnostics();
        assert!(report.starts_with("Missing node binary (../target/debug/acala)"));
        assert!(report.contains("ACALA_BUILD"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_timeout_report_carries_command_and_logs() {
        let err = StartupError::Timeout {
            after: Duration::from_secs(58),
            command_line: "acala --dev --tmp".into(),
            logs: "line one\nline two\n".into(),
        };
        let report = err.diagnostics();
        assert!(report.contains("Command: acala --dev --tmp"));
        assert!(report.contains("Logs:\nline one\nline two"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_block_error_passthrough() {
        let err = BlockError::from(RpcError::Disconnected);
        assert_eq!(err.to_string(), "Connection closed");
    }
}
