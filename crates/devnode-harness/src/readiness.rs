//! Readiness detection
//!
//! The node is ready once a line containing the marker shows up on either
//! stream. Only the first match counts.

use std::fmt;
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::process::NodeLine;

/// Substring that signals the node's listeners are up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessMarker(String);

impl ReadinessMarker {
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `line` carries the marker
    pub fn matches(&self, line: &str) -> bool {
        line.contains(self.0.as_str())
    }
}

impl Default for ReadinessMarker {
    fn default() -> Self {
        Self::new(devnode_core::config::DEFAULT_READY_MARKER)
    }
}

impl fmt::Display for ReadinessMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the scan ended
#[derive(Debug)]
pub(crate) enum ScanOutcome {
    /// The marker was seen on this line
    Ready(NodeLine),
    /// Output ended and the process exited without the marker
    Exited(String),
}

/// Consume lines until the marker appears or the process goes away
///
/// Never completes on its own while the process keeps running silently;
/// the caller races it against the startup timer.
pub(crate) async fn scan_for_marker(
    lines: &mut mpsc::UnboundedReceiver<NodeLine>,
    marker: &ReadinessMarker,
    child: &mut Child,
) -> ScanOutcome {
    while let Some(line) = lines.recv().await {
        if marker.matches(&line.text) {
            info!("Readiness marker seen on {}", line.stream);
            return ScanOutcome::Ready(line);
        }
    }

    debug!("Node output closed before readiness marker");
    let status = match child.wait().await {
        Ok(status) => status.to_string(),
        Err(e) => format!("unknown status: {}", e),
    };
    ScanOutcome::Exited(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_matches_substring() {
        let marker = ReadinessMarker::default();
        assert!(marker.matches(
            "2024-01-01 00:00:00 🏷  Listening for new connections on 127.0.0.1:19933."
        ));
        assert!(!marker.matches("Listening for new peers"));
        assert_eq!(marker.as_str(), "Listening for new connections on");
    }

    #[test]
    fn test_custom_marker() {
        let marker = ReadinessMarker::new("RPC ready");
        assert!(marker.matches("[node] RPC ready at :9944"));
        assert_eq!(marker.to_string(), "RPC ready");
    }
}
