//! Client events
//!
//! Events broadcast by the connection service for anyone who wants to know
//! when the socket comes and goes.

/// Events emitted by the connection service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// WebSocket handshake completed
    Connected {
        /// Endpoint URL
        url: String,
    },

    /// Connection closed
    Disconnected {
        /// Why the connection ended, if it was not requested
        reason: Option<String>,
    },
}

impl ClientEvent {
    /// Check whether this event ends the connection
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ClientEvent::Disconnected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_disconnect() {
        assert!(ClientEvent::Disconnected { reason: None }.is_disconnect());
        assert!(!ClientEvent::Connected {
            url: "ws://127.0.0.1:9944".into()
        }
        .is_disconnect());
    }
}
