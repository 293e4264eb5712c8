//! Devnode Core - configuration and shared types for the dev-node harness
//!
//! This crate holds everything the harness needs to know before a node
//! process exists: where the binary lives, which ports and flags it is
//! started with, how long startup may take, and how node output is kept
//! for diagnostics.
//!
//! # Modules
//!
//! - [`config`] - Harness configuration, environment overrides and builder
//! - [`command`] - The fixed node command line
//! - [`logs`] - Rolling buffer of node output lines
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```rust
//! use devnode_core::{HarnessConfigBuilder, NodeCommand};
//! use std::time::Duration;
//!
//! let config = HarnessConfigBuilder::new()
//!     .binary("../target/release/acala")
//!     .startup_timeout(Duration::from_secs(30))
//!     .build();
//!
//! let command = NodeCommand::from_config(&config);
//! assert!(command.command_line().contains("--instant-sealing"));
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod logs;

pub use command::NodeCommand;
pub use config::{HarnessConfig, HarnessConfigBuilder, PortConfig};
pub use error::{HarnessError, Result};
pub use logs::{LogBuffer, OutputStream};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'), "VERSION should be semver format");
    }
}
