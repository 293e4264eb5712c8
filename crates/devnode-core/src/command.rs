//! The node command line
//!
//! The dev node always runs with the same flag set: development chain,
//! instant sealing, ephemeral storage, no telemetry or metrics, fixed port
//! bindings and unrestricted RPC.

use std::fmt;
use std::path::PathBuf;

use crate::config::HarnessConfig;

/// Program and arguments used to spawn the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCommand {
    /// Executable path
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<String>,
}

impl NodeCommand {
    /// Build the fixed command line for a configuration
    pub fn from_config(config: &HarnessConfig) -> Self {
        let ports = config.ports;
        let args = vec![
            "--dev".to_string(),
            format!("-l{}", config.log_level),
            "-lruntime=debug".to_string(),
            "-levm=debug".to_string(),
            "--instant-sealing".to_string(),
            // native execution is considerably faster for test chains
            "--execution=native".to_string(),
            "--no-telemetry".to_string(),
            "--no-prometheus".to_string(),
            format!("--port={}", ports.p2p),
            format!("--rpc-port={}", ports.rpc),
            "--rpc-external".to_string(),
            format!("--ws-port={}", ports.ws),
            "--ws-external".to_string(),
            "--rpc-cors=all".to_string(),
            "--rpc-methods=unsafe".to_string(),
            "--tmp".to_string(),
        ];

        Self {
            program: config.binary.clone(),
            args,
        }
    }

    /// The full command line as printed in diagnostics
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for NodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}
