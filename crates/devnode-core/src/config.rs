//! Harness configuration
//!
//! Everything the harness reads from the environment is resolved here, once,
//! into a [`HarnessConfig`]. The harness itself never looks at process-wide
//! state; callers construct a config and pass it in.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, Result};

/// Default P2P port of the dev node
pub const DEFAULT_P2P_PORT: u16 = 19931;

/// Default HTTP RPC port of the dev node
pub const DEFAULT_RPC_PORT: u16 = 19932;

/// Default WebSocket RPC port of the dev node
pub const DEFAULT_WS_PORT: u16 = 19933;

/// Total time a test group allows for node startup
pub const SPAWNING_TIME: Duration = Duration::from_secs(60);

/// Readiness budget: the spawning time minus a margin for teardown of the hook
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(SPAWNING_TIME.as_secs() - 2);

/// Default timeout for a single RPC request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Log line printed once the node's network listeners are up
pub const DEFAULT_READY_MARKER: &str = "Listening for new connections on";

/// Lightweight metadata call issued once after connecting
pub const DEFAULT_PRIMING_METHOD: &str = "system_chain";

/// Default number of output lines kept for the failure dump
pub const DEFAULT_LOG_BUFFER_LINES: usize = 10_000;

/// Default cargo build profile the binary is taken from
pub const DEFAULT_BUILD_PROFILE: &str = "debug";

/// Default node log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// File name of the node executable
pub const BINARY_NAME: &str = "acala";

/// Explicit path to the node executable
pub const ENV_BINARY: &str = "ACALA_BINARY";

/// Build profile used to locate the executable under `../target`
pub const ENV_BUILD: &str = "ACALA_BUILD";

/// Node log level; also turns on output echo when set
pub const ENV_LOG: &str = "ACALA_LOG";

/// Boolean toggle for echoing node output
pub const ENV_DISPLAY_LOG: &str = "ACALA_DISPLAY_LOG";

/// Port bindings passed to the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// libp2p listen port
    pub p2p: u16,
    /// HTTP RPC port
    pub rpc: u16,
    /// WebSocket RPC port
    pub ws: u16,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            p2p: DEFAULT_P2P_PORT,
            rpc: DEFAULT_RPC_PORT,
            ws: DEFAULT_WS_PORT,
        }
    }
}

/// Configuration for one harness instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Path to the node executable
    pub binary: PathBuf,
    /// Port bindings
    #[serde(default)]
    pub ports: PortConfig,
    /// Node log level (`-l<level>`)
    pub log_level: String,
    /// Echo node output while it is being observed
    pub display_log: bool,
    /// Time allowed between spawn and readiness
    #[serde(with = "humantime_serde")]
    pub startup_timeout: Duration,
    /// Timeout for individual RPC requests
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Substring that marks the node as ready
    pub ready_marker: String,
    /// Method called once after connecting
    pub priming_method: String,
    /// Output lines kept for diagnostics
    pub log_buffer_lines: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            binary: binary_path_for_profile(DEFAULT_BUILD_PROFILE),
            ports: PortConfig::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            display_log: false,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            ready_marker: DEFAULT_READY_MARKER.to_string(),
            priming_method: DEFAULT_PRIMING_METHOD.to_string(),
            log_buffer_lines: DEFAULT_LOG_BUFFER_LINES,
        }
    }
}

impl HarnessConfig {
    /// Build a configuration from the current process environment
    pub fn from_env() -> Self {
        Self::from_env_vars(std::env::vars())
    }

    /// Build a configuration from an explicit set of environment variables
    pub fn from_env_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let non_empty = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        let mut config = Self::default();

        let profile = non_empty(ENV_BUILD).unwrap_or_else(|| DEFAULT_BUILD_PROFILE.to_string());
        config.binary = match non_empty(ENV_BINARY) {
            Some(path) => PathBuf::from(path),
            None => binary_path_for_profile(&profile),
        };

        if let Some(level) = non_empty(ENV_LOG) {
            config.log_level = level;
            config.display_log = true;
        }

        if let Some(flag) = vars.get(ENV_DISPLAY_LOG) {
            config.display_log = parse_bool(flag);
        }

        config
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HarnessError::ConfigNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// WebSocket endpoint of the node
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.ports.ws)
    }

    /// Check the configuration for values the node or harness cannot work with
    pub fn validate(&self) -> Result<()> {
        let PortConfig { p2p, rpc, ws } = self.ports;
        if p2p == 0 || rpc == 0 || ws == 0 {
            return Err(HarnessError::InvalidConfig(
                "ports must be fixed (non-zero)".into(),
            ));
        }
        if p2p == rpc || p2p == ws || rpc == ws {
            return Err(HarnessError::InvalidConfig(format!(
                "ports must be distinct (p2p={}, rpc={}, ws={})",
                p2p, rpc, ws
            )));
        }
        if self.startup_timeout.is_zero() {
            return Err(HarnessError::InvalidConfig(
                "startup_timeout must be non-zero".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(HarnessError::InvalidConfig(
                "request_timeout must be non-zero".into(),
            ));
        }
        if self.ready_marker.trim().is_empty() {
            return Err(HarnessError::InvalidConfig("ready_marker is empty".into()));
        }
        if self.priming_method.trim().is_empty() {
            return Err(HarnessError::InvalidConfig("priming_method is empty".into()));
        }
        if self.log_level.trim().is_empty() {
            return Err(HarnessError::InvalidConfig("log_level is empty".into()));
        }
        if self.log_buffer_lines == 0 {
            return Err(HarnessError::InvalidConfig(
                "log_buffer_lines must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Path of the node binary for a cargo build profile
pub fn binary_path_for_profile(profile: &str) -> PathBuf {
    PathBuf::from("..")
        .join("target")
        .join(profile)
        .join(BINARY_NAME)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Builder for HarnessConfig
#[derive(Debug, Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Set the node executable
    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.binary = path.into();
        self
    }

    /// Set all port bindings
    pub fn ports(mut self, p2p: u16, rpc: u16, ws: u16) -> Self {
        self.config.ports = PortConfig { p2p, rpc, ws };
        self
    }

    /// Set the WebSocket port only
    pub fn ws_port(mut self, port: u16) -> Self {
        self.config.ports.ws = port;
        self
    }

    /// Set the node log level
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Enable or disable output echo
    pub fn display_log(mut self, enabled: bool) -> Self {
        self.config.display_log = enabled;
        self
    }

    /// Set the startup timeout
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.config.startup_timeout = timeout;
        self
    }

    /// Set the per-request RPC timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the readiness marker
    pub fn ready_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.ready_marker = marker.into();
        self
    }

    /// Set the priming method
    pub fn priming_method(mut self, method: impl Into<String>) -> Self {
        self.config.priming_method = method.into();
        self
    }

    /// Set how many output lines are kept
    pub fn log_buffer_lines(mut self, lines: usize) -> Self {
        self.config.log_buffer_lines = lines;
        self
    }

    /// Build the configuration
    pub fn build(self) -> HarnessConfig {
        self.config
    }
}

// Helper module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        s.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.ports.ws, DEFAULT_WS_PORT);
        assert_eq!(config.binary, PathBuf::from("../target/debug/acala"));
        assert_eq!(config.startup_timeout, SPAWNING_TIME - Duration::from_secs(2));
        assert!(!config.display_log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_build_profile() {
        let config = HarnessConfig::from_env_vars([(ENV_BUILD, "release")]);
        assert_eq!(config.binary, PathBuf::from("../target/release/acala"));
        assert!(!config.display_log);
    }

    #[test]
    fn test_env_binary_override_wins() {
        let config = HarnessConfig::from_env_vars([
            (ENV_BUILD, "release"),
            (ENV_BINARY, "/opt/acala/bin/acala"),
        ]);
        assert_eq!(config.binary, PathBuf::from("/opt/acala/bin/acala"));
    }

    #[test]
    fn test_env_log_enables_echo() {
        let config = HarnessConfig::from_env_vars([(ENV_LOG, "debug")]);
        assert_eq!(config.log_level, "debug");
        assert!(config.display_log);
    }

    #[test]
    fn test_env_display_log_toggle() {
        let config = HarnessConfig::from_env_vars([(ENV_LOG, "trace"), (ENV_DISPLAY_LOG, "off")]);
        assert_eq!(config.log_level, "trace");
        assert!(!config.display_log);

        let config = HarnessConfig::from_env_vars([(ENV_DISPLAY_LOG, "YES")]);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.display_log);
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let config = HarnessConfig::from_env_vars([(ENV_BINARY, ""), (ENV_LOG, "")]);
        assert_eq!(config.binary, PathBuf::from("../target/debug/acala"));
        assert!(!config.display_log);
    }

    #[test]
    fn test_ws_url() {
        let config = HarnessConfigBuilder::new().ws_port(40000).build();
        assert_eq!(config.ws_url(), "ws://127.0.0.1:40000");
    }

    #[test]
    fn test_validate_rejects_duplicate_ports() {
        let config = HarnessConfigBuilder::new().ports(1000, 1000, 1001).build();
        assert!(matches!(
            config.validate(),
            Err(HarnessError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = HarnessConfigBuilder::new()
            .startup_timeout(Duration::ZERO)
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_marker() {
        let config = HarnessConfigBuilder::new().ready_marker("  ").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = HarnessConfigBuilder::new()
            .startup_timeout(Duration::from_millis(1500))
            .build();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"1s 500ms\""));

        let recovered: HarnessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered.startup_timeout, Duration::from_millis(1500));
        assert_eq!(recovered.ports, config.ports);
    }

    #[test]
    fn test_from_file_missing() {
        let err = HarnessConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_NOT_FOUND");
    }
}
