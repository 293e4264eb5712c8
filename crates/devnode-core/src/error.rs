//! Error types for harness configuration

use thiserror::Error;

/// Errors raised while building or loading a harness configuration
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Configuration could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl HarnessError {
    /// Get an error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            HarnessError::InvalidConfig(_) => "INVALID_CONFIG",
            HarnessError::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            HarnessError::Parse(_) => "CONFIG_PARSE_ERROR",
            HarnessError::Io(_) => "IO_ERROR",
        }
    }
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, HarnessError>;

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = HarnessError::InvalidConfig("ports".to_string());
        assert_eq!(err.error_code(), "INVALID_CONFIG");
        assert_eq!(err.to_string(), "Invalid configuration: ports");
    }

    #[test]
    fn test_from_json_error() {
        let err: HarnessError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.error_code(), "CONFIG_PARSE_ERROR");
    }
}
