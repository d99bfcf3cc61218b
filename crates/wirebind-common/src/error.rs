//! Unified error types for the wirebind workspace.
//!
//! The resolution engine defines its own domain error enum that wraps
//! these common variants when appropriate.

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum WirebindError {
    /// A configuration value is invalid.
    #[error("invalid option {key}: {message}")]
    Config {
        /// Option key that failed to parse.
        key: String,
        /// Description of the invalid value.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, WirebindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_key() {
        let err = WirebindError::Config {
            key: "wirebind.dumpGraph".into(),
            message: "expected true or false".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("wirebind.dumpGraph"), "got: {msg}");
    }

    #[test]
    fn serde_errors_convert() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: WirebindError = source.into();
        assert!(err.to_string().starts_with("serialization error"));
    }
}
