//! Error types for Strata.

use thiserror::Error;

/// Result type alias using StrataError.
pub type Result<T> = std::result::Result<T, StrataError>;

/// Errors that can occur in Strata operations.
///
/// Lookups never fail: a missing key is reported through `Option`, `bool`
/// or an end cursor. Errors only come from configuration and from explicit
/// structural verification.
#[derive(Debug, Error)]
pub enum StrataError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },

    // Structural errors
    #[error("Index corrupted: {0}")]
    IndexCorrupted(String),
}

impl StrataError {
    /// Builds an `InvalidParameter` from any displayable value.
    pub fn invalid_parameter(name: &str, value: impl std::fmt::Display) -> Self {
        StrataError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Builds an `IndexCorrupted` error.
    pub fn corrupted(reason: impl Into<String>) -> Self {
        StrataError::IndexCorrupted(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_display() {
        let err = StrataError::ConfigError("leaf order below inner order".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: leaf order below inner order"
        );

        let err = StrataError::InvalidParameter {
            name: "compaction.ratio".to_string(),
            value: "0".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid parameter: compaction.ratio = 0");
    }

    #[test]
    fn test_invalid_parameter_helper() {
        let err = StrataError::invalid_parameter("leaf_order", 2);
        assert!(matches!(
            err,
            StrataError::InvalidParameter { ref name, ref value }
                if name == "leaf_order" && value == "2"
        ));
    }

    #[test]
    fn test_corrupted_display() {
        let err = StrataError::corrupted("leaf 3 out of order");
        assert_eq!(err.to_string(), "Index corrupted: leaf 3 out of order");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(StrataError::corrupted("test"))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StrataError>();
    }
}
