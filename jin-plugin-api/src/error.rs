//! Error types for plugin authors

use thiserror::Error;

/// Errors that plugin code returns from hooks, factories and disposables
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A capability the plugin needs is missing from its context
    #[error("Missing capability: {0}")]
    MissingCapability(String),

    /// A capability exists but holds a different type than expected
    #[error("Capability '{name}' is not a {expected}")]
    CapabilityType { name: String, expected: &'static str },

    /// Releasing a resource failed
    #[error("Dispose failed: {0}")]
    Dispose(String),

    /// Duplicate route registration
    #[error("Duplicate route: {0}")]
    DuplicateRoute(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a dispose error
    pub fn dispose(message: impl Into<String>) -> Self {
        Self::Dispose(message.into())
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = PluginError::Config("missing key".to_string());
        assert_eq!(config_err.to_string(), "Configuration error: missing key");

        let dispose_err = PluginError::Dispose("socket already closed".to_string());
        assert_eq!(
            dispose_err.to_string(),
            "Dispose failed: socket already closed"
        );

        let custom_err = PluginError::Custom("something happened".to_string());
        assert_eq!(custom_err.to_string(), "something happened");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let plugin_err: PluginError = io_err.into();

        assert!(matches!(plugin_err, PluginError::Io(_)));
        assert!(plugin_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let plugin_err: PluginError = json_err.into();
        assert!(matches!(plugin_err, PluginError::Json(_)));
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(PluginError::custom("test"), PluginError::Custom(_)));
        assert!(matches!(PluginError::config("bad"), PluginError::Config(_)));
        assert!(matches!(PluginError::dispose("x"), PluginError::Dispose(_)));
    }

    #[test]
    fn test_capability_type_error() {
        let err = PluginError::CapabilityType {
            name: "routerRegister".into(),
            expected: "service",
        };
        let msg = err.to_string();
        assert!(msg.contains("routerRegister"));
        assert!(msg.contains("service"));
    }

    #[test]
    fn test_duplicate_route_error() {
        let err = PluginError::DuplicateRoute("/hello-world".into());
        assert!(err.to_string().contains("/hello-world"));
    }
}
