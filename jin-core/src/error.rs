//! Plugin host error types

use std::time::Duration;

use jin_plugin_api::PluginError;
use thiserror::Error;

/// Errors that can occur in the plugin host
#[derive(Error, Debug)]
pub enum HostError {
    /// Manifest had neither a url nor a factory
    #[error("Plugin '{id}' must provide either a url or a factory")]
    Registration { id: String },

    /// Fetching or executing a plugin module failed
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Plugin not registered
    #[error("Plugin '{id}' not found")]
    NotFound { id: String },

    /// Error raised by plugin code (hook or factory), passed through as-is
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Plugin requires capabilities the base context does not provide
    #[error("Plugin '{id}' is missing required capabilities: {}", missing.join(", "))]
    MissingCapabilities { id: String, missing: Vec<String> },

    /// Plugin hook timed out
    #[error("Plugin '{id}' timed out after {timeout:?}")]
    Timeout { id: String, timeout: Duration },
}

/// Errors from turning a URL into a plugin instance. Every variant names the URL.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Server answered with a non-success status
    #[error("Failed to fetch plugin from {url}: {status} {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    /// Request never produced a response, or the body could not be read
    #[error("Failed to fetch plugin from {url}: {message}")]
    Fetch { url: String, message: String },

    /// Module code failed while executing
    #[error("Failed to execute plugin module {url}: {message}")]
    Execution { url: String, message: String },

    /// Module ran but its exports have no `activate` function
    #[error("Plugin module {url} does not export an activate function")]
    MissingActivate { url: String },

    /// API version mismatch between jin and the module
    #[error("API version mismatch in {url}: jin expects {expected}, module has {found}")]
    ApiVersionMismatch { url: String, expected: u32, found: u32 },

    /// Failed to open the module as a dynamic library
    #[error("Failed to load plugin library {url}: {source}")]
    Library {
        url: String,
        #[source]
        source: libloading::Error,
    },

    /// URL is malformed or uses a scheme the loader does not handle
    #[error("Unsupported plugin url {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl LoadError {
    /// URL of the module that failed to load
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Fetch { url, .. }
            | Self::Execution { url, .. }
            | Self::MissingActivate { url }
            | Self::ApiVersionMismatch { url, .. }
            | Self::Library { url, .. }
            | Self::InvalidUrl { url, .. } => url,
        }
    }

    pub(crate) fn execution(url: &str, message: impl Into<String>) -> Self {
        Self::Execution {
            url: url.to_string(),
            message: message.into(),
        }
    }
}
