//! Error types for Kino Player

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
///
/// Readiness and veto outcomes are not errors: reading a video property
/// before the kernel is ready yields `None`, and a vetoed fullscreen request
/// yields `Ok(false)`.
#[derive(Error, Debug)]
pub enum Error {
    // Routing errors
    #[error("Invalid target: {0} (expected video, container or wrapper)")]
    InvalidTarget(String),

    #[error("Unknown watchable property: {0}")]
    UnknownProperty(String),

    // Lifecycle errors
    #[error("Player has been destroyed")]
    Destroyed,

    // Plugin errors
    #[error("Plugin not installed: {0}")]
    PluginNotInstalled(String),

    #[error("Plugin already installed: {0}")]
    DuplicatePlugin(String),

    // Kernel errors
    #[error("Unsupported box: {0}")]
    UnsupportedBox(String),

    #[error("Kernel error: {0}")]
    Kernel(String),

    // DOM errors
    #[error("DOM error: {0}")]
    Dom(String),

    #[error("Fullscreen request failed: {0}")]
    Fullscreen(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a DOM error
    pub fn dom(msg: impl Into<String>) -> Self {
        Error::Dom(msg.into())
    }

    /// Create a kernel error
    pub fn kernel(msg: impl Into<String>) -> Self {
        Error::Kernel(msg.into())
    }

    /// Returns true if this error signals caller misuse rather than a
    /// runtime condition
    pub fn is_misuse(&self) -> bool {
        matches!(self, Error::InvalidTarget(_) | Error::UnknownProperty(_))
    }

    /// Returns the error code for diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidTarget(_) => "INVALID_TARGET",
            Error::UnknownProperty(_) => "UNKNOWN_PROPERTY",
            Error::Destroyed => "DESTROYED",
            Error::PluginNotInstalled(_) => "PLUGIN_NOT_INSTALLED",
            Error::DuplicatePlugin(_) => "DUPLICATE_PLUGIN",
            Error::UnsupportedBox(_) => "UNSUPPORTED_BOX",
            Error::Kernel(_) => "KERNEL",
            Error::Dom(_) => "DOM",
            Error::Fullscreen(_) => "FULLSCREEN",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Internal(_) => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_misuse_classification() {
        assert!(Error::InvalidTarget("foo".into()).is_misuse());
        assert!(Error::UnknownProperty("volume".into()).is_misuse());
        assert!(!Error::Destroyed.is_misuse());
        assert!(!Error::kernel("boom").is_misuse());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Destroyed.error_code(), "DESTROYED");
        assert_eq!(Error::dom("x").error_code(), "DOM");
        assert_eq!(
            Error::DuplicatePlugin("a".into()).to_string(),
            "Plugin already installed: a"
        );
    }
}
