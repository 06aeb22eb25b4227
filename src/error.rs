/// Error types for the fallible edges of the server: rendering, navigation
/// and configuration. Scanning and resolution never fail.
use std::path::PathBuf;

/// A decoration application that did not reach the client.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RenderError {
    /// The document was closed between the event and the render.
    #[error("document closed before decorations were applied: {0}")]
    DocumentClosed(String),

    /// The notification channel to the client is gone.
    #[error("decoration transport closed")]
    TransportClosed,
}

/// A user-initiated navigation that could not open its target.
#[derive(Debug, thiserror::Error)]
pub(crate) enum NavigationError {
    #[error("file not found: {}", .0.display())]
    TargetNotFound(PathBuf),

    /// The path could not be resolved to an absolute location.
    #[error("cannot resolve link path `{0}` without a workspace root")]
    Unresolved(String),

    #[error("the editor declined to open {}", .0.display())]
    Rejected(PathBuf),

    #[error("showDocument failed: {0}")]
    Client(String),
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid settings: {0}")]
    Invalid(#[from] serde_json::Error),
}
