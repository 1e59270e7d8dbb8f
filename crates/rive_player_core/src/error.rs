//! Player error types

use std::fmt;
use thiserror::Error;

/// Scene component that a name failed to resolve to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneComponent {
    Artboard,
    StateMachine,
}

impl fmt::Display for SceneComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneComponent::Artboard => f.write_str("artboard"),
            SceneComponent::StateMachine => f.write_str("state machine"),
        }
    }
}

/// Errors reported by the player
///
/// `Fetch`, `Parse` and `Resolution` are delivered to error listeners
/// registered with [`RivePlayer::on_error`](crate::RivePlayer::on_error).
/// `InvalidConfiguration` is returned synchronously at the point of misuse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// Source bytes could not be fetched
    #[error("Failed to fetch '{uri}': {reason}")]
    Fetch { uri: String, reason: String },

    /// Source bytes are not a valid animation file
    #[error("Failed to parse '{uri}': {reason}")]
    Parse { uri: String, reason: String },

    /// Named component not found and no default to fall back to
    #[error("No {component} named '{name}' and no default {component} to fall back to")]
    Resolution {
        component: SceneComponent,
        name: String,
    },

    /// Misuse of the player API (e.g. changing the clock mode after attach)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker thread or runtime could not be started
    #[error("Failed to start {0}")]
    Spawn(String),
}

impl PlayerError {
    pub fn fetch(uri: &str, err: FetchError) -> Self {
        PlayerError::Fetch {
            uri: uri.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn parse(uri: &str, err: RuntimeError) -> Self {
        PlayerError::Parse {
            uri: uri.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        PlayerError::InvalidConfiguration(message.into())
    }

    /// Whether this error came out of a source load
    pub fn is_load_failure(&self) -> bool {
        matches!(self, PlayerError::Fetch { .. } | PlayerError::Parse { .. })
    }
}

/// Errors produced by a [`ByteFetcher`](crate::ByteFetcher)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// URI scheme has no fetcher
    #[error("unsupported URI scheme '{0}'")]
    UnsupportedScheme(String),

    /// URI could not be interpreted
    #[error("invalid URI: {0}")]
    InvalidUri(String),

    /// Filesystem read failed
    #[error("I/O error: {0}")]
    Io(String),

    /// HTTP request failed or returned a non-success status
    #[error("network error: {0}")]
    Network(String),

    /// Inline data could not be decoded
    #[error("invalid inline data: {0}")]
    Decode(String),
}

/// Error produced by an [`AnimationRuntime`](crate::AnimationRuntime) parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RuntimeError(pub String);

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError(message.into())
    }
}

/// Result type for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;
