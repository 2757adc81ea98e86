//! Error types for NFS server proxy operations.

use thiserror::Error;

use crate::endpoint::EndpointError;
use crate::relation::RelationId;

/// Main error type for NFS server proxy operations
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The `endpoint` option is unset or blank
    #[error("no configured endpoint")]
    ConfigMissing,

    /// The `endpoint` option failed validation
    #[error("invalid endpoint: {0}")]
    ConfigMalformed(#[from] EndpointError),

    /// No client is integrated on the named relation yet
    #[error("no '{0}' integration")]
    RelationAbsent(String),

    /// Invalid proxy settings (the TOML file, not the charm option)
    #[error("invalid proxy settings: {0}")]
    InvalidConfig(String),

    /// A hook tool could not be spawned or exited non-zero
    #[error("hook tool '{0}' failed: {1}")]
    HookTool(String, String),

    /// A hook tool did not exit within the configured timeout
    #[error("hook tool '{0}' timed out")]
    HookToolTimeout(String),

    /// A hook tool produced output that could not be decoded
    #[error("could not decode output of '{0}': {1}")]
    Decode(String, String),

    /// Writing the application bucket of a relation failed
    #[error("failed to write relation {0}: {1}")]
    RelationWrite(RelationId, String),
}

/// Result type alias for NFS server proxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;
