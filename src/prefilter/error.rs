use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrefilterError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Module or pointer enumeration failed. Absorbed by the tick.
    #[error("{source_name} unavailable: {message}")]
    CollaboratorUnavailable { source_name: &'static str, message: String },

    /// The region lock was poisoned by a panicking holder.
    #[error("Region lock poisoned during {0}")]
    ConcurrentAccessViolation(&'static str),

    #[error("PrefilterEngine already initialized")]
    AlreadyInitialized,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PrefilterError>;

impl PrefilterError {
    pub fn collaborator(source_name: &'static str, err: &anyhow::Error) -> Self {
        PrefilterError::CollaboratorUnavailable {
            source_name,
            message: format!("{:#}", err),
        }
    }

    /// True for conditions the engine swallows and keeps running through.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PrefilterError::CollaboratorUnavailable { .. })
    }
}
