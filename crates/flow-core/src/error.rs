use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The stored slot exists but cannot be read back as a state tree.
    #[error("corrupt state in {}: {reason}", .path.display())]
    CorruptState { path: PathBuf, reason: String },

    #[error(
        "{} was written by a newer schema (version {found}, supported {supported})",
        .path.display()
    )]
    UnsupportedVersion {
        path: PathBuf,
        found: u64,
        supported: u16,
    },

    #[error("config error: {0}")]
    Config(String),
}

pub type FlowResult<T> = Result<T, FlowError>;
