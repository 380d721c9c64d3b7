use thiserror::Error;

/// Why a command left the document untouched. The editor session logs
/// these at debug level and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("no active selection")]
    NoSelection,
    #[error("selection is outside the editable root")]
    OutsideRoot,
    #[error("{0} is empty")]
    EmptyInput(&'static str),
    #[error("{0}")]
    NotApplicable(&'static str),
    #[error("invalid document path {0:?}")]
    InvalidPath(Vec<usize>),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode document: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unsupported document schema {schema:?} version {version}")]
    Unsupported { schema: String, version: u32 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid editor config: {0}")]
    Parse(#[from] serde_json::Error),
}
