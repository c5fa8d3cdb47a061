use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid snapshot JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("position key `{0}` is not a device id")]
    InvalidDeviceKey(String),
}
