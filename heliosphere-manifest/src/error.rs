use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("frame {grid_index} already committed")]
    AlreadyCommitted { grid_index: u32 },
}
