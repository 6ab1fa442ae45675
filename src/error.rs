use thiserror::Error;

/// Errors raised by the binning core and the artifact store.
#[derive(Debug, Error)]
pub enum SpikeDensityError {
    /// Bad bin size, no units, or an empty / degenerate time window.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A bin count no longer fits in an `i32`.
    #[error("Spike count overflow for unit {unit} in bin {bin}")]
    CountOverflow { unit: usize, bin: usize },

    #[error("Configuration file error: {0}")]
    Config(String),

    /// Missing blob, unknown URI, or an artifact with an unexpected layout.
    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SpikeDensityError>;
