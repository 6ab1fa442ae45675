/// Artifact persistence: level encoding and a content-addressed blob store.
///
/// ```text
///  MultiresolutionSeries
///        │
///        ▼
///   ┌──────────┐
///   │ levels    │  one GZIP Parquet file per level, attrs in file metadata
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ artifact  │  store levels → manifest JSON → record JSON
///   └──────────┘
///        │
///        ▼
///   ArtifactStore (LocalStore: <root>/<zone>/sha256/<hex>)
/// ```

pub mod artifact;
pub mod local;
pub mod levels;

use std::fs::File;
use std::path::Path;

use crate::error::{Result, SpikeDensityError};

pub use artifact::{load_series, publish_series};
pub use local::LocalStore;

/// URI scheme of content-addressed blobs.
pub const URI_SCHEME: &str = "sha256://";

/// Where published artifacts go. Handed to the store explicitly instead of
/// being read from process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreContext {
    pub zone: String,
}

impl StoreContext {
    pub fn new(zone: impl Into<String>) -> Self {
        StoreContext { zone: zone.into() }
    }

    /// The zone names a single directory under the store root.
    pub fn validate(&self) -> Result<()> {
        let zone = self.zone.as_str();
        if zone.trim().is_empty() {
            return Err(SpikeDensityError::InvalidConfiguration(
                "zone must not be empty".to_string(),
            ));
        }
        if zone.contains(['/', '\\']) || zone == "." || zone.contains("..") {
            return Err(SpikeDensityError::InvalidConfiguration(format!(
                "zone '{zone}' must be a plain name without path separators or '..'"
            )));
        }
        Ok(())
    }
}

/// A store of opaque blobs addressed by the hash of their content.
pub trait ArtifactStore {
    fn context(&self) -> &StoreContext;

    /// Store `bytes` and return their reference URI.
    fn store_bytes(&self, bytes: &[u8], label: &str) -> Result<String>;

    /// Open a stored blob for reading.
    fn open(&self, uri: &str) -> Result<File>;

    fn store_file(&self, path: &Path, label: &str) -> Result<String> {
        let bytes = std::fs::read(path)?;
        self.store_bytes(&bytes, label)
    }

    fn store_json(&self, value: &serde_json::Value, label: &str) -> Result<String> {
        let bytes = serde_json::to_vec(value)?;
        self.store_bytes(&bytes, label)
    }

    fn load_json(&self, uri: &str) -> Result<serde_json::Value> {
        let file = self.open(uri)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// Build `sha256://<hex>?label=<label>`.
pub fn format_uri(hex_digest: &str, label: &str) -> String {
    if label.is_empty() {
        format!("{URI_SCHEME}{hex_digest}")
    } else {
        format!("{URI_SCHEME}{hex_digest}?label={label}")
    }
}

/// Extract the hex digest from a blob URI.
pub fn parse_uri(uri: &str) -> Result<&str> {
    let rest = uri
        .strip_prefix(URI_SCHEME)
        .ok_or_else(|| SpikeDensityError::Artifact(format!("not a {URI_SCHEME} URI: {uri}")))?;
    let digest = rest.split('?').next().unwrap_or("");
    if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SpikeDensityError::Artifact(format!(
            "malformed digest in URI: {uri}"
        )));
    }
    Ok(digest)
}
