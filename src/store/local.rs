use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Result, SpikeDensityError};

use super::{format_uri, parse_uri, ArtifactStore, StoreContext};

/// Content-addressed blob store on the local filesystem.
///
/// Blobs live at `<root>/<zone>/sha256/<hex>`; storing the same bytes twice
/// returns the same URI and writes nothing the second time.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    context: StoreContext,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, context: StoreContext) -> Self {
        LocalStore {
            root: root.into(),
            context,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_dir(&self) -> Result<PathBuf> {
        self.context.validate()?;
        Ok(self.root.join(&self.context.zone).join("sha256"))
    }

    /// Filesystem path a URI resolves to (the blob may not exist).
    pub fn blob_path(&self, uri: &str) -> Result<PathBuf> {
        Ok(self.blob_dir()?.join(parse_uri(uri)?))
    }

    /// Store and URI of a blob file picked directly from disk, i.e. a path of
    /// the form `<root>/<zone>/sha256/<hex>`.
    pub fn locate(blob_path: &Path) -> Result<(LocalStore, String)> {
        let malformed = || {
            SpikeDensityError::Artifact(format!(
                "{} is not inside a <root>/<zone>/sha256/ store directory",
                blob_path.display()
            ))
        };
        let digest = blob_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(malformed)?;
        let uri = format_uri(digest, "");
        parse_uri(&uri)?;

        let sha_dir = blob_path.parent().ok_or_else(malformed)?;
        if sha_dir.file_name().and_then(|n| n.to_str()) != Some("sha256") {
            return Err(malformed());
        }
        let zone_dir = sha_dir.parent().ok_or_else(malformed)?;
        let zone = zone_dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(malformed)?;
        let root = zone_dir.parent().ok_or_else(malformed)?;

        Ok((LocalStore::new(root, StoreContext::new(zone)), uri))
    }
}

impl ArtifactStore for LocalStore {
    fn context(&self) -> &StoreContext {
        &self.context
    }

    fn store_bytes(&self, bytes: &[u8], label: &str) -> Result<String> {
        let digest = format!("{:x}", Sha256::digest(bytes));
        let dir = self.blob_dir()?;
        let path = dir.join(&digest);

        if path.exists() {
            log::debug!("Blob {digest} already stored");
        } else {
            std::fs::create_dir_all(&dir)?;
            // Write next to the final location and rename so readers never
            // see a partial blob.
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(bytes)?;
            tmp.persist(&path).map_err(|e| SpikeDensityError::Io(e.error))?;
            log::debug!("Stored {} bytes as {digest} ({label})", bytes.len());
        }

        Ok(format_uri(&digest, label))
    }

    fn open(&self, uri: &str) -> Result<File> {
        let path = self.blob_path(uri)?;
        if !path.exists() {
            return Err(SpikeDensityError::Artifact(format!(
                "{uri} not found in zone '{}'",
                self.context.zone
            )));
        }
        Ok(File::open(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_store_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), StoreContext::new("scratch"));

        let uri = store.store_bytes(b"hello", "greeting.txt").unwrap();
        assert_eq!(
            uri,
            "sha256://2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824?label=greeting.txt"
        );
        assert!(dir.path().join("scratch").join("sha256").is_dir());

        let mut text = String::new();
        store.open(&uri).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello");

        // Same content, same address.
        assert_eq!(store.store_bytes(b"hello", "greeting.txt").unwrap(), uri);
    }

    #[test]
    fn test_zones_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = LocalStore::new(dir.path(), StoreContext::new("scratch"));
        let public = LocalStore::new(dir.path(), StoreContext::new("public"));

        let uri = scratch.store_bytes(b"data", "").unwrap();
        assert!(scratch.open(&uri).is_ok());
        assert!(matches!(
            public.open(&uri),
            Err(SpikeDensityError::Artifact(_))
        ));
    }

    #[test]
    fn test_locate_blob_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), StoreContext::new("lab"));
        let uri = store.store_bytes(b"record", "record.json").unwrap();
        let path = store.blob_path(&uri).unwrap();

        let (found, found_uri) = LocalStore::locate(&path).unwrap();
        assert_eq!(found.root(), dir.path());
        assert_eq!(found.context().zone, "lab");
        assert_eq!(parse_uri(&found_uri).unwrap(), parse_uri(&uri).unwrap());
        assert!(found.open(&found_uri).is_ok());

        assert!(LocalStore::locate(&dir.path().join("notes.txt")).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), StoreContext::new("scratch"));
        let value = serde_json::json!({"type": "multiscale_spike_density", "uri": "x"});
        let uri = store.store_json(&value, "record.json").unwrap();
        assert_eq!(store.load_json(&uri).unwrap(), value);
    }

    #[test]
    fn test_zone_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let store = LocalStore::new(&root, StoreContext::new("../outside"));
        assert!(matches!(
            store.store_bytes(b"data", ""),
            Err(SpikeDensityError::InvalidConfiguration(_))
        ));
        assert!(!dir.path().join("outside").exists());
    }
}
