use serde::{Deserialize, Serialize};

use crate::error::{Result, SpikeDensityError};
use crate::pyramid::MultiresolutionSeries;

use super::levels::{read_level, write_level};
use super::ArtifactStore;

/// `type` of the record returned to callers.
pub const RECORD_TYPE: &str = "multiscale_spike_density";
/// `type` of the manifest listing every level.
pub const MANIFEST_TYPE: &str = "multiscale_spike_density_levels";

/// Entry point of a published artifact: points at the level manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelEntry {
    pub name: String,
    pub uri: String,
    pub bin_size_sec: f64,
    pub start_time_sec: f64,
    pub downsample_factor: usize,
    pub num_bins: usize,
    pub chunk_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelManifest {
    #[serde(rename = "type")]
    pub kind: String,
    pub num_units: usize,
    pub levels: Vec<LevelEntry>,
}

/// Encode every level, store it, and store the manifest and record.
///
/// Returns the URI of the record.
pub fn publish_series(store: &dyn ArtifactStore, series: &MultiresolutionSeries) -> Result<String> {
    let tmpdir = tempfile::tempdir()?;
    let mut entries = Vec::with_capacity(series.len());
    let mut total_bytes = 0u64;

    for level in series.levels() {
        let name = level.name();
        let path = tmpdir.path().join(format!("{name}.parquet"));
        write_level(level, &path)?;
        let size = std::fs::metadata(&path)?.len();
        total_bytes += size;
        log::debug!("Encoded {name}: {} bins, {size} bytes", level.num_bins());

        let uri = store.store_file(&path, &format!("{name}.parquet"))?;
        entries.push(LevelEntry {
            name,
            uri,
            bin_size_sec: level.bin_size_sec(),
            start_time_sec: level.start_time_sec(),
            downsample_factor: level.downsample_factor(),
            num_bins: level.num_bins(),
            chunk_rows: level.chunk_rows(),
        });
    }

    log::info!(
        "Uploading to zone '{}' ({} MB)",
        store.context().zone,
        total_bytes as f64 / 1e6
    );

    let manifest = LevelManifest {
        kind: MANIFEST_TYPE.to_string(),
        num_units: series.num_units(),
        levels: entries,
    };
    let manifest_uri = store.store_json(
        &serde_json::to_value(&manifest)?,
        "multiscale_spike_density.levels.json",
    )?;

    let record = SeriesRecord {
        kind: RECORD_TYPE.to_string(),
        uri: manifest_uri,
    };
    store.store_json(&serde_json::to_value(&record)?, "")
}

/// Load a series published with [`publish_series`].
pub fn load_series(store: &dyn ArtifactStore, uri: &str) -> Result<MultiresolutionSeries> {
    let record: SeriesRecord = serde_json::from_value(store.load_json(uri)?)?;
    if record.kind != RECORD_TYPE {
        return Err(SpikeDensityError::Artifact(format!(
            "unexpected record type: {}",
            record.kind
        )));
    }

    let manifest: LevelManifest = serde_json::from_value(store.load_json(&record.uri)?)?;
    if manifest.kind != MANIFEST_TYPE {
        return Err(SpikeDensityError::Artifact(format!(
            "unexpected manifest type: {}",
            manifest.kind
        )));
    }

    let mut levels = Vec::with_capacity(manifest.levels.len());
    for entry in &manifest.levels {
        let level = read_level(store.open(&entry.uri)?)?;
        if level.name() != entry.name
            || level.num_bins() != entry.num_bins
            || level.num_units() != manifest.num_units
        {
            return Err(SpikeDensityError::Artifact(format!(
                "level {} does not match its manifest entry",
                entry.name
            )));
        }
        levels.push(level);
    }
    MultiresolutionSeries::new(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pyramid::{CountMatrix, Downsampler, ResolutionLevel};
    use crate::store::{LocalStore, StoreContext};

    fn series() -> MultiresolutionSeries {
        let n = 90;
        let columns: Vec<Vec<i32>> = (0..3).map(|u| (0..n).map(|b| ((b + u) % 3) as i32).collect()).collect();
        let base = ResolutionLevel::full_resolution(
            0.02,
            0.0,
            CountMatrix::from_columns(n, &columns).unwrap(),
        );
        Downsampler::with_threshold(10).build(base).unwrap()
    }

    #[test]
    fn test_publish_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), StoreContext::new("scratch"));
        let s = series();
        assert_eq!(s.len(), 3);

        let uri = publish_series(&store, &s).unwrap();
        let record = store.load_json(&uri).unwrap();
        assert_eq!(record["type"], RECORD_TYPE);

        let manifest = store.load_json(record["uri"].as_str().unwrap()).unwrap();
        let names: Vec<&str> = manifest["levels"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["spike_counts", "spike_counts_ds_3", "spike_counts_ds_9"]);

        assert_eq!(load_series(&store, &uri).unwrap(), s);
    }

    #[test]
    fn test_publish_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), StoreContext::new("scratch"));
        let a = publish_series(&store, &series()).unwrap();
        let b = publish_series(&store, &series()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_record_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), StoreContext::new("scratch"));
        let uri = store
            .store_json(&serde_json::json!({"type": "something_else", "uri": "x"}), "")
            .unwrap();
        assert!(matches!(
            load_series(&store, &uri),
            Err(SpikeDensityError::Artifact(_))
        ));
    }
}
