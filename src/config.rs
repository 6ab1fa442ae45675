//! Pipeline configuration.
//!
//! Values come from an optional TOML file and are then overridden by
//! whatever the caller passes explicitly (usually CLI flags):
//!
//! ```toml
//! bin_size_msec = 20.0
//! zone = "scratch"
//! store_root = "/data/spike-density-store"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpikeDensityError};
use crate::store::StoreContext;

pub const DEFAULT_BIN_SIZE_MSEC: f64 = 20.0;
pub const DEFAULT_ZONE: &str = "scratch";
pub const DEFAULT_STORE_ROOT: &str = ".spike-density-store";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Full-resolution bin width in milliseconds.
    pub bin_size_msec: f64,
    /// Storage zone the artifact is published to.
    pub zone: String,
    /// Root directory of the local artifact store.
    pub store_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            bin_size_msec: DEFAULT_BIN_SIZE_MSEC,
            zone: DEFAULT_ZONE.to_string(),
            store_root: PathBuf::from(DEFAULT_STORE_ROOT),
        }
    }
}

/// Explicit values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bin_size_msec: Option<f64>,
    pub zone: Option<String>,
    pub store_root: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SpikeDensityError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load the file (if any), apply overrides and validate.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.bin_size_msec {
            self.bin_size_msec = v;
        }
        if let Some(v) = &overrides.zone {
            self.zone = v.clone();
        }
        if let Some(v) = &overrides.store_root {
            self.store_root = v.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bin_size_msec.is_finite() && self.bin_size_msec > 0.0) {
            return Err(SpikeDensityError::InvalidConfiguration(format!(
                "bin_size_msec must be positive, got {}",
                self.bin_size_msec
            )));
        }
        StoreContext::new(self.zone.as_str()).validate()
    }

    pub fn bin_size_sec(&self) -> f64 {
        self.bin_size_msec / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.bin_size_msec, 20.0);
        assert_eq!(config.bin_size_sec(), 0.02);
        assert_eq!(config.zone, "scratch");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str("bin_size_msec = 5.0\n").unwrap();
        assert_eq!(config.bin_size_msec, 5.0);
        assert_eq!(config.zone, DEFAULT_ZONE);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml_str("bin_size = 5.0\n"),
            Err(SpikeDensityError::Config(_))
        ));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "bin_size_msec = 5.0").unwrap();
        writeln!(file, "zone = \"lab\"").unwrap();

        let overrides = ConfigOverrides {
            zone: Some("public".to_string()),
            ..Default::default()
        };
        let config = PipelineConfig::load(Some(&path), &overrides).unwrap();
        assert_eq!(config.bin_size_msec, 5.0);
        assert_eq!(config.zone, "public");
    }

    #[test]
    fn test_validation() {
        let bad = ConfigOverrides {
            bin_size_msec: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            PipelineConfig::load(None, &bad),
            Err(SpikeDensityError::InvalidConfiguration(_))
        ));

        let mut config = PipelineConfig::default();
        config.zone = "  ".to_string();
        assert!(config.validate().is_err());
        for zone in ["../outside", "a/b", "a\\b", "..", "."] {
            config.zone = zone.to_string();
            assert!(
                matches!(
                    config.validate(),
                    Err(SpikeDensityError::InvalidConfiguration(_))
                ),
                "zone {zone:?} accepted"
            );
        }
        config.zone = "scratch".to_string();
        config.bin_size_msec = f64::NAN;
        assert!(config.validate().is_err());
    }
}
