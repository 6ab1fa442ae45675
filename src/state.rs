use std::collections::BTreeSet;

use spike_density::pyramid::MultiresolutionSeries;
use spike_density::store::{load_series, LocalStore};

use crate::color::ColorMap;

/// Upper bound on bins drawn per unit; picks the pyramid level.
pub const DEFAULT_MAX_VISIBLE_BINS: usize = 2_000;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Store the current series was loaded from.
    pub store: LocalStore,

    /// Loaded pyramid (None until the user opens an artifact).
    pub series: Option<MultiresolutionSeries>,

    /// URI of the loaded record.
    pub uri: Option<String>,

    /// Units currently drawn.
    pub visible_units: BTreeSet<usize>,

    /// Per-unit colours.
    pub color_map: Option<ColorMap>,

    /// Scale every trace to its own maximum instead of a shared one.
    pub normalize_per_unit: bool,

    pub max_visible_bins: usize,

    /// Downsample factor of the level drawn in the last frame.
    pub active_factor: Option<usize>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            series: None,
            uri: None,
            visible_units: BTreeSet::new(),
            color_map: None,
            normalize_per_unit: false,
            max_visible_bins: DEFAULT_MAX_VISIBLE_BINS,
            active_factor: None,
            status_message: None,
        }
    }

    /// Ingest a newly loaded series; every unit starts visible.
    pub fn set_series(&mut self, series: MultiresolutionSeries, uri: String) {
        let num_units = series.num_units();
        self.visible_units = (0..num_units).collect();
        self.color_map = Some(ColorMap::new(num_units));
        self.series = Some(series);
        self.uri = Some(uri);
        self.active_factor = None;
        self.status_message = None;
    }

    /// Load a published record from the current store.
    pub fn open_uri(&mut self, uri: &str) {
        match load_series(&self.store, uri) {
            Ok(series) => {
                log::info!(
                    "Loaded {} levels of {} units from {uri}",
                    series.len(),
                    series.num_units()
                );
                self.set_series(series, uri.to_string());
            }
            Err(e) => {
                log::error!("Failed to load {uri}: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn toggle_unit(&mut self, unit: usize) {
        if !self.visible_units.remove(&unit) {
            self.visible_units.insert(unit);
        }
    }

    pub fn select_all(&mut self) {
        if let Some(series) = &self.series {
            self.visible_units = (0..series.num_units()).collect();
        }
    }

    pub fn select_none(&mut self) {
        self.visible_units.clear();
    }
}
