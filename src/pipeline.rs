//! End-to-end preparation: source → bins → pyramid → published artifact.

use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::data::filter::{recording_window, total_spikes, unit_summaries};
use crate::data::loader::SpikeTrainSource;
use crate::pyramid::{build_series, MultiresolutionSeries, MAX_BINS_PER_LEVEL};
use crate::store::{publish_series, ArtifactStore};

/// Load spike trains, bin and coarsen them, without touching the store.
pub fn compute_series(
    source: &dyn SpikeTrainSource,
    config: &PipelineConfig,
) -> Result<MultiresolutionSeries> {
    config.validate()?;
    let trains = source.load()?;
    let window = recording_window(&trains)?;

    log::info!("Start time: {}", window.start_time_sec);
    log::info!("End time: {}", window.end_time_sec);
    log::info!("Number of units: {}", trains.len());
    log::info!("Total number of spikes: {}", total_spikes(&trains));
    for summary in unit_summaries(&trains, &window) {
        log::info!("{summary}");
    }

    let series = build_series(&trains, &window, config.bin_size_sec(), MAX_BINS_PER_LEVEL)?;
    Ok(series)
}

/// Build the multiscale spike density for `source` and publish it.
///
/// Returns the URI of the published record.
pub fn prepare_multiscale_spike_density(
    source: &dyn SpikeTrainSource,
    config: &PipelineConfig,
    store: &dyn ArtifactStore,
) -> Result<String> {
    let series = compute_series(source, config)?;
    let uri = publish_series(store, &series).context("publishing multiscale spike density")?;
    log::info!("URI: {uri}");
    Ok(uri)
}
