/// The binning core: spike trains in, a pyramid of count matrices out.
///
/// ```text
///  Vec<SpikeTrain> + TimeWindow
///        │
///        ▼
///   ┌──────────┐
///   │  binner   │  per-unit histogram → full-resolution CountMatrix
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ downsample │  merge 3 bins at a time until ≤ MAX_BINS_PER_LEVEL
///   └────────────┘
///        │
///        ▼
///   MultiresolutionSeries (levels ×1, ×3, ×9, ...)
/// ```

pub mod binner;
pub mod downsample;
pub mod matrix;
pub mod series;

use crate::data::model::{SpikeTrain, TimeWindow};
use crate::error::Result;

pub use binner::bin_spike_trains;
pub use downsample::{Downsampler, DOWNSAMPLE_FACTOR, MAX_BINS_PER_LEVEL};
pub use matrix::CountMatrix;
pub use series::{MultiresolutionSeries, ResolutionLevel};

/// Bin the trains and coarsen until a level has at most `max_bins_per_level`
/// bins. Pure function of its inputs.
pub fn build_series(
    trains: &[SpikeTrain],
    window: &TimeWindow,
    bin_size_sec: f64,
    max_bins_per_level: usize,
) -> Result<MultiresolutionSeries> {
    let base = bin_spike_trains(trains, window, bin_size_sec)?;
    Downsampler::with_threshold(max_bins_per_level).build(base)
}
