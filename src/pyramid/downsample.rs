use crate::error::{Result, SpikeDensityError};

use super::matrix::CountMatrix;
use super::series::{MultiresolutionSeries, ResolutionLevel};

/// Number of adjacent bins merged at every coarsening step.
pub const DOWNSAMPLE_FACTOR: usize = 3;
/// Coarsening stops once a level has at most this many bins.
pub const MAX_BINS_PER_LEVEL: usize = 10_000;

/// Merge every `factor` consecutive bins of `level` into one.
///
/// Trailing bins that do not fill a whole group are dropped, so the new level
/// covers `floor(num_bins / factor) * factor` of the source bins.  Returns
/// `None` when not even one group fits.
pub fn downsample(level: &ResolutionLevel, factor: usize) -> Result<Option<ResolutionLevel>> {
    if factor < 2 {
        return Err(SpikeDensityError::InvalidConfiguration(format!(
            "downsample factor must be at least 2, got {factor}"
        )));
    }
    let source = level.matrix();
    let num_units = source.num_units();
    let num_ds_bins = source.num_bins() / factor;
    if num_ds_bins == 0 {
        return Ok(None);
    }

    let mut counts = vec![0i32; num_ds_bins * num_units];
    for ds_bin in 0..num_ds_bins {
        let out = &mut counts[ds_bin * num_units..(ds_bin + 1) * num_units];
        for bin in ds_bin * factor..(ds_bin + 1) * factor {
            for (unit, (acc, &c)) in out.iter_mut().zip(source.row(bin)).enumerate() {
                *acc = acc
                    .checked_add(c)
                    .ok_or(SpikeDensityError::CountOverflow { unit, bin: ds_bin })?;
            }
        }
    }

    let matrix = CountMatrix::from_row_major(num_ds_bins, num_units, counts)?;
    Ok(Some(level.coarsened(factor, matrix)))
}

/// Number of levels (full resolution included) a pyramid over `num_bins`
/// bins will have.
pub fn pyramid_depth(num_bins: usize, factor: usize, threshold: usize) -> usize {
    let mut depth = 1;
    let mut n = num_bins;
    while n > threshold && n / factor > 0 {
        n /= factor;
        depth += 1;
    }
    depth
}

/// Builds the coarser levels above a full-resolution level.
#[derive(Debug, Clone, Copy)]
pub struct Downsampler {
    threshold: usize,
}

impl Default for Downsampler {
    fn default() -> Self {
        Downsampler {
            threshold: MAX_BINS_PER_LEVEL,
        }
    }
}

impl Downsampler {
    /// A downsampler that stops once a level has at most `threshold` bins.
    pub fn with_threshold(threshold: usize) -> Self {
        Downsampler { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Repeatedly coarsen `base` by [`DOWNSAMPLE_FACTOR`] until a level has at
    /// most `threshold` bins.
    pub fn build(&self, base: ResolutionLevel) -> Result<MultiresolutionSeries> {
        let mut levels = vec![base];
        loop {
            let current = &levels[levels.len() - 1];
            if current.num_bins() <= self.threshold {
                break;
            }
            let Some(next) = downsample(current, DOWNSAMPLE_FACTOR)? else {
                break;
            };
            log::info!(
                "Downsampling by {} ({} bins of {} s)",
                next.downsample_factor(),
                next.num_bins(),
                next.bin_size_sec()
            );
            levels.push(next);
        }
        MultiresolutionSeries::new(levels)
    }
}
