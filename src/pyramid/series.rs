use std::ops::Range;

use crate::error::{Result, SpikeDensityError};

use super::downsample::DOWNSAMPLE_FACTOR;
use super::matrix::CountMatrix;

/// Upper bound on the number of cells (bins × units) in one stored chunk.
pub const CHUNK_CELL_BUDGET: usize = 5_000_000;

/// Dataset name of the full-resolution level.
pub const FULL_RESOLUTION_NAME: &str = "spike_counts";

/// Rows per stored chunk for a `(num_bins × num_units)` matrix.
pub fn chunk_rows_for(num_bins: usize, num_units: usize) -> usize {
    let target_rows = (CHUNK_CELL_BUDGET / num_units.max(1)).max(1);
    target_rows.min(num_bins).max(1)
}

/// Storage name of the level with the given cumulative downsample factor.
pub fn level_name(downsample_factor: usize) -> String {
    if downsample_factor == 1 {
        FULL_RESOLUTION_NAME.to_string()
    } else {
        format!("{FULL_RESOLUTION_NAME}_ds_{downsample_factor}")
    }
}

// ---------------------------------------------------------------------------
// ResolutionLevel – one rung of the pyramid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionLevel {
    bin_size_sec: f64,
    start_time_sec: f64,
    downsample_factor: usize,
    matrix: CountMatrix,
}

impl ResolutionLevel {
    pub fn full_resolution(bin_size_sec: f64, start_time_sec: f64, matrix: CountMatrix) -> Self {
        Self::from_parts(bin_size_sec, start_time_sec, 1, matrix)
    }

    /// Rebuild a level from stored attributes.
    pub fn from_parts(
        bin_size_sec: f64,
        start_time_sec: f64,
        downsample_factor: usize,
        matrix: CountMatrix,
    ) -> Self {
        ResolutionLevel {
            bin_size_sec,
            start_time_sec,
            downsample_factor,
            matrix,
        }
    }

    /// Level `factor` times coarser than `self`, anchored at the same origin.
    pub(crate) fn coarsened(&self, factor: usize, matrix: CountMatrix) -> Self {
        ResolutionLevel {
            bin_size_sec: self.bin_size_sec * factor as f64,
            start_time_sec: self.start_time_sec,
            downsample_factor: self.downsample_factor * factor,
            matrix,
        }
    }

    pub fn bin_size_sec(&self) -> f64 {
        self.bin_size_sec
    }

    pub fn start_time_sec(&self) -> f64 {
        self.start_time_sec
    }

    /// Bin width relative to the full-resolution level (1, 3, 9, ...).
    pub fn downsample_factor(&self) -> usize {
        self.downsample_factor
    }

    pub fn matrix(&self) -> &CountMatrix {
        &self.matrix
    }

    pub fn num_bins(&self) -> usize {
        self.matrix.num_bins()
    }

    pub fn num_units(&self) -> usize {
        self.matrix.num_units()
    }

    pub fn name(&self) -> String {
        level_name(self.downsample_factor)
    }

    /// End of the span actually covered by this level's bins. Coarser levels
    /// may stop short of the recording end because of truncated remainders.
    pub fn end_time_sec(&self) -> f64 {
        self.bin_start_sec(self.num_bins())
    }

    pub fn bin_start_sec(&self, bin: usize) -> f64 {
        self.start_time_sec + self.bin_size_sec * bin as f64
    }

    /// Suggested rows per stored chunk.
    pub fn chunk_rows(&self) -> usize {
        chunk_rows_for(self.num_bins(), self.num_units())
    }

    /// Bins overlapping `[t0, t1]`, clamped to the level.
    pub fn bin_range(&self, t0: f64, t1: f64) -> Range<usize> {
        let n = self.num_bins() as f64;
        let first = ((t0 - self.start_time_sec) / self.bin_size_sec)
            .floor()
            .clamp(0.0, n) as usize;
        let last = ((t1 - self.start_time_sec) / self.bin_size_sec)
            .ceil()
            .clamp(0.0, n) as usize;
        first..last.max(first)
    }
}

// ---------------------------------------------------------------------------
// MultiresolutionSeries – every level, finest first
// ---------------------------------------------------------------------------

/// Ordered pyramid: index 0 is full resolution, each next level is
/// [`DOWNSAMPLE_FACTOR`] times coarser.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiresolutionSeries {
    levels: Vec<ResolutionLevel>,
}

impl MultiresolutionSeries {
    /// Check the pyramid invariants and wrap the levels.
    pub fn new(levels: Vec<ResolutionLevel>) -> Result<Self> {
        let Some(base) = levels.first() else {
            return Err(SpikeDensityError::Artifact(
                "a series needs at least the full-resolution level".to_string(),
            ));
        };
        if base.downsample_factor() != 1 {
            return Err(SpikeDensityError::Artifact(format!(
                "first level has downsample factor {}, expected 1",
                base.downsample_factor()
            )));
        }
        for pair in levels.windows(2) {
            let (fine, coarse) = (&pair[0], &pair[1]);
            let expected_bin_size = fine.bin_size_sec() * DOWNSAMPLE_FACTOR as f64;
            let consistent = coarse.downsample_factor()
                == fine.downsample_factor() * DOWNSAMPLE_FACTOR
                && coarse.num_bins() == fine.num_bins() / DOWNSAMPLE_FACTOR
                && coarse.num_bins() > 0
                && coarse.num_units() == fine.num_units()
                && coarse.start_time_sec() == fine.start_time_sec()
                && (coarse.bin_size_sec() - expected_bin_size).abs()
                    <= 1e-12 * expected_bin_size.abs();
            if !consistent {
                return Err(SpikeDensityError::Artifact(format!(
                    "level {} is not a {DOWNSAMPLE_FACTOR}x coarsening of level {}",
                    coarse.name(),
                    fine.name()
                )));
            }
        }
        Ok(MultiresolutionSeries { levels })
    }

    pub fn levels(&self) -> &[ResolutionLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn full_resolution(&self) -> &ResolutionLevel {
        &self.levels[0]
    }

    pub fn coarsest(&self) -> &ResolutionLevel {
        &self.levels[self.levels.len() - 1]
    }

    pub fn num_units(&self) -> usize {
        self.full_resolution().num_units()
    }

    pub fn level_by_factor(&self, downsample_factor: usize) -> Option<&ResolutionLevel> {
        self.levels
            .iter()
            .find(|l| l.downsample_factor() == downsample_factor)
    }

    /// Finest level showing `span_sec` in at most `max_visible_bins` bins,
    /// falling back to the coarsest level.
    pub fn select_level(&self, span_sec: f64, max_visible_bins: usize) -> &ResolutionLevel {
        self.levels
            .iter()
            .find(|l| span_sec / l.bin_size_sec() <= max_visible_bins as f64)
            .unwrap_or_else(|| self.coarsest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pyramid::downsample::Downsampler;

    fn series(num_bins: usize, threshold: usize) -> MultiresolutionSeries {
        let m = CountMatrix::from_columns(num_bins, &[vec![1; num_bins]]).unwrap();
        Downsampler::with_threshold(threshold)
            .build(ResolutionLevel::full_resolution(0.01, 0.0, m))
            .unwrap()
    }

    #[test]
    fn test_level_names_are_unique_by_factor() {
        let s = series(100, 5);
        let names: Vec<String> = s.levels().iter().map(ResolutionLevel::name).collect();
        assert_eq!(
            names,
            vec!["spike_counts", "spike_counts_ds_3", "spike_counts_ds_9", "spike_counts_ds_27"]
        );
        assert_eq!(s.level_by_factor(9).map(|l| l.num_bins()), Some(11));
        assert!(s.level_by_factor(2).is_none());
    }

    #[test]
    fn test_chunk_rows() {
        assert_eq!(chunk_rows_for(100, 10), 100);
        assert_eq!(chunk_rows_for(10_000_000, 100), 50_000);
        assert_eq!(chunk_rows_for(10_000_000, 10_000_000), 1);
        assert_eq!(chunk_rows_for(1, 1), 1);
    }

    #[test]
    fn test_select_level() {
        let s = series(1000, 10);
        // 1000 -> 333 -> 111 -> 37 -> 12 -> 4 bins
        assert_eq!(s.len(), 6);
        assert_eq!(s.select_level(1.0, 200).downsample_factor(), 1);
        assert_eq!(s.select_level(10.0, 200).downsample_factor(), 9);
        assert_eq!(s.select_level(1e6, 200).downsample_factor(), 243);
    }

    #[test]
    fn test_bin_range() {
        let s = series(1000, 10_000);
        let level = s.full_resolution();
        assert_eq!(level.bin_range(0.0, 0.05), 0..5);
        assert_eq!(level.bin_range(0.015, 0.025), 1..3);
        assert_eq!(level.bin_range(-5.0, 100.0), 0..1000);
        assert_eq!(level.bin_range(50.0, 60.0), 1000..1000);
    }

    #[test]
    fn test_inconsistent_levels_rejected() {
        let fine = ResolutionLevel::full_resolution(
            0.01,
            0.0,
            CountMatrix::from_columns(9, &[vec![1; 9]]).unwrap(),
        );
        let wrong = ResolutionLevel::from_parts(
            0.02,
            0.0,
            3,
            CountMatrix::from_columns(3, &[vec![3; 3]]).unwrap(),
        );
        assert!(MultiresolutionSeries::new(vec![fine.clone(), wrong]).is_err());
        assert!(MultiresolutionSeries::new(vec![]).is_err());

        let coarse = ResolutionLevel::from_parts(
            0.03,
            0.0,
            3,
            CountMatrix::from_columns(3, &[vec![3; 3]]).unwrap(),
        );
        assert!(MultiresolutionSeries::new(vec![fine, coarse]).is_ok());
    }
}
