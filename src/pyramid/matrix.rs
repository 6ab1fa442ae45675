use crate::error::{Result, SpikeDensityError};

/// Allocate `len` zeroed counts, failing instead of aborting when the buffer
/// cannot be reserved.
pub(crate) fn zeroed_counts(len: usize) -> Result<Vec<i32>> {
    let mut counts = Vec::new();
    counts.try_reserve_exact(len).map_err(|e| {
        SpikeDensityError::InvalidConfiguration(format!(
            "cannot allocate {len} spike counts: {e}"
        ))
    })?;
    counts.resize(len, 0);
    Ok(counts)
}

/// Number of cells of a `num_bins × num_units` matrix, if it fits in `usize`.
pub(crate) fn cell_count(num_bins: usize, num_units: usize) -> Result<usize> {
    num_bins.checked_mul(num_units).ok_or_else(|| {
        SpikeDensityError::InvalidConfiguration(format!(
            "{num_bins} bins x {num_units} units is too large"
        ))
    })
}

/// Row-major `(num_bins × num_units)` table of spike counts.
///
/// Row `b` holds the counts of every unit in bin `b`; column `u` is the
/// histogram of unit `u`.  Values are never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMatrix {
    num_bins: usize,
    num_units: usize,
    counts: Vec<i32>,
}

impl CountMatrix {
    /// Wrap a row-major buffer. Fails if the buffer length does not match the
    /// shape or a count is negative.
    pub fn from_row_major(num_bins: usize, num_units: usize, counts: Vec<i32>) -> Result<Self> {
        if counts.len() != cell_count(num_bins, num_units)? {
            return Err(SpikeDensityError::Artifact(format!(
                "count buffer holds {} values, expected {num_bins} x {num_units}",
                counts.len()
            )));
        }
        if let Some(pos) = counts.iter().position(|&c| c < 0) {
            return Err(SpikeDensityError::Artifact(format!(
                "negative count in bin {} of unit {}",
                pos / num_units.max(1),
                pos % num_units.max(1)
            )));
        }
        Ok(CountMatrix {
            num_bins,
            num_units,
            counts,
        })
    }

    /// Assemble a matrix from one histogram per unit (all of equal length).
    pub fn from_columns(num_bins: usize, columns: &[Vec<i32>]) -> Result<Self> {
        let num_units = columns.len();
        let mut counts = zeroed_counts(cell_count(num_bins, num_units)?)?;
        for (u, col) in columns.iter().enumerate() {
            if col.len() != num_bins {
                return Err(SpikeDensityError::Artifact(format!(
                    "unit {u} has {} bins, expected {num_bins}",
                    col.len()
                )));
            }
            for (b, &c) in col.iter().enumerate() {
                counts[b * num_units + u] = c;
            }
        }
        Self::from_row_major(num_bins, num_units, counts)
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn num_units(&self) -> usize {
        self.num_units
    }

    #[inline]
    pub fn get(&self, bin: usize, unit: usize) -> i32 {
        self.counts[bin * self.num_units + unit]
    }

    /// Counts of every unit in one bin.
    pub fn row(&self, bin: usize) -> &[i32] {
        let start = bin * self.num_units;
        &self.counts[start..start + self.num_units]
    }

    /// Histogram of one unit.
    pub fn column(&self, unit: usize) -> Vec<i32> {
        (0..self.num_bins).map(|b| self.get(b, unit)).collect()
    }

    /// Total spike count of one unit over the first `num_bins` rows.
    pub fn column_sum_prefix(&self, unit: usize, num_bins: usize) -> i64 {
        (0..num_bins.min(self.num_bins))
            .map(|b| self.get(b, unit) as i64)
            .sum()
    }

    pub fn column_sum(&self, unit: usize) -> i64 {
        self.column_sum_prefix(unit, self.num_bins)
    }

    pub fn as_row_major(&self) -> &[i32] {
        &self.counts
    }
}
