use crate::data::model::{SpikeTrain, TimeWindow};
use crate::error::{Result, SpikeDensityError};

use super::matrix::{cell_count, zeroed_counts, CountMatrix};
use super::series::ResolutionLevel;

/// Number of full-width bins that fit in the window.
pub fn num_bins_for(window: &TimeWindow, bin_size_sec: f64) -> Result<usize> {
    if !(bin_size_sec.is_finite() && bin_size_sec > 0.0) {
        return Err(SpikeDensityError::InvalidConfiguration(format!(
            "bin size must be positive, got {bin_size_sec} s"
        )));
    }
    let ratio = (window.duration_sec() / bin_size_sec).floor();
    if !ratio.is_finite() || ratio >= usize::MAX as f64 {
        return Err(SpikeDensityError::InvalidConfiguration(format!(
            "{bin_size_sec} s bins over {window} give too many bins"
        )));
    }
    let num_bins = ratio as usize;
    if num_bins == 0 {
        return Err(SpikeDensityError::InvalidConfiguration(format!(
            "window {window} is shorter than one {bin_size_sec} s bin"
        )));
    }
    Ok(num_bins)
}

/// Equal-width histogram edges over a window, `num_bins + 1` of them.
///
/// Edge `i` is `start + i * step`, with the last edge pinned to the window end
/// so the final bin closes exactly on it.
struct Edges {
    start: f64,
    end: f64,
    step: f64,
    num_bins: usize,
}

impl Edges {
    fn new(window: &TimeWindow, num_bins: usize) -> Self {
        Edges {
            start: window.start_time_sec,
            end: window.end_time_sec,
            step: window.duration_sec() / num_bins as f64,
            num_bins,
        }
    }

    #[inline]
    fn edge(&self, i: usize) -> f64 {
        if i == self.num_bins {
            self.end
        } else {
            i as f64 * self.step + self.start
        }
    }

    /// Bin of a timestamp inside `[start, end]`.
    ///
    /// The estimate from scaling is corrected against the explicit edges so
    /// that a timestamp on an inner edge always lands in the upper bin, and
    /// one equal to `end` lands in the last bin.
    fn bin_of(&self, t: f64) -> usize {
        let scale = self.num_bins as f64 / (self.end - self.start);
        let mut idx = (((t - self.start) * scale) as usize).min(self.num_bins - 1);
        if idx > 0 && t < self.edge(idx) {
            idx -= 1;
        } else if idx + 1 < self.num_bins && t >= self.edge(idx + 1) {
            idx += 1;
        }
        idx
    }
}

/// Histogram of one unit's timestamps over `num_bins` bins spanning the window.
///
/// Returns the counts and the number of timestamps that fell outside the
/// window and were dropped.
pub fn histogram(
    train: &SpikeTrain,
    window: &TimeWindow,
    num_bins: usize,
) -> Result<(Vec<i32>, usize)> {
    let edges = Edges::new(window, num_bins);
    let mut counts = zeroed_counts(num_bins)?;
    let dropped = accumulate(&mut counts, &edges, train, window)?;
    Ok((counts, dropped))
}

/// Add one unit's timestamps onto existing bin counts; returns how many
/// fell outside the window.
fn accumulate(
    counts: &mut [i32],
    edges: &Edges,
    train: &SpikeTrain,
    window: &TimeWindow,
) -> Result<usize> {
    let mut dropped = 0;
    for &t in train.times() {
        if !window.contains(t) {
            dropped += 1;
            continue;
        }
        let bin = edges.bin_of(t);
        counts[bin] = counts[bin]
            .checked_add(1)
            .ok_or(SpikeDensityError::CountOverflow {
                unit: train.unit(),
                bin,
            })?;
    }
    Ok(dropped)
}

/// Bin every unit at `bin_size_sec`, producing the full-resolution level.
pub fn bin_spike_trains(
    trains: &[SpikeTrain],
    window: &TimeWindow,
    bin_size_sec: f64,
) -> Result<ResolutionLevel> {
    if trains.is_empty() {
        return Err(SpikeDensityError::InvalidConfiguration(
            "at least one unit is required".to_string(),
        ));
    }
    let num_bins = num_bins_for(window, bin_size_sec)?;
    cell_count(num_bins, trains.len())?;
    log::info!("Number of bins: {num_bins}");

    let mut columns = Vec::with_capacity(trains.len());
    for train in trains {
        let (counts, dropped) = histogram(train, window, num_bins)?;
        if dropped > 0 {
            log::warn!(
                "Unit {}: dropped {dropped} spike times outside {window}",
                train.unit()
            );
        }
        columns.push(counts);
    }

    let matrix = CountMatrix::from_columns(num_bins, &columns)?;
    Ok(ResolutionLevel::full_resolution(
        bin_size_sec,
        window.start_time_sec,
        matrix,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train(unit: usize, times: &[f64]) -> SpikeTrain {
        SpikeTrain::new(unit, times.to_vec()).unwrap()
    }

    fn scenario() -> (Vec<SpikeTrain>, TimeWindow) {
        (
            vec![
                train(0, &[0.01, 0.02, 0.05]),
                train(1, &[]),
                train(2, &[0.1]),
            ],
            TimeWindow::new(0.0, 0.12).unwrap(),
        )
    }

    #[test]
    fn test_three_unit_scenario() {
        let (trains, window) = scenario();
        let level = bin_spike_trains(&trains, &window, 0.02).unwrap();
        let m = level.matrix();
        assert_eq!(m.num_bins(), 6);
        assert_eq!(m.num_units(), 3);
        assert_eq!(m.column(0), vec![1, 1, 0, 0, 1, 0]);
        assert_eq!(m.column(1), vec![0; 6]);
        assert_eq!(m.column(2), vec![0, 0, 0, 0, 0, 1]);
        assert_eq!(level.bin_size_sec(), 0.02);
        assert_eq!(level.start_time_sec(), 0.0);
        assert_eq!(level.downsample_factor(), 1);
    }

    #[test]
    fn test_end_time_counted_in_last_bin() {
        let window = TimeWindow::new(0.0, 1.0).unwrap();
        let (counts, dropped) = histogram(&train(0, &[1.0, 0.0]), &window, 4).unwrap();
        assert_eq!(counts, vec![1, 0, 0, 1]);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_inner_edges_go_to_upper_bin() {
        let window = TimeWindow::new(0.0, 1.0).unwrap();
        let (counts, _) = histogram(&train(0, &[0.25, 0.5, 0.75]), &window, 4).unwrap();
        assert_eq!(counts, vec![0, 1, 1, 1]);
    }

    #[test]
    fn test_out_of_window_dropped() {
        let window = TimeWindow::new(0.0, 1.0).unwrap();
        let (counts, dropped) =
            histogram(&train(0, &[-0.5, 0.5, 1.000001, 7.0]), &window, 2).unwrap();
        assert_eq!(counts, vec![0, 1]);
        assert_eq!(dropped, 3);
    }

    #[test]
    fn test_count_conservation() {
        let times: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.7919) % 13.0).collect();
        let window = TimeWindow::new(0.0, 13.0).unwrap();
        let trains = vec![train(0, &times), train(1, &times[..10])];
        let level = bin_spike_trains(&trains, &window, 0.05).unwrap();
        assert_eq!(level.num_bins(), 260);
        assert_eq!(level.matrix().column_sum(0), 1000);
        assert_eq!(level.matrix().column_sum(1), 10);
    }

    #[test]
    fn test_invalid_configuration() {
        let (trains, window) = scenario();
        assert!(matches!(
            bin_spike_trains(&trains, &window, 0.0),
            Err(SpikeDensityError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            bin_spike_trains(&trains, &window, -1.0),
            Err(SpikeDensityError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            bin_spike_trains(&[], &window, 0.02),
            Err(SpikeDensityError::InvalidConfiguration(_))
        ));
        // Bin wider than the whole window.
        assert!(matches!(
            bin_spike_trains(&trains, &window, 1.0),
            Err(SpikeDensityError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_huge_bin_count_is_an_error() {
        let window = TimeWindow::new(0.0, 1.0e6).unwrap();
        assert!(matches!(
            num_bins_for(&window, 1.0e-300),
            Err(SpikeDensityError::InvalidConfiguration(_))
        ));
        // Fits in usize but cannot be allocated.
        assert!(matches!(
            bin_spike_trains(&[train(0, &[0.5])], &window, 2.0e-13),
            Err(SpikeDensityError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_histogram_overflow_is_an_error() {
        let window = TimeWindow::new(0.0, 1.0).unwrap();
        let edges = Edges::new(&window, 2);
        let mut counts = vec![i32::MAX - 1, 0];
        assert!(matches!(
            accumulate(&mut counts, &edges, &train(4, &[0.1, 0.2]), &window),
            Err(SpikeDensityError::CountOverflow { unit: 4, bin: 0 })
        ));
    }
}
