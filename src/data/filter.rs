use crate::error::{Result, SpikeDensityError};

use super::model::{SpikeTrain, TimeWindow, UnitSummary};

// ---------------------------------------------------------------------------
// Timestamp cleaning
// ---------------------------------------------------------------------------

/// Drop NaN / infinite timestamps from a unit's raw spike times.
///
/// Returns the retained timestamps and the number of dropped entries.
pub fn finite_spike_times(raw: impl IntoIterator<Item = f64>) -> (Vec<f64>, usize) {
    let mut dropped = 0;
    let kept = raw
        .into_iter()
        .filter(|t| {
            let ok = t.is_finite();
            if !ok {
                dropped += 1;
            }
            ok
        })
        .collect();
    (kept, dropped)
}

/// Build one [`SpikeTrain`] per unit from raw timestamp vectors, warning about
/// every unit that carried invalid entries.
pub fn clean_spike_trains(raw_units: Vec<Vec<f64>>) -> Result<Vec<SpikeTrain>> {
    raw_units
        .into_iter()
        .enumerate()
        .map(|(unit, raw)| {
            let (times, dropped) = finite_spike_times(raw);
            if dropped > 0 {
                log::warn!("Unit {unit}: removed {dropped} invalid spike times");
            }
            SpikeTrain::new(unit, times)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Window and diagnostics
// ---------------------------------------------------------------------------

/// Recording window: starts at the origin (0 s) and ends at the latest spike
/// across all units.
pub fn recording_window(trains: &[SpikeTrain]) -> Result<TimeWindow> {
    if trains.is_empty() {
        return Err(SpikeDensityError::InvalidConfiguration(
            "no units in source".to_string(),
        ));
    }
    let end = trains
        .iter()
        .filter_map(SpikeTrain::max_time)
        .reduce(f64::max)
        .ok_or_else(|| {
            SpikeDensityError::InvalidConfiguration("no spikes in any unit".to_string())
        })?;
    TimeWindow::new(0.0, end)
}

/// Per-unit spike counts and mean firing rates over the window.
pub fn unit_summaries(trains: &[SpikeTrain], window: &TimeWindow) -> Vec<UnitSummary> {
    let duration = window.duration_sec();
    trains
        .iter()
        .map(|st| UnitSummary {
            unit: st.unit(),
            num_spikes: st.len(),
            firing_rate_hz: st.len() as f64 / duration,
        })
        .collect()
}

pub fn total_spikes(trains: &[SpikeTrain]) -> usize {
    trains.iter().map(SpikeTrain::len).sum()
}
