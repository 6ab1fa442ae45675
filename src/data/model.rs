use std::fmt;

use crate::error::{Result, SpikeDensityError};

// ---------------------------------------------------------------------------
// SpikeTrain – the spike timestamps of one unit
// ---------------------------------------------------------------------------

/// Spike timestamps (seconds) of a single unit.
///
/// Invalid entries (NaN, ±inf) are removed by the loader before construction,
/// so every stored timestamp is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeTrain {
    unit: usize,
    times: Vec<f64>,
}

impl SpikeTrain {
    /// Build a spike train from already-cleaned timestamps.
    ///
    /// Returns `InvalidConfiguration` if a non-finite timestamp slipped through.
    pub fn new(unit: usize, times: Vec<f64>) -> Result<Self> {
        if let Some(t) = times.iter().find(|t| !t.is_finite()) {
            return Err(SpikeDensityError::InvalidConfiguration(format!(
                "unit {unit}: non-finite spike time {t}"
            )));
        }
        Ok(SpikeTrain { unit, times })
    }

    /// Index of the unit in the source units table.
    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Latest spike of the train, if any.
    pub fn max_time(&self) -> Option<f64> {
        self.times.iter().copied().reduce(f64::max)
    }
}

// ---------------------------------------------------------------------------
// TimeWindow – the span covered by every resolution level
// ---------------------------------------------------------------------------

/// Half-open recording window `[start_time_sec, end_time_sec)`; the final
/// edge is inclusive when binning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start_time_sec: f64,
    pub end_time_sec: f64,
}

impl TimeWindow {
    pub fn new(start_time_sec: f64, end_time_sec: f64) -> Result<Self> {
        if !start_time_sec.is_finite() || !end_time_sec.is_finite() {
            return Err(SpikeDensityError::InvalidConfiguration(format!(
                "non-finite time window [{start_time_sec}, {end_time_sec}]"
            )));
        }
        if end_time_sec <= start_time_sec {
            return Err(SpikeDensityError::InvalidConfiguration(format!(
                "end time {end_time_sec} must be after start time {start_time_sec}"
            )));
        }
        Ok(TimeWindow {
            start_time_sec,
            end_time_sec,
        })
    }

    pub fn duration_sec(&self) -> f64 {
        self.end_time_sec - self.start_time_sec
    }

    /// Whether `t` lies inside the window, both edges inclusive.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time_sec && t <= self.end_time_sec
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}] s", self.start_time_sec, self.end_time_sec)
    }
}

// ---------------------------------------------------------------------------
// UnitSummary – diagnostics only, never fed back into binning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct UnitSummary {
    pub unit: usize,
    pub num_spikes: usize,
    pub firing_rate_hz: f64,
}

impl fmt::Display for UnitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unit {}: {} spikes, {:.2} Hz",
            self.unit, self.num_spikes, self.firing_rate_hz
        )
    }
}
