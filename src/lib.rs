//! Multi-resolution spike-count pyramids.
//!
//! Per-unit spike timestamps are binned into a `(num_bins × num_units)` count
//! matrix, then repeatedly coarsened by merging 3 adjacent bins until a level
//! has at most 10,000 bins.  Every level shares the recording origin, so a
//! viewer can draw spike density over any span by picking the level whose bin
//! width suits the zoom.
//!
//! ```rust
//! use spike_density::data::model::{SpikeTrain, TimeWindow};
//! use spike_density::pyramid::build_series;
//!
//! let trains = vec![
//!     SpikeTrain::new(0, vec![0.01, 0.02, 0.05]).unwrap(),
//!     SpikeTrain::new(1, vec![]).unwrap(),
//!     SpikeTrain::new(2, vec![0.1]).unwrap(),
//! ];
//! let window = TimeWindow::new(0.0, 0.12).unwrap();
//! let series = build_series(&trains, &window, 0.02, 3).unwrap();
//!
//! assert_eq!(series.len(), 2);
//! assert_eq!(series.levels()[1].matrix().column(0), vec![2, 1]);
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod pyramid;
pub mod store;

pub use error::{Result, SpikeDensityError};
