/// Data layer: spike-train types, loading, and cleaning.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv units table
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → raw per-unit timestamps
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  drop NaN → Vec<SpikeTrain>, window, diagnostics
///   └──────────┘
///        │
///        ▼
///   pyramid::binner
/// ```

pub mod filter;
pub mod loader;
pub mod model;
