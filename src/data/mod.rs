/// Data layer: records, loading, reshaping, filtering and derived metrics.
///
/// Architecture:
/// ```text
///  .csv / .parquet        remote .csv / TopoJSON
///        │                        │
///        ▼                        ▼
///   ┌──────────┐            ┌──────────┐
///   │  loader   │            │   geo     │  arcs → Feature polygons
///   └──────────┘            └──────────┘
///        │  Table { Vec<Record> }
///        ▼
///   ┌──────────┐
///   │ reshape   │  wide ⇄ long
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐     ┌──────────┐
///   │  filter   │ ──▶ │  derive   │  % change per entity, paired
///   └──────────┘     └──────────┘  through join
///        │
///        ▼
///     stats      bins, regression, normalised stacks
/// ```

pub mod datasets;
pub mod derive;
pub mod filter;
pub mod geo;
pub mod join;
pub mod loader;
pub mod model;
pub mod reshape;
pub mod stats;
