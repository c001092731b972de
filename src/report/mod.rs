//! Admin reporting: one filter model shared by the JSON listing and the CSV
//! export, plus aggregate counts.

pub mod csv;
pub mod filter;
pub mod stats;

pub use csv::format_csv;
pub use filter::{FilterParams, FilterResponse};
pub use stats::Statistics;
