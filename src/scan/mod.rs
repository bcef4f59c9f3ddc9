pub mod chunked;
pub mod materialize;
pub mod range;

pub use chunked::{scan, scan_first};
pub use materialize::{materialize, LogOutcome, Materialized};
pub use range::{plan, BlockRange};

#[cfg(test)]
pub(crate) mod fixtures;
