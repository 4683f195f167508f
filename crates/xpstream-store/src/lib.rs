//! File persistence for xpstream lifetime stats.
//!
//! Totals are stored as one JSON object mapping recipient ID strings to
//! their totals:
//!
//! ```json
//! {
//!   "0b6f3c1e-8a2d-4f5b-9c7e-1d2a3b4c5d6e": 1520
//! }
//! ```
//!
//! Writes go to a sibling temporary file that is then renamed over the
//! target, so a crash mid-save leaves the previous file intact.
//!
//! # Modules
//!
//! - [`stats_file`] -- [`StatsFile`] load/save and the [`StatsSink`] impl
//! - [`error`] -- [`StoreError`]
//!
//! [`StatsSink`]: xpstream_core::maintenance::StatsSink

pub mod error;
pub mod stats_file;

pub use error::StoreError;
pub use stats_file::StatsFile;
