//! Shallow Pointer Prefilter
//!
//! A cheap, continuously refreshed index of memory regions that a deep scan
//! should look at first.
//!
//! # Architecture
//!
//! - `region`: `[base, base + size)` interval value type
//! - `region_set`: growth-only region collection with aggregate counters
//! - `task`: start/stop lifecycle of a fixed-interval background task
//! - `engine`: the prefilter itself, plus the optional process-wide handle
//! - `config`: interval and radius tuning
//!
//! # Usage
//!
//! ```ignore
//! use mamu_prefilter::prefilter::{PrefilterConfig, PrefilterEngine};
//!
//! let engine = Arc::new(PrefilterEngine::new(
//!     PrefilterConfig::default(),
//!     Arc::new(ProcMapsModuleSource::new()),
//!     destinations.clone(),
//!     runtime.handle().clone(),
//! )?);
//! selection.subscribe(engine.clone());
//! engine.begin_prefilter();
//!
//! // Narrow a deep scan
//! let ranges = engine.shared_snapshot().to_ranges();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod region;
pub mod region_set;
pub mod task;

#[cfg(test)]
mod tests;

pub use config::{PrefilterConfig, DEFAULT_INTERVAL_MS, DEFAULT_RADIUS};
pub use engine::{install_global, instance, PrefilterEngine, TickReport};
pub use error::{PrefilterError, Result};
pub use region::Region;
pub use region_set::RegionSet;
pub use task::{RepeatingTask, TaskProgress, TaskState, TickControl};
