//! # mamu_prefilter
//!
//! Shallow pointer prefilter for the memory scanner.
//!
//! This crate provides:
//! - Region and region-set types describing target address space
//! - A background engine that keeps a growth-only set of regions worth
//!   deep-scanning: loaded modules plus a window around every known pointer
//!   destination
//! - Process and pointer-tracer collaborator seams, with procfs and
//!   in-memory implementations
//! - Log backend setup

pub mod logging;
pub mod pointer_scan;
pub mod prefilter;
pub mod process;

pub use logging::init_logging;
pub use pointer_scan::{NoPointers, PointerDestinations, PointerSource};
pub use prefilter::{
    install_global, instance, PrefilterConfig, PrefilterEngine, PrefilterError, Region, RegionSet,
    TaskState, TickReport,
};
pub use process::{
    ModuleInfo, ModuleSource, ProcMapsModuleSource, ProcessId, ProcessListener, ProcessSelection,
    StaticModuleSource,
};
