//! Pointer Scan Collaborators
//!
//! The pointer tracer lives elsewhere. This module holds the seam the
//! prefilter samples it through:
//!
//! - `PointerSource`: anything that can report discovered pointer targets
//! - `destinations`: a concurrent deduplicated set the tracer records into

pub mod destinations;

pub use destinations::PointerDestinations;

/// Reports the pointer destinations discovered so far.
///
/// Addresses are deduplicated; order carries no meaning.
pub trait PointerSource: Send + Sync {
    fn found_pointer_destinations(&self) -> anyhow::Result<Vec<u64>>;
}

/// No tracer attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPointers;

impl PointerSource for NoPointers {
    fn found_pointer_destinations(&self) -> anyhow::Result<Vec<u64>> {
        Ok(Vec::new())
    }
}
