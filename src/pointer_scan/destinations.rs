//! Pointer destinations discovered by the tracer.

use super::PointerSource;
use dashmap::DashSet;

/// Deduplicated, concurrently writable set of pointer targets.
///
/// The tracer records into it from any thread, the prefilter samples it once
/// per tick.
#[derive(Debug, Default)]
pub struct PointerDestinations {
    addresses: DashSet<u64>,
}

impl PointerDestinations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the address was already known.
    pub fn record(&self, address: u64) -> bool {
        self.addresses.insert(address)
    }

    pub fn record_batch<I: IntoIterator<Item = u64>>(&self, addresses: I) -> usize {
        addresses.into_iter().filter(|&address| self.record(address)).count()
    }

    pub fn contains(&self, address: u64) -> bool {
        self.addresses.contains(&address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Drop all destinations, e.g. when the traced process changes.
    pub fn clear(&self) {
        self.addresses.clear();
    }

    /// Point-in-time copy of the set, unordered.
    pub fn sample(&self) -> Vec<u64> {
        self.addresses.iter().map(|address| *address).collect()
    }
}

impl PointerSource for PointerDestinations {
    fn found_pointer_destinations(&self) -> anyhow::Result<Vec<u64>> {
        Ok(self.sample())
    }
}
