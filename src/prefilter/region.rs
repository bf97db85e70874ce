//! Address-space interval used by the prefilter.

use super::error::{PrefilterError, Result};
use std::cmp::Ordering;
use std::fmt;

/// A contiguous interval `[base, base + size)` in the target process.
///
/// Ordered by base address first, then by size, so a `BTreeSet<Region>`
/// iterates in address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    base: u64,
    size: u64,
}

impl Region {
    /// Create a region. `size` must be non-zero and the end must not overflow.
    pub fn new(base: u64, size: u64) -> Result<Self> {
        if size == 0 {
            return Err(PrefilterError::InvalidArgument(format!(
                "Region at 0x{:X} must have a positive size",
                base
            )));
        }
        if base.checked_add(size).is_none() {
            return Err(PrefilterError::InvalidArgument(format!(
                "Region 0x{:X}+0x{:X} overflows the address space",
                base, size
            )));
        }
        Ok(Self { base, size })
    }

    /// Create a region from `[start, end)`.
    pub fn from_bounds(start: u64, end: u64) -> Result<Self> {
        if end <= start {
            return Err(PrefilterError::InvalidArgument(format!(
                "Region bounds 0x{:X}..0x{:X} are empty or reversed",
                start, end
            )));
        }
        Self::new(start, end - start)
    }

    /// `[center - radius, center + radius)`, clamped to the address space.
    pub fn around(center: u64, radius: u64) -> Result<Self> {
        if radius == 0 {
            return Err(PrefilterError::InvalidArgument("Radius must be positive".to_string()));
        }
        let start = center.saturating_sub(radius);
        let end = center.saturating_add(radius);
        Self::from_bounds(start, end)
    }

    #[inline]
    pub fn base(&self) -> u64 {
        self.base
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Exclusive end address.
    #[inline]
    pub fn end(&self) -> u64 {
        self.base + self.size
    }

    #[inline]
    pub fn contains(&self, address: u64) -> bool {
        address >= self.base && address < self.end()
    }

    /// True if the two intervals share at least one byte.
    #[inline]
    pub fn overlaps(&self, other: &Region) -> bool {
        self.base < other.end() && other.base < self.end()
    }

    /// True if the intervals overlap or sit back to back.
    #[inline]
    pub fn touches(&self, other: &Region) -> bool {
        self.base <= other.end() && other.base <= self.end()
    }

    /// Smallest region covering both. Only meaningful when `touches` holds.
    pub fn union(&self, other: &Region) -> Region {
        let base = self.base.min(other.base);
        let end = self.end().max(other.end());
        Region { base, size: end - base }
    }

    pub fn as_range(&self) -> (u64, u64) {
        (self.base, self.end())
    }
}

impl PartialOrd for Region {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Region {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base.cmp(&other.base).then(self.size.cmp(&other.size))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}-0x{:X} ({} bytes)", self.base, self.end(), self.size)
    }
}
