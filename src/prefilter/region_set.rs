//! Region collection held by the prefilter.

use super::region::Region;
use std::collections::BTreeSet;
use std::fmt;

/// Growth-only collection of regions with aggregate counters.
///
/// Exact duplicates are absorbed on insert, distinct overlapping regions are
/// kept. Between resets `region_count` and `byte_count` never decrease.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSet {
    regions: BTreeSet<Region>,
    byte_count: u64,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk insert. Returns the number of regions that were not already present.
    pub fn add_regions<I>(&mut self, regions: I) -> usize
    where
        I: IntoIterator<Item = Region>,
    {
        let mut added = 0;
        for region in regions {
            if self.regions.insert(region) {
                self.byte_count = self.byte_count.saturating_add(region.size());
                added += 1;
            }
        }
        added
    }

    pub fn add_region(&mut self, region: Region) -> bool {
        self.add_regions(std::iter::once(region)) == 1
    }

    #[inline]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Sum of member sizes; overlapping members are counted once each.
    #[inline]
    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn contains_region(&self, region: &Region) -> bool {
        self.regions.contains(region)
    }

    pub fn contains_address(&self, address: u64) -> bool {
        self.regions
            .iter()
            .take_while(|region| region.base() <= address)
            .any(|region| region.contains(address))
    }

    /// Sorted union of all members, joining overlapping and touching intervals.
    pub fn coalesced(&self) -> Vec<Region> {
        let mut merged: Vec<Region> = Vec::with_capacity(self.regions.len());
        for region in &self.regions {
            match merged.last_mut() {
                Some(last) if last.touches(region) => *last = last.union(region),
                _ => merged.push(*region),
            }
        }
        merged
    }

    /// Bytes covered by the union of all members.
    pub fn covered_bytes(&self) -> u64 {
        self.coalesced().iter().map(Region::size).sum()
    }

    /// Coalesced `(start, end)` pairs for feeding a deep scan.
    pub fn to_ranges(&self) -> Vec<(u64, u64)> {
        self.coalesced().iter().map(Region::as_range).collect()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
        self.byte_count = 0;
    }
}

impl Extend<Region> for RegionSet {
    fn extend<T: IntoIterator<Item = Region>>(&mut self, iter: T) {
        self.add_regions(iter);
    }
}

impl FromIterator<Region> for RegionSet {
    fn from_iter<T: IntoIterator<Item = Region>>(iter: T) -> Self {
        let mut set = RegionSet::new();
        set.add_regions(iter);
        set
    }
}

impl fmt::Display for RegionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} regions, {} bytes ({} bytes covered)",
            self.region_count(),
            self.byte_count(),
            self.covered_bytes()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(base: u64, size: u64) -> Region {
        Region::new(base, size).unwrap()
    }

    #[test]
    fn test_counts_track_inserts() {
        let mut set = RegionSet::new();
        assert!(set.is_empty());

        let added = set.add_regions([region(0x1000, 0x200), region(0x4000, 0x1000)]);
        assert_eq!(added, 2);
        assert_eq!(set.region_count(), 2);
        assert_eq!(set.byte_count(), 0x1200);
    }

    #[test]
    fn test_exact_duplicates_absorbed() {
        let mut set = RegionSet::new();
        set.add_regions([region(0x1000, 0x200)]);
        let added = set.add_regions([region(0x1000, 0x200), region(0x1000, 0x300)]);

        assert_eq!(added, 1);
        assert_eq!(set.region_count(), 2);
        assert_eq!(set.byte_count(), 0x500);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut set = RegionSet::new();
        set.add_region(region(0x1000, 0x200));
        let copy = set.clone();

        set.add_region(region(0x9000, 0x10));
        assert_eq!(copy.region_count(), 1);
        assert_eq!(copy.byte_count(), 0x200);
        assert_eq!(set.region_count(), 2);
    }

    #[test]
    fn test_coalesce_joins_overlap_and_adjacent() {
        let set: RegionSet = [
            region(0x1000, 0x100),
            region(0x1080, 0x100),
            region(0x1180, 0x80),
            region(0x3000, 0x10),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.to_ranges(), vec![(0x1000, 0x1200), (0x3000, 0x3010)]);
        assert_eq!(set.covered_bytes(), 0x210);
        assert_eq!(set.byte_count(), 0x290);
    }

    #[test]
    fn test_contains_address() {
        let set: RegionSet = [region(0x1000, 0x1000), region(0x1800, 0x10)].into_iter().collect();
        assert!(set.contains_address(0x1000));
        assert!(set.contains_address(0x1FFF));
        assert!(set.contains_address(0x1805));
        assert!(!set.contains_address(0x2000));
        assert!(!set.contains_address(0xFFF));
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut set: RegionSet = [region(0x1000, 0x10)].into_iter().collect();
        set.clear();
        assert_eq!(set.region_count(), 0);
        assert_eq!(set.byte_count(), 0);
    }
}
