use std::fmt;

/// Identity of the monitored process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub i32);

impl ProcessId {
    #[inline]
    pub fn as_raw(&self) -> i32 {
        self.0
    }
}

impl From<i32> for ProcessId {
    fn from(pid: i32) -> Self {
        ProcessId(pid)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A loaded module of the target process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Module name (e.g., "libil2cpp.so")
    pub name: String,
    /// Module base address
    pub base_address: u64,
    /// Mapped size in bytes, from base to the end of the last mapping
    pub size: u64,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>, base_address: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            base_address,
            size,
        }
    }

    pub fn end_address(&self) -> u64 {
        self.base_address.saturating_add(self.size)
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.base_address && address < self.end_address()
    }
}
