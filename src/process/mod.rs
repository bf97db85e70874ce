//! Target process collaborators.
//!
//! - `types`: process identity and loaded module metadata
//! - `maps`: Linux/Android `/proc/<pid>/maps` module enumeration
//! - `selection`: tracks the selected process and broadcasts changes

pub mod maps;
pub mod selection;
pub mod types;

pub use maps::ProcMapsModuleSource;
pub use selection::{ProcessListener, ProcessSelection};
pub use types::{ModuleInfo, ProcessId};

/// Enumerates the loaded modules of a process.
///
/// Implementations may block. An empty list is a valid answer.
pub trait ModuleSource: Send + Sync {
    fn list_modules(&self, pid: ProcessId) -> anyhow::Result<Vec<ModuleInfo>>;
}

/// Fixed module list, independent of the pid asked for.
#[derive(Debug, Clone, Default)]
pub struct StaticModuleSource {
    modules: Vec<ModuleInfo>,
}

impl StaticModuleSource {
    pub fn new(modules: Vec<ModuleInfo>) -> Self {
        Self { modules }
    }
}

impl ModuleSource for StaticModuleSource {
    fn list_modules(&self, _pid: ProcessId) -> anyhow::Result<Vec<ModuleInfo>> {
        Ok(self.modules.clone())
    }
}
