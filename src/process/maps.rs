//! Module enumeration from `/proc/<pid>/maps`.

use super::types::{ModuleInfo, ProcessId};
use super::ModuleSource;
use anyhow::{anyhow, Context, Result};
use log::{debug, log_enabled, Level};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;

/// Reads modules from procfs, folding consecutive file-backed mappings of the
/// same path into one module.
#[derive(Debug, Clone)]
pub struct ProcMapsModuleSource {
    proc_root: PathBuf,
}

impl ProcMapsModuleSource {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// Use another procfs mount point.
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }
}

impl Default for ProcMapsModuleSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleSource for ProcMapsModuleSource {
    fn list_modules(&self, pid: ProcessId) -> Result<Vec<ModuleInfo>> {
        let maps_path = self.proc_root.join(pid.to_string()).join("maps");
        let content = match std::fs::read_to_string(&maps_path) {
            Ok(content) => content,
            Err(e) => {
                // pid <= 0 would address a process group, not one process.
                if pid.as_raw() > 0 && kill(Pid::from_raw(pid.as_raw()), None::<Signal>).is_err() {
                    return Err(anyhow!("Process {} is not alive", pid));
                }
                return Err(e).with_context(|| format!("Failed to read {}", maps_path.display()));
            },
        };

        let modules = parse_modules(&content)?;
        if log_enabled!(Level::Debug) {
            debug!("Process {}: {} modules from {}", pid, modules.len(), maps_path.display());
        }
        Ok(modules)
    }
}

/// One line of a maps file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MapsEntry<'a> {
    start: u64,
    end: u64,
    path: Option<&'a str>,
}

fn parse_line(line: &str) -> Result<MapsEntry<'_>> {
    // range, perms, offset, dev, inode, then the path which may contain spaces
    let mut fields = line.trim_start().splitn(6, char::is_whitespace);
    let range = fields.next().filter(|f| !f.is_empty()).ok_or_else(|| anyhow!("Empty maps line"))?;
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| anyhow!("Malformed address range: {}", range))?;
    let start = u64::from_str_radix(start, 16).with_context(|| format!("Bad start address in: {}", line))?;
    let end = u64::from_str_radix(end, 16).with_context(|| format!("Bad end address in: {}", line))?;

    for name in ["perms", "offset", "dev", "inode"] {
        fields
            .next()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| anyhow!("Missing {} field in: {}", name, line))?;
    }
    let path = fields.next().map(str::trim).filter(|p| !p.is_empty());
    Ok(MapsEntry { start, end, path })
}

/// Build the module list from maps content.
pub fn parse_modules(content: &str) -> Result<Vec<ModuleInfo>> {
    let mut modules: Vec<ModuleInfo> = Vec::new();
    let mut current: Option<(&str, u64, u64)> = None;

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let entry = parse_line(line)?;
        if entry.end <= entry.start {
            continue;
        }

        // Only file-backed mappings count as modules, "[heap]" and anonymous ones don't.
        let Some(path) = entry.path.filter(|p| p.starts_with('/')) else {
            continue;
        };

        match current {
            Some((name, base, end)) if name == path && entry.start >= end => {
                current = Some((name, base, entry.end));
            },
            _ => {
                if let Some((name, base, end)) = current.take() {
                    modules.push(ModuleInfo::new(name, base, end - base));
                }
                current = Some((path, entry.start, entry.end));
            },
        }
    }

    if let Some((name, base, end)) = current {
        modules.push(ModuleInfo::new(name, base, end - base));
    }

    Ok(modules)
}
