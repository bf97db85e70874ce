//! Shallow pointer prefilter engine.
//!
//! Keeps a growth-only `RegionSet` of memory worth deep-scanning. Every tick
//! it adds one region per loaded module of the selected process and a
//! `[d - radius, d + radius)` window around every pointer destination the
//! tracer has found so far.
//!
//! The current set is published as an `Arc<RegionSet>`: a tick builds the next
//! set off to the side and swaps it in under a short write lock, readers only
//! clone the `Arc`. A process change bumps a generation counter, a tick that
//! started before the change drops its candidates instead of publishing them.
//! Ticks may overlap (`tick_now` next to the background loop); a tick whose
//! snapshot went stale re-merges its candidates into the newer set.

use super::config::PrefilterConfig;
use super::error::{PrefilterError, Result};
use super::region::Region;
use super::region_set::RegionSet;
use super::task::{RepeatingTask, TaskProgress, TaskState, TickControl};
use crate::pointer_scan::PointerSource;
use crate::process::{ModuleSource, ProcessId, ProcessListener};
use log::{debug, error, info, log_enabled, warn, Level};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::runtime::Handle;

static INSTANCE: OnceCell<Arc<PrefilterEngine>> = OnceCell::new();

/// Install the process-wide engine. Fails if one is already installed.
pub fn install_global(engine: Arc<PrefilterEngine>) -> Result<&'static Arc<PrefilterEngine>> {
    INSTANCE
        .try_insert(engine)
        .map_err(|_| PrefilterError::AlreadyInitialized)
}

/// The engine installed by `install_global`, if any.
pub fn instance() -> Option<&'static Arc<PrefilterEngine>> {
    INSTANCE.get()
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub module_count: usize,
    pub destination_count: usize,
    /// Regions not previously present.
    pub added: usize,
    /// Size of the published set after the tick.
    pub region_count: usize,
    /// A process change raced the tick and its candidates were dropped.
    pub discarded: bool,
}

struct RegionState {
    generation: u64,
    target: Option<ProcessId>,
    regions: Arc<RegionSet>,
}

struct PrefilterCore {
    radius: u64,
    modules: Arc<dyn ModuleSource>,
    pointers: Arc<dyn PointerSource>,
    state: RwLock<RegionState>,
    progress: Arc<TaskProgress>,
}

impl PrefilterCore {
    fn read_state(&self, op: &'static str) -> Result<RwLockReadGuard<'_, RegionState>> {
        self.state
            .read()
            .map_err(|_| PrefilterError::ConcurrentAccessViolation(op))
    }

    fn write_state(&self, op: &'static str) -> Result<RwLockWriteGuard<'_, RegionState>> {
        self.state
            .write()
            .map_err(|_| PrefilterError::ConcurrentAccessViolation(op))
    }

    fn current(&self) -> Arc<RegionSet> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&state.regions)
    }

    fn module_regions(&self, pid: ProcessId) -> (usize, Vec<Region>) {
        let modules = match self.modules.list_modules(pid) {
            Ok(modules) => modules,
            Err(e) => {
                warn!("{}", PrefilterError::collaborator("Module source", &e));
                return (0, Vec::new());
            },
        };

        let regions = modules
            .iter()
            .filter_map(|module| match Region::new(module.base_address, module.size) {
                Ok(region) => Some(region),
                Err(e) => {
                    debug!("Skipping module {}: {}", module.name, e);
                    None
                },
            })
            .collect();
        (modules.len(), regions)
    }

    fn pointer_regions(&self) -> (usize, Vec<Region>) {
        let destinations = match self.pointers.found_pointer_destinations() {
            Ok(destinations) => destinations,
            Err(e) => {
                warn!("{}", PrefilterError::collaborator("Pointer source", &e));
                return (0, Vec::new());
            },
        };

        let radius = self.radius;
        let regions = destinations
            .par_iter()
            .filter_map(|&destination| Region::around(destination, radius).ok())
            .collect();
        (destinations.len(), regions)
    }

    fn tick(&self) -> Result<TickReport> {
        let (generation, target, base) = {
            let state = self.read_state("tick snapshot")?;
            (state.generation, state.target, Arc::clone(&state.regions))
        };

        // Collaborators may block; no lock is held while they run.
        let (module_count, module_regions) = match target {
            Some(pid) => self.module_regions(pid),
            None => (0, Vec::new()),
        };
        let (destination_count, pointer_regions) = self.pointer_regions();

        let mut candidates: Vec<Region> = module_regions
            .into_iter()
            .chain(pointer_regions)
            .filter(|region| !base.contains_region(region))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        let next = if candidates.is_empty() {
            None
        } else {
            let mut next = RegionSet::clone(&base);
            next.add_regions(candidates.iter().copied());
            Some(Arc::new(next))
        };

        let mut report = TickReport {
            module_count,
            destination_count,
            ..TickReport::default()
        };

        {
            let mut state = self.write_state("tick publish")?;
            if state.generation != generation {
                report.discarded = true;
                report.region_count = state.regions.region_count();
                return Ok(report);
            }
            if let Some(next) = next {
                if Arc::ptr_eq(&state.regions, &base) {
                    state.regions = next;
                    report.added = candidates.len();
                } else {
                    // Another tick published since our snapshot, merge on top of it.
                    let mut merged = RegionSet::clone(&state.regions);
                    report.added = merged.add_regions(candidates.iter().copied());
                    if report.added > 0 {
                        state.regions = Arc::new(merged);
                    }
                }
            }
            report.region_count = state.regions.region_count();
        }

        self.progress.advance(report.region_count as u64);
        Ok(report)
    }

    fn reset(&self, pid: ProcessId) -> Option<Arc<RegionSet>> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        state.target = Some(pid);
        if state.regions.is_empty() {
            None
        } else {
            Some(std::mem::replace(&mut state.regions, Arc::new(RegionSet::new())))
        }
    }
}

/// Continuously refreshed index of memory regions worth deep-scanning.
pub struct PrefilterEngine {
    config: PrefilterConfig,
    core: Arc<PrefilterCore>,
    task: RepeatingTask,
}

impl PrefilterEngine {
    /// Create an idle engine. Ticks will run on `runtime` once started.
    pub fn new(
        config: PrefilterConfig,
        modules: Arc<dyn ModuleSource>,
        pointers: Arc<dyn PointerSource>,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;

        let task = RepeatingTask::new("PointerPrefilter", config.interval(), runtime);
        let core = Arc::new(PrefilterCore {
            radius: config.radius,
            modules,
            pointers,
            state: RwLock::new(RegionState {
                generation: 0,
                target: None,
                regions: Arc::new(RegionSet::new()),
            }),
            progress: Arc::clone(task.progress()),
        });

        Ok(Self { config, core, task })
    }

    pub fn config(&self) -> &PrefilterConfig {
        &self.config
    }

    /// Start the periodic tick. No-op while already running.
    pub fn begin_prefilter(&self) {
        let core = Arc::clone(&self.core);
        let started = self.task.start(move || match core.tick() {
            Ok(report) => {
                if log_enabled!(Level::Debug) {
                    debug!(
                        "Prefilter tick: modules={}, destinations={}, added={}, total={}, discarded={}",
                        report.module_count,
                        report.destination_count,
                        report.added,
                        report.region_count,
                        report.discarded
                    );
                }
                TickControl::Continue
            },
            Err(e) => {
                error!("Prefilter tick failed: {}", e);
                if e.is_recoverable() {
                    TickControl::Continue
                } else {
                    TickControl::Stop
                }
            },
        });

        if !started && log_enabled!(Level::Debug) {
            debug!("Prefilter already running");
        }
    }

    /// Run one tick on the calling thread, outside the periodic schedule.
    pub fn tick_now(&self) -> Result<TickReport> {
        self.core.tick()
    }

    /// Request a stop. The in-flight tick still completes.
    pub fn stop(&self) {
        self.task.stop();
    }

    pub async fn stop_and_wait(&self) {
        self.task.stop_and_wait().await;
    }

    /// Deep copy of the current region set.
    pub fn prefiltered_snapshot(&self) -> RegionSet {
        RegionSet::clone(&self.core.current())
    }

    /// The current region set as an immutable shared handle.
    pub fn shared_snapshot(&self) -> Arc<RegionSet> {
        self.core.current()
    }

    /// Switch to a new target process, discarding regions of the previous one.
    pub fn update(&self, pid: ProcessId) {
        if let Some(discarded) = self.core.reset(pid) {
            info!(
                "Target process changed to {}, cleared {} prefiltered regions ({} bytes)",
                pid,
                discarded.region_count(),
                discarded.byte_count()
            );
        }
    }

    pub fn target(&self) -> Option<ProcessId> {
        self.core
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .target
    }

    pub fn state(&self) -> TaskState {
        self.task.state()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    pub fn is_complete(&self) -> bool {
        self.core.progress.is_complete()
    }

    /// Highest region count published so far. Not a completion fraction.
    pub fn progress(&self) -> u64 {
        self.core.progress.progress()
    }

    /// Ticks completed by the background worker.
    pub fn ticks(&self) -> u64 {
        self.core.progress.ticks()
    }
}

impl ProcessListener for PrefilterEngine {
    fn on_process_changed(&self, pid: ProcessId) {
        self.update(pid);
    }
}
