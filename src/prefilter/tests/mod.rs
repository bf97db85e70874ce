//! Engine-level scenario and stress tests.

mod stress_tests;

use crate::pointer_scan::PointerSource;
use crate::prefilter::{PrefilterConfig, PrefilterEngine};
use crate::process::{ModuleInfo, ModuleSource, ProcessId};
use anyhow::anyhow;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::{Handle, Runtime};

/// Module source whose answer and failure mode can be changed mid-test.
#[derive(Default)]
pub(super) struct MockModules {
    modules: Mutex<Vec<ModuleInfo>>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl MockModules {
    pub fn with(modules: Vec<ModuleInfo>) -> Arc<Self> {
        Arc::new(Self {
            modules: Mutex::new(modules),
            ..Default::default()
        })
    }

    pub fn set_modules(&self, modules: Vec<ModuleInfo>) {
        *self.modules.lock().unwrap() = modules;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModuleSource for MockModules {
    fn list_modules(&self, _pid: ProcessId) -> anyhow::Result<Vec<ModuleInfo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("maps unreadable"));
        }
        Ok(self.modules.lock().unwrap().clone())
    }
}

pub(super) struct FailingPointers;

impl PointerSource for FailingPointers {
    fn found_pointer_destinations(&self) -> anyhow::Result<Vec<u64>> {
        Err(anyhow!("tracer offline"))
    }
}

pub(super) fn fast_config() -> PrefilterConfig {
    PrefilterConfig {
        interval_ms: 20,
        ..PrefilterConfig::default()
    }
}

pub(super) fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

pub(super) fn engine_on(
    handle: Handle,
    modules: Arc<dyn ModuleSource>,
    pointers: Arc<dyn PointerSource>,
) -> Arc<PrefilterEngine> {
    Arc::new(PrefilterEngine::new(fast_config(), modules, pointers, handle).unwrap())
}
