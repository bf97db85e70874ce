//! Selected-process tracking.

use super::types::ProcessId;
use log::{info, warn};
use std::sync::{Arc, RwLock};

/// Receives process-change events.
pub trait ProcessListener: Send + Sync {
    fn on_process_changed(&self, pid: ProcessId);
}

/// Holds the currently selected process and notifies listeners when it changes.
pub struct ProcessSelection {
    bound_pid: RwLock<Option<ProcessId>>,
    listeners: RwLock<Vec<Arc<dyn ProcessListener>>>,
}

impl ProcessSelection {
    pub fn new() -> Self {
        Self {
            bound_pid: RwLock::new(None),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn ProcessListener>) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(listener),
            Err(_) => warn!("ProcessSelection listener list poisoned, subscription dropped"),
        }
    }

    /// Select a process. Listeners run only if the pid actually changed.
    pub fn bind_process(&self, pid: ProcessId) -> bool {
        {
            let Ok(mut bound) = self.bound_pid.write() else {
                warn!("ProcessSelection state poisoned, bind to {} ignored", pid);
                return false;
            };
            if *bound == Some(pid) {
                return false;
            }
            *bound = Some(pid);
        }

        info!("Selected process {}", pid);
        self.notify(pid);
        true
    }

    /// Forget the current selection without notifying.
    pub fn unbind_process(&self) {
        if let Ok(mut bound) = self.bound_pid.write() {
            *bound = None;
        }
    }

    pub fn is_process_bound(&self) -> bool {
        self.bound_pid().is_some()
    }

    pub fn bound_pid(&self) -> Option<ProcessId> {
        self.bound_pid.read().ok().and_then(|pid| *pid)
    }

    fn notify(&self, pid: ProcessId) {
        // Snapshot so listeners may subscribe or bind without deadlocking.
        let listeners: Vec<_> = match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(_) => return,
        };
        for listener in listeners {
            listener.on_process_changed(pid);
        }
    }
}

impl Default for ProcessSelection {
    fn default() -> Self {
        Self::new()
    }
}
