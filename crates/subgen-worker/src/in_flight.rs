//! Bookkeeping for stream entries this worker still owns.
//!
//! An entry is held from the moment its job starts until it is acked. Held
//! entries are skipped when reclaiming pending work and are kept fresh by the
//! executor's heartbeat, so a long clip is never handed to a second run.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Held {
    running: HashSet<String>,
    unacked: HashSet<String>,
}

/// Entries whose jobs are running or finished without a successful ack.
#[derive(Debug, Clone, Default)]
pub struct InFlightJobs {
    inner: Arc<Mutex<Held>>,
}

impl InFlightJobs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Held> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a job for `message_id`, or `None` when this worker already holds it.
    pub fn start(&self, message_id: &str) -> Option<InFlightGuard> {
        let mut held = self.lock();
        if held.unacked.contains(message_id) || !held.running.insert(message_id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            jobs: self.clone(),
            message_id: message_id.to_string(),
        })
    }

    /// Keep holding an entry whose job finished but could not be acked.
    pub fn mark_unacked(&self, message_id: &str) {
        self.lock().unacked.insert(message_id.to_string());
    }

    /// Release an entry once its ack went through.
    pub fn acked(&self, message_id: &str) {
        self.lock().unacked.remove(message_id);
    }

    pub fn unacked(&self) -> Vec<String> {
        self.lock().unacked.iter().cloned().collect()
    }

    /// Every entry this worker holds.
    pub fn held(&self) -> HashSet<String> {
        let held = self.lock();
        held.running.union(&held.unacked).cloned().collect()
    }
}

/// Marks a job as running until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    jobs: InFlightJobs,
    message_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.jobs.lock().running.remove(&self.message_id);
    }
}
