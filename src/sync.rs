use crate::models::EnrichedRecord;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Issued to a refresh when it starts. Results are only installed while no
/// newer refresh has installed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket {
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct WorkingSet {
    /// Generation that produced this set; 0 before the first refresh.
    pub generation: u64,
    pub records: Vec<EnrichedRecord>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct RefreshState {
    issued: u64,
    installed: u64,
    current: Arc<WorkingSet>,
}

pub type SharedRefreshState = Arc<Mutex<RefreshState>>;

/// A panicked holder cannot leave a half-swapped `Arc` behind, so poisoning
/// is ignored.
pub fn lock(state: &SharedRefreshState) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RefreshState {
    pub fn shared() -> SharedRefreshState {
        Arc::new(Mutex::new(Self::default()))
    }

    /// Seed from persisted data without consuming a generation, so any
    /// refresh started afterwards still wins.
    pub fn hydrate(&mut self, records: Vec<EnrichedRecord>) {
        if self.installed == 0 {
            self.current = Arc::new(WorkingSet {
                generation: 0,
                records,
                refreshed_at: None,
            });
        }
    }

    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        Ticket {
            generation: self.issued,
        }
    }

    /// Swap in a new working set. Returns false and drops `records` when a
    /// refresh started later has already installed.
    pub fn install(
        &mut self,
        ticket: Ticket,
        records: Vec<EnrichedRecord>,
        now: DateTime<Utc>,
    ) -> bool {
        if ticket.generation <= self.installed {
            debug!(
                generation = ticket.generation,
                installed = self.installed,
                "discarding stale refresh"
            );
            return false;
        }
        self.installed = ticket.generation;
        self.current = Arc::new(WorkingSet {
            generation: ticket.generation,
            records,
            refreshed_at: Some(now),
        });
        true
    }

    pub fn current(&self) -> Arc<WorkingSet> {
        Arc::clone(&self.current)
    }

    pub fn installed_generation(&self) -> u64 {
        self.installed
    }

    pub fn latest_issued(&self) -> u64 {
        self.issued
    }
}
