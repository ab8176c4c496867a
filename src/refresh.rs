use crate::enrich::{MatchReport, enrich};
use crate::error::{RefreshError, UpstreamError};
use crate::models::{ClassifiedRecord, RawMessageRecord};
use crate::sync::{SharedRefreshState, Ticket, WorkingSet, lock};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Batch classification collaborator.
#[async_trait]
pub trait ClassificationSource: Send + Sync {
    async fn fetch_classified(&self) -> Result<Vec<ClassifiedRecord>, UpstreamError>;
}

/// Raw mailbox sync collaborator. `credential` is the bearer access token.
#[async_trait]
pub trait RawMessageSource: Send + Sync {
    async fn fetch_raw(&self, credential: &str) -> Result<Vec<RawMessageRecord>, UpstreamError>;
}

#[derive(Debug)]
pub enum RefreshOutcome {
    /// Both datasets are handed back so the caller can persist them.
    Installed {
        working: Arc<WorkingSet>,
        classified: Vec<ClassifiedRecord>,
        raw: Vec<RawMessageRecord>,
    },
    Superseded(Ticket),
}

/// One refresh cycle: fetch both collaborators, join, install. On any
/// fetch failure the installed working set is left as it was.
pub async fn refresh(
    state: &SharedRefreshState,
    classifier: &dyn ClassificationSource,
    raw_source: &dyn RawMessageSource,
    credential: &str,
) -> Result<RefreshOutcome, RefreshError> {
    let ticket = lock(state).begin();

    let fetched = tokio::try_join!(
        classifier.fetch_classified(),
        raw_source.fetch_raw(credential)
    );
    let (classified, raw) = match fetched {
        Ok(both) => both,
        Err(e) => {
            warn!(generation = ticket.generation, error = %e, "refresh aborted, keeping previous data");
            return Err(e.into());
        }
    };

    let now = Utc::now();
    let records = enrich(&classified, &raw, now);
    let report = MatchReport::from_records(&records);
    info!(
        generation = ticket.generation,
        classified = classified.len(),
        raw = raw.len(),
        by_id = report.matched_by_id,
        by_thread = report.matched_by_thread,
        unmatched = report.unmatched,
        "enriched classification batch"
    );

    let mut guard = lock(state);
    if !guard.install(ticket, records, now) {
        return Ok(RefreshOutcome::Superseded(ticket));
    }
    let working = guard.current();
    drop(guard);

    info!(generation = ticket.generation, "installed working set");
    Ok(RefreshOutcome::Installed {
        working,
        classified,
        raw,
    })
}
