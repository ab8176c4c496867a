use crate::models::{ClassifiedRecord, EnrichedRecord, MatchKey, NO_SENDER, RawMessageRecord};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Lookup over a raw batch by message id and by thread id. The first raw
/// record in input order owns each key, same as a front-to-back scan.
pub struct RawIndex<'a> {
    by_id: HashMap<&'a str, &'a RawMessageRecord>,
    by_thread: HashMap<&'a str, &'a RawMessageRecord>,
}

impl<'a> RawIndex<'a> {
    pub fn new(raw: &'a [RawMessageRecord]) -> Self {
        let mut by_id = HashMap::with_capacity(raw.len());
        let mut by_thread = HashMap::with_capacity(raw.len());
        for record in raw {
            by_id.entry(record.id.as_str()).or_insert(record);
            if let Some(thread_id) = record.thread_id.as_deref() {
                by_thread.entry(thread_id).or_insert(record);
            }
        }
        Self { by_id, by_thread }
    }

    /// Message id first, then thread id.
    pub fn lookup(&self, mail_id: &str) -> Option<(MatchKey, &'a RawMessageRecord)> {
        if let Some(raw) = self.by_id.get(mail_id) {
            return Some((MatchKey::Id, *raw));
        }
        self.by_thread
            .get(mail_id)
            .map(|raw| (MatchKey::ThreadId, *raw))
    }
}

/// Join classification results onto raw messages. Output has the same length
/// and order as `classified`; records with no raw counterpart take `now` as
/// their received time and [`NO_SENDER`] as sender.
pub fn enrich(
    classified: &[ClassifiedRecord],
    raw: &[RawMessageRecord],
    now: DateTime<Utc>,
) -> Vec<EnrichedRecord> {
    let index = RawIndex::new(raw);
    classified
        .iter()
        .map(|record| match index.lookup(&record.mail_id) {
            Some((key, raw)) => merge(record, raw, key),
            None => fallback(record, now),
        })
        .collect()
}

pub fn enrich_now(classified: &[ClassifiedRecord], raw: &[RawMessageRecord]) -> Vec<EnrichedRecord> {
    enrich(classified, raw, Utc::now())
}

fn merge(record: &ClassifiedRecord, raw: &RawMessageRecord, key: MatchKey) -> EnrichedRecord {
    EnrichedRecord {
        classified: record.clone(),
        received_at: raw.received_at,
        created_at: raw.created_at,
        sender: raw
            .sender
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(NO_SENDER)
            .to_string(),
        thread_id: raw.thread_id.clone(),
        plain_text: raw.plain_text.clone(),
        matched_by: Some(key),
    }
}

fn fallback(record: &ClassifiedRecord, now: DateTime<Utc>) -> EnrichedRecord {
    EnrichedRecord {
        classified: record.clone(),
        received_at: now,
        created_at: None,
        sender: NO_SENDER.to_string(),
        thread_id: None,
        plain_text: None,
        matched_by: None,
    }
}

pub fn is_usable(record: &EnrichedRecord) -> bool {
    let c = &record.classified;
    !c.mail_id.trim().is_empty()
        && !c.subject.trim().is_empty()
        && !c.summary.trim().is_empty()
        && c.category
            .as_ref()
            .is_some_and(|category| !category.label().trim().is_empty())
}

/// Validity gate. Runs after [`enrich`], never before.
pub fn usable(records: Vec<EnrichedRecord>) -> Vec<EnrichedRecord> {
    records.into_iter().filter(is_usable).collect()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchReport {
    pub matched_by_id: usize,
    pub matched_by_thread: usize,
    pub unmatched: usize,
}

impl MatchReport {
    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        records
            .iter()
            .fold(MatchReport::default(), |mut report, r| {
                match r.matched_by {
                    Some(MatchKey::Id) => report.matched_by_id += 1,
                    Some(MatchKey::ThreadId) => report.matched_by_thread += 1,
                    None => report.unmatched += 1,
                }
                report
            })
    }
}
