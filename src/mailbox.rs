use crate::models::{Category, EnrichedRecord};

/// What the mailbox view shows: an optional category plus a subject search.
#[derive(Debug, Clone, Default)]
pub struct MailboxFilter {
    pub category: Option<Category>,
    pub search: Option<String>,
}

impl MailboxFilter {
    pub fn matches(&self, record: &EnrichedRecord) -> bool {
        if let Some(category) = &self.category {
            if record.category() != Some(category) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let subject = record.subject();
                !subject.is_empty() && subject.to_lowercase().contains(&term.to_lowercase())
            }
            _ => true,
        }
    }

    pub fn apply<'a>(&self, records: &'a [EnrichedRecord]) -> Vec<&'a EnrichedRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

pub fn sorted_newest_first<'a>(mut records: Vec<&'a EnrichedRecord>) -> Vec<&'a EnrichedRecord> {
    records.sort_by(|a, b| b.received_at.cmp(&a.received_at));
    records
}
