use chrono::{DateTime, Utc};
use inflections::case::to_title_case;
use serde::{Deserialize, Serialize};

/// Sender placed on records that found no raw message to merge with.
pub const NO_SENDER: &str = "no sender info";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Sponsorship,
    General,
    Important,
    Other(String),
}

impl Category {
    pub fn label(&self) -> &str {
        match self {
            Category::Sponsorship => "sponsorship",
            Category::General => "general",
            Category::Important => "important",
            Category::Other(label) => label,
        }
    }

    pub fn display_name(&self) -> String {
        to_title_case(self.label())
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_lowercase().as_str() {
            "sponsorship" | "promotional" | "advertising" | "광고성" => Category::Sponsorship,
            "general" | "informational" | "정보성" => Category::General,
            "important" | "중요" => Category::Important,
            _ => Category::Other(trimmed.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from(label.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of a classification pass. Every field defaults so partial
/// records survive parsing; usability is decided after enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    #[serde(default)]
    pub mail_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default, alias = "mail_type")]
    pub category: Option<Category>,
    #[serde(default)]
    pub classification_reason: String,
    #[serde(default)]
    pub summary: String,
}

/// A raw message as the sync collaborator reports it. Serializes under the
/// canonical field names; decoding goes through [`WireRawMessage`] so that
/// payloads carrying several spellings of one field still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireRawMessage")]
pub struct RawMessageRecord {
    pub id: String,
    pub thread_id: Option<String>,
    pub sender: Option<String>,
    pub subject: Option<String>,
    pub received_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
    pub plain_text: Option<String>,
}

/// Every spelling a sync workflow has been seen to use, each as its own
/// field. Earlier fields win when more than one is present.
#[derive(Deserialize)]
struct WireRawMessage {
    id: String,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default, rename = "threadId")]
    thread_id_camel: Option<String>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    from_address: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    received_at: Option<timestamp::WireTimestamp>,
    #[serde(default, rename = "internalDate")]
    internal_date: Option<timestamp::WireTimestamp>,
    #[serde(default)]
    date: Option<timestamp::WireTimestamp>,
    #[serde(default)]
    created_at: Option<timestamp::WireTimestamp>,
    #[serde(default, rename = "createdAt")]
    created_at_camel: Option<timestamp::WireTimestamp>,
    #[serde(default)]
    plain_text: Option<String>,
    #[serde(default)]
    body_plain: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

/// First candidate that is present and not blank.
fn first_text<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

impl TryFrom<WireRawMessage> for RawMessageRecord {
    type Error = String;

    fn try_from(wire: WireRawMessage) -> Result<Self, Self::Error> {
        let received_at = timestamp::first_valid([wire.received_at, wire.internal_date, wire.date])
            .ok_or_else(|| format!("message {} has no usable timestamp", wire.id))?;

        Ok(RawMessageRecord {
            thread_id: first_text([wire.thread_id, wire.thread_id_camel]),
            sender: first_text([wire.sender, wire.from, wire.from_address]),
            subject: wire.subject,
            received_at,
            created_at: timestamp::first_valid([wire.created_at, wire.created_at_camel]),
            plain_text: first_text([wire.plain_text, wire.body_plain, wire.body]),
            id: wire.id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKey {
    Id,
    ThreadId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub classified: ClassifiedRecord,
    pub received_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
    pub sender: String,
    pub thread_id: Option<String>,
    pub plain_text: Option<String>,
    pub matched_by: Option<MatchKey>,
}

impl EnrichedRecord {
    pub fn mail_id(&self) -> &str {
        &self.classified.mail_id
    }

    pub fn subject(&self) -> &str {
        &self.classified.subject
    }

    pub fn category(&self) -> Option<&Category> {
        self.classified.category.as_ref()
    }

    pub fn is_matched(&self) -> bool {
        self.matched_by.is_some()
    }

    pub fn sender_parts(&self) -> Sender<'_> {
        Sender::parse(&self.sender)
    }
}

/// A `From` header split into its display name and address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sender<'a> {
    pub display_name: Option<&'a str>,
    pub address: &'a str,
}

impl<'a> Sender<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        if let (Some(open), true) = (raw.rfind('<'), raw.ends_with('>')) {
            let address = raw[open + 1..raw.len() - 1].trim();
            let name = raw[..open].trim().trim_matches('"').trim();
            return Sender {
                display_name: (!name.is_empty()).then_some(name),
                address,
            };
        }
        Sender {
            display_name: None,
            address: raw,
        }
    }

    /// Display name when present, otherwise the address.
    pub fn short(&self) -> &'a str {
        self.display_name.unwrap_or(self.address)
    }
}

/// Timestamps arrive as RFC 3339 or RFC 2822 text, or as epoch milliseconds
/// (number or numeric string, as Gmail's `internalDate`).
pub(crate) mod timestamp {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(crate) enum WireTimestamp {
        Millis(i64),
        Text(String),
    }

    impl WireTimestamp {
        pub(crate) fn resolve(self) -> Option<DateTime<Utc>> {
            match self {
                WireTimestamp::Millis(ms) => DateTime::from_timestamp_millis(ms),
                WireTimestamp::Text(text) => {
                    let text = text.trim();
                    if let Ok(ms) = text.parse::<i64>() {
                        return DateTime::from_timestamp_millis(ms);
                    }
                    DateTime::parse_from_rfc3339(text)
                        .or_else(|_| DateTime::parse_from_rfc2822(text))
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc))
                }
            }
        }
    }

    /// First candidate that is present and parses.
    pub(crate) fn first_valid<const N: usize>(
        candidates: [Option<WireTimestamp>; N],
    ) -> Option<DateTime<Utc>> {
        candidates
            .into_iter()
            .flatten()
            .find_map(WireTimestamp::resolve)
    }
}
