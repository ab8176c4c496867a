use crate::models::{Category, EnrichedRecord};
use chrono::{DateTime, Duration, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;

pub const RECENT_WINDOW_DAYS: i64 = 7;
const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedStats {
    pub total: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub high_value_category: Category,
    pub high_value: usize,
    /// Percentage of `high_value` in `total`, one decimal.
    pub ratio: f64,
    pub today: usize,
    pub recent: usize,
}

impl DerivedStats {
    pub fn count(&self, category: &Category) -> usize {
        self.by_category.get(category).copied().unwrap_or(0)
    }
}

/// Snapshot of the dashboard figures for `records` as seen at `now`.
///
/// `today` uses `now`'s own timezone for the midnight boundaries, so pass a
/// `DateTime<Local>` for a wall-clock dashboard and a fixed offset in tests.
pub fn aggregate<Tz: TimeZone>(
    records: &[EnrichedRecord],
    now: &DateTime<Tz>,
    high_value: &Category,
) -> DerivedStats {
    let tz = now.timezone();
    let today_date = now.date_naive();
    let window_start = now.clone() - Duration::days(RECENT_WINDOW_DAYS);

    let mut by_category: BTreeMap<Category, usize> = BTreeMap::new();
    let mut today = 0;
    let mut recent = 0;

    for record in records {
        let category = record
            .category()
            .cloned()
            .unwrap_or_else(|| Category::Other(UNCATEGORIZED.to_string()));
        *by_category.entry(category).or_insert(0) += 1;

        let received = record.received_at.with_timezone(&tz);
        if received.date_naive() == today_date {
            today += 1;
        }
        if received >= window_start {
            recent += 1;
        }
    }

    let total = records.len();
    let high_value_count = by_category.get(high_value).copied().unwrap_or(0);

    DerivedStats {
        total,
        by_category,
        high_value_category: high_value.clone(),
        high_value: high_value_count,
        ratio: ratio(high_value_count, total),
        today,
        recent,
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = part as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassifiedRecord, NO_SENDER};
    use chrono::{FixedOffset, Utc};

    fn record(category: &str, received_at: DateTime<Utc>) -> EnrichedRecord {
        EnrichedRecord {
            classified: ClassifiedRecord {
                mail_id: format!("m-{category}-{}", received_at.timestamp()),
                subject: "subject".into(),
                category: Some(Category::from(category)),
                classification_reason: String::new(),
                summary: "summary".into(),
            },
            received_at,
            created_at: None,
            sender: NO_SENDER.into(),
            thread_id: None,
            plain_text: None,
            matched_by: None,
        }
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn ratio_of_three_in_ten() {
        let now = at("2024-01-10T12:00:00Z");
        let mut records: Vec<_> = (0..3).map(|_| record("sponsorship", now)).collect();
        records.extend((0..7).map(|_| record("general", now)));

        let stats = aggregate(&records, &now, &Category::Sponsorship);
        assert_eq!(stats.total, 10);
        assert_eq!(stats.high_value, 3);
        assert_eq!(stats.count(&Category::General), 7);
        assert_eq!(stats.ratio, 30.0);
    }

    #[test]
    fn ratio_rounds_to_one_decimal() {
        let now = at("2024-01-10T12:00:00Z");
        let records = vec![
            record("sponsorship", now),
            record("general", now),
            record("general", now),
        ];
        let stats = aggregate(&records, &now, &Category::Sponsorship);
        assert_eq!(stats.ratio, 33.3);
        let inverse = aggregate(&records, &now, &Category::General);
        assert_eq!(inverse.ratio, 66.7);
    }

    #[test]
    fn empty_input_is_safe() {
        let stats = aggregate(&[], &Utc::now(), &Category::Sponsorship);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.ratio, 0.0);
        assert_eq!(stats.today, 0);
        assert_eq!(stats.recent, 0);
        assert!(stats.by_category.is_empty());
    }

    #[test]
    fn ratio_stays_within_bounds() {
        let now = at("2024-01-10T12:00:00Z");
        for hv in 0..=5 {
            let mut records: Vec<_> = (0..hv).map(|_| record("sponsorship", now)).collect();
            records.extend((hv..5).map(|_| record("general", now)));
            let stats = aggregate(&records, &now, &Category::Sponsorship);
            assert!((0.0..=100.0).contains(&stats.ratio), "ratio {}", stats.ratio);
        }
    }

    #[test]
    fn today_uses_local_midnight() {
        // UTC+9: 2024-01-10T00:30+09:00 is 2024-01-09T15:30Z.
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = at("2024-01-10T03:00:00Z").with_timezone(&kst);
        let records = vec![
            record("general", at("2024-01-09T15:30:00Z")),
            record("general", at("2024-01-09T14:59:59Z")),
        ];
        let stats = aggregate(&records, &now, &Category::Sponsorship);
        assert_eq!(stats.today, 1);

        let utc_now = at("2024-01-10T03:00:00Z");
        let utc_stats = aggregate(&records, &utc_now, &Category::Sponsorship);
        assert_eq!(utc_stats.today, 0);
    }

    #[test]
    fn recent_is_trailing_seven_days() {
        let now = at("2024-01-10T12:00:00Z");
        let records = vec![
            record("general", at("2024-01-03T12:00:00Z")),
            record("general", at("2024-01-03T11:59:59Z")),
            record("general", at("2024-01-09T00:00:00Z")),
            record("general", at("2023-12-01T00:00:00Z")),
        ];
        let stats = aggregate(&records, &now, &Category::Sponsorship);
        assert_eq!(stats.recent, 2);
    }

    #[test]
    fn repeated_aggregation_is_identical() {
        let now = at("2024-01-10T12:00:00Z");
        let records = vec![
            record("sponsorship", at("2024-01-10T01:00:00Z")),
            record("general", at("2024-01-05T01:00:00Z")),
            record("newsletter", at("2023-01-05T01:00:00Z")),
        ];
        let first = aggregate(&records, &now, &Category::Sponsorship);
        let second = aggregate(&records, &now, &Category::Sponsorship);
        assert_eq!(first, second);
    }

    #[test]
    fn uncategorized_records_are_counted() {
        let now = at("2024-01-10T12:00:00Z");
        let mut r = record("general", now);
        r.classified.category = None;
        let stats = aggregate(&[r], &now, &Category::Sponsorship);
        assert_eq!(stats.count(&Category::Other(UNCATEGORIZED.into())), 1);
        assert_eq!(stats.total, 1);
    }

    #[test]
    fn duplicates_are_double_counted() {
        let now = at("2024-01-10T12:00:00Z");
        let r = record("sponsorship", now);
        let stats = aggregate(&[r.clone(), r], &now, &Category::Sponsorship);
        assert_eq!(stats.high_value, 2);
        assert_eq!(stats.ratio, 100.0);
    }
}
