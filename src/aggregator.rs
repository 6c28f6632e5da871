//! Flattens one file's day buckets into ledger sessions.

use crate::models::{round_to, DayBuckets, Session, DEFAULT_TIME_OF_DAY, NEGLIGIBLE_COST};

/// One session per date whose cost reaches [`NEGLIGIBLE_COST`].
pub fn to_sessions(buckets: &DayBuckets, source: &str, file: &str) -> Vec<Session> {
    buckets
        .iter()
        .filter(|(_, bucket)| bucket.cost >= NEGLIGIBLE_COST)
        .map(|(date, bucket)| Session {
            date: date.clone(),
            time: bucket
                .earliest_time()
                .unwrap_or(DEFAULT_TIME_OF_DAY)
                .to_string(),
            source: source.to_string(),
            file: file.to_string(),
            cost: round_to(bucket.cost, 4),
            input_tokens: bucket.input_tokens,
            output_tokens: bucket.output_tokens,
            cache_read: bucket.cache_read,
            cache_write: bucket.cache_write,
            model: bucket.last_model().unwrap_or_default().to_string(),
        })
        .collect()
}
