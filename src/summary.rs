//! Rollups over the merged ledger.

use crate::models::{round_to, Session, Summary};
use crate::timestamp_parser::LocalClock;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use std::collections::BTreeMap;

pub fn build_summary(sessions: &[Session], clock: &LocalClock) -> Summary {
    build_summary_at(sessions, clock.now())
}

/// Summary as of `now`. An empty ledger yields all-zero totals.
pub fn build_summary_at(sessions: &[Session], now: DateTime<FixedOffset>) -> Summary {
    let today = now.format("%Y-%m-%d").to_string();
    let current_month = now.format("%Y-%m").to_string();

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    let mut session_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut grand_total = 0.0;
    let mut today_cost = 0.0;
    let mut month_cost = 0.0;

    for session in sessions {
        *totals.entry(session.source.clone()).or_default() += session.cost;
        *session_counts.entry(session.source.clone()).or_default() += 1;
        grand_total += session.cost;
        if session.date == today {
            today_cost += session.cost;
        }
        if session.date.starts_with(&current_month) {
            month_cost += session.cost;
        }
    }

    for total in totals.values_mut() {
        *total = round_to(*total, 2);
    }
    totals.insert("grand_total".to_string(), round_to(grand_total, 2));
    session_counts.insert("total".to_string(), sessions.len() as u64);

    Summary {
        generated_at: now.to_rfc3339_opts(SecondsFormat::Secs, false),
        today,
        current_month,
        totals,
        today_cost: round_to(today_cost, 2),
        month_cost: round_to(month_cost, 2),
        session_counts,
    }
}
