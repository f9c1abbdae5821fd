//! Feed ordering.
//!
//! Blinks are sorted on the key `(-interest, -likes, -published)` with a stable sort, then
//! the first `hot_count` positions are flagged hot. `interest` and `is_hot` are derived on
//! every pass and never read back from storage.
//!
//! Timestamps come from storage in mixed shapes (RFC 3339, naive ISO-8601, space-separated,
//! RFC 2822, plain dates). Offset-less values are taken as UTC; anything unparseable sorts
//! as the minimum instant.

use std::cmp::{Ordering, Reverse};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use crate::analyze::scoring::interest;
use crate::models::BlinkRecord;

pub const DEFAULT_HOT_COUNT: usize = 4;

const AWARE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A blink as served: stored fields plus read-time derivations.
#[derive(Debug, Clone, Serialize)]
pub struct RankedBlink {
    #[serde(flatten)]
    pub record: BlinkRecord,
    pub interest: f64,
    #[serde(rename = "isHot")]
    pub is_hot: bool,
}

/// Parse a stored timestamp; naive values are interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(secs) = s.parse::<i64>() {
            return Utc.timestamp_opt(secs, 0).single();
        }
    }
    None
}

/// Recency instant used for ordering; missing or unparseable ⇒ minimum instant.
pub fn recency_instant(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(parse_timestamp)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Interest(f64);

impl Eq for Interest {}

impl PartialOrd for Interest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

type RankKey = (Reverse<Interest>, Reverse<u64>, Reverse<DateTime<Utc>>);

fn rank_key(b: &RankedBlink) -> RankKey {
    (
        Reverse(Interest(b.interest)),
        Reverse(b.record.votes.likes),
        Reverse(recency_instant(b.record.recency_raw())),
    )
}

/// Order blinks for display and flag the first `hot_count` as hot.
pub fn rank(blinks: Vec<BlinkRecord>, hot_count: usize) -> Vec<RankedBlink> {
    let mut ranked: Vec<RankedBlink> = blinks
        .into_iter()
        .map(|mut record| {
            record.strip_derived();
            let interest = interest(record.votes.likes, record.votes.dislikes);
            RankedBlink {
                record,
                interest,
                is_hot: false,
            }
        })
        .collect();

    // Stable: equal keys keep their input order.
    ranked.sort_by_cached_key(rank_key);

    for (pos, b) in ranked.iter_mut().enumerate() {
        b.is_hot = pos < hot_count;
    }
    ranked
}

/// Rank the whole collection and return the entry for `id` with its positional flags.
pub fn rank_one(blinks: Vec<BlinkRecord>, id: &str, hot_count: usize) -> Option<RankedBlink> {
    rank(blinks, hot_count)
        .into_iter()
        .find(|b| b.record.id == id)
}
