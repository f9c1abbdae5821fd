//! Domain records: scraped articles, clustered groups, and persisted blinks.
//!
//! `BlinkRecord` mirrors the on-disk layout (one JSON object per blink). Fields the
//! core does not interpret (points, category, images, ...) live in `content` and
//! round-trip untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::BlinkError;

/// Keys that are derived at read time and must never be stored or echoed from storage.
const DERIVED_KEYS: [&str; 4] = ["interest", "isHot", "is_hot", "userVote"];

/// One scraped item. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawArticle {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub source: String,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
}

impl RawArticle {
    /// Build an article stamped "now"; the id is derived from title + url.
    pub fn new(title: impl Into<String>, url: impl Into<String>, source: impl Into<String>) -> Self {
        let title = title.into();
        let url = url.into();
        Self {
            id: content_hash([title.as_str(), url.as_str()]),
            title,
            url,
            summary: None,
            source: source.into(),
            published_at: Utc::now(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        let s = summary.into();
        self.summary = if s.trim().is_empty() { None } else { Some(s) };
        self
    }

    /// Absent timestamps keep the construction time.
    pub fn published(mut self, ts: Option<DateTime<Utc>>) -> Self {
        if let Some(ts) = ts {
            self.published_at = ts;
        }
        self
    }
}

/// First 16 hex chars of SHA-256 over newline-joined parts.
pub fn content_hash<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for (i, p) in parts.into_iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(p.as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Articles judged to describe the same event. Never empty; the first member is the seed.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleGroup {
    members: Vec<RawArticle>,
}

#[allow(clippy::len_without_is_empty)]
impl ArticleGroup {
    pub(crate) fn with_seed(seed: RawArticle) -> Self {
        Self {
            members: vec![seed],
        }
    }

    pub(crate) fn push(&mut self, article: RawArticle) {
        self.members.push(article);
    }

    pub fn seed(&self) -> &RawArticle {
        &self.members[0]
    }

    pub fn members(&self) -> &[RawArticle] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Distinct source names in order of first appearance.
    pub fn distinct_sources(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for m in &self.members {
            if !out.iter().any(|s| s.eq_ignore_ascii_case(&m.source)) {
                out.push(m.source.as_str());
            }
        }
        out
    }

    /// Most recent member timestamp.
    pub fn latest_published(&self) -> DateTime<Utc> {
        self.members
            .iter()
            .map(|m| m.published_at)
            .max()
            .unwrap_or_else(|| self.seed().published_at)
    }

    /// Title + summary of every member, one per line (summarizer input).
    pub fn combined_text(&self) -> String {
        self.members
            .iter()
            .map(|m| match &m.summary {
                Some(s) => format!("{}. {}", m.title, s),
                None => m.title.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Like,
    Dislike,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Like => "like",
            VoteType::Dislike => "dislike",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = BlinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(VoteType::Like),
            "dislike" => Ok(VoteType::Dislike),
            other => Err(BlinkError::InvalidInput(format!(
                "voteType must be 'like' or 'dislike', got '{other}'"
            ))),
        }
    }
}

/// Aggregate counters as persisted under `votes`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    #[serde(default, deserialize_with = "lenient_count")]
    pub likes: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub dislikes: u64,
}

/// Per-blink vote state handed back to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoteRecord {
    pub likes: u64,
    pub dislikes: u64,
    #[serde(rename = "userVotes")]
    pub user_votes: BTreeMap<String, VoteType>,
}

/// One persisted blink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlinkRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_votes")]
    pub votes: VoteCounts,
    #[serde(default, deserialize_with = "lenient_user_votes")]
    pub user_votes: BTreeMap<String, VoteType>,
    #[serde(
        rename = "publishedAt",
        alias = "published_at",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub sources: Vec<Value>,
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

impl BlinkRecord {
    /// Fresh record with zeroed votes.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            votes: VoteCounts::default(),
            user_votes: BTreeMap::new(),
            published_at: None,
            timestamp: None,
            sources: Vec::new(),
            content: Map::new(),
        }
    }

    /// Timestamp used for recency: `publishedAt`, else `timestamp`.
    pub fn recency_raw(&self) -> Option<&str> {
        self.published_at
            .as_deref()
            .or(self.timestamp.as_deref())
    }

    pub fn vote_record(&self) -> VoteRecord {
        VoteRecord {
            likes: self.votes.likes,
            dislikes: self.votes.dislikes,
            user_votes: self.user_votes.clone(),
        }
    }

    /// Remove read-time fields that may have leaked into storage.
    pub fn strip_derived(&mut self) {
        for k in DERIVED_KEYS {
            self.content.remove(k);
        }
    }
}

/// Negative, fractional or string counters decode to a clamped non-negative integer.
fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(count_from_value(&v))
}

fn count_from_value(v: &Value) -> u64 {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|i| i.max(0) as u64))
            .or_else(|| n.as_f64().map(count_from_f64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(count_from_f64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn count_from_f64(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        f as u64
    } else {
        0
    }
}

fn lenient_votes<'de, D: Deserializer<'de>>(d: D) -> Result<VoteCounts, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Object(m) => VoteCounts {
            likes: m.get("likes").map(count_from_value).unwrap_or(0),
            dislikes: m.get("dislikes").map(count_from_value).unwrap_or(0),
        },
        _ => VoteCounts::default(),
    })
}

fn lenient_user_votes<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<BTreeMap<String, VoteType>, D::Error> {
    let v = Value::deserialize(d)?;
    let mut out = BTreeMap::new();
    if let Value::Object(m) = v {
        for (user, vote) in m {
            if user.trim().is_empty() {
                continue;
            }
            if let Some(vt) = vote.as_str().and_then(|s| s.parse::<VoteType>().ok()) {
                out.insert(user, vt);
            }
        }
    }
    Ok(out)
}
