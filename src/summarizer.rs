//! Summarizer collaborator: turns a group's text into summary points and a category.
//!
//! Two providers:
//! - `OpenAiSummarizer` calls a chat-completions endpoint with bounded timeouts.
//! - `ExtractiveSummarizer` works offline: leading sentences + a keyword category table.
//!
//! Failures surface as `anyhow` errors; the collection pipeline isolates them per group.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analyze::similarity::{keywords, normalize};
use crate::config::SummarizerConfig;

pub const CATEGORIES: [&str; 8] = [
    "politics",
    "economy",
    "world",
    "sports",
    "technology",
    "health",
    "science",
    "culture",
];

pub const FALLBACK_CATEGORY: &str = "general";

/// Max characters kept per summary point.
const POINT_MAX_CHARS: usize = 280;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Up to `n` short summary points for the given text.
    async fn points(&self, text: &str, n: usize) -> Result<Vec<String>>;

    /// One category label.
    async fn category(&self, text: &str) -> Result<String>;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type SharedSummarizer = Arc<dyn Summarizer>;

/// Factory: disabled config or non-openai provider ⇒ extractive.
pub fn build_summarizer(cfg: &SummarizerConfig) -> Result<SharedSummarizer> {
    let cfg = cfg.resolved()?;
    if cfg.enabled && cfg.provider == "openai" {
        tracing::info!(
            target: "summarizer",
            provider = "openai",
            model = %cfg.model,
            key_len = cfg.api_key.len(),
            "summarizer configured"
        );
        return Ok(Arc::new(OpenAiSummarizer::new(&cfg)?));
    }
    tracing::info!(target: "summarizer", provider = "extractive", "summarizer configured");
    Ok(Arc::new(ExtractiveSummarizer))
}

// ------------------------------------------------------------
// OpenAI-compatible provider
// ------------------------------------------------------------

pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiSummarizer {
    pub fn new(cfg: &SummarizerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("blink-feed/0.1 (+github.com/lumlich/blink-feed)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building summarizer http client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
        })
    }

    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
            max_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("summarizer request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("summarizer returned status {status}");
        }
        let body: Resp = resp.json().await.context("summarizer response body")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            bail!("summarizer returned empty content");
        }
        Ok(content)
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn points(&self, text: &str, n: usize) -> Result<Vec<String>> {
        let sys = format!(
            "You summarize news coverage. Return exactly {n} short factual points, one per line, \
             in the same language as the input. No numbering, no emojis, no preamble."
        );
        let raw = self.complete(&sys, text, 400).await?;
        let points = parse_points(&raw, n);
        if points.is_empty() {
            bail!("summarizer returned no usable points");
        }
        Ok(points)
    }

    async fn category(&self, text: &str) -> Result<String> {
        let sys = format!(
            "Classify the news text into exactly one of: {}. Output only the label.",
            CATEGORIES.join(", ")
        );
        let raw = self.complete(&sys, text, 8).await?;
        Ok(canonical_category(&raw))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Offline extractive provider
// ------------------------------------------------------------

pub struct ExtractiveSummarizer;

static CATEGORY_KEYWORDS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            "politics",
            vec![
                "gobierno", "government", "elecciones", "election", "elections", "parliament",
                "parlamento", "congreso", "congress", "senate", "senado", "president",
                "presidente", "minister", "ministro", "vote",
            ],
        ),
        (
            "economy",
            vec![
                "economy", "economía", "inflation", "inflación", "bank", "banco", "market",
                "markets", "mercado", "mercados", "rates", "tasas", "budget", "presupuesto",
                "stocks", "bolsa",
            ],
        ),
        (
            "world",
            vec![
                "war", "guerra", "earthquake", "terremoto", "sismo", "flood", "floods",
                "inundaciones", "refugees", "refugiados", "ceasefire",
            ],
        ),
        (
            "sports",
            vec![
                "football", "fútbol", "futbol", "league", "liga", "championship",
                "campeonato", "olympics", "olímpicos", "tennis", "tenis", "goal", "gol",
            ],
        ),
        (
            "technology",
            vec![
                "technology", "tecnología", "software", "google", "apple", "microsoft",
                "startup", "chip", "chips", "artificial", "inteligencia",
            ],
        ),
        (
            "health",
            vec![
                "health", "salud", "hospital", "virus", "vaccine", "vacuna", "disease",
                "enfermedad", "outbreak", "brote",
            ],
        ),
        (
            "science",
            vec![
                "science", "ciencia", "space", "espacio", "nasa", "climate", "clima",
                "research", "investigación",
            ],
        ),
        (
            "culture",
            vec![
                "film", "película", "music", "música", "festival", "museum", "museo", "book",
                "libro",
            ],
        ),
    ]
});

/// Category with the most keyword hits; table order breaks ties.
pub fn keyword_category(text: &str) -> &'static str {
    let words = keywords(&normalize(text), 3);
    let mut best: Option<(&'static str, usize)> = None;
    for (label, kws) in CATEGORY_KEYWORDS.iter() {
        let hits = kws.iter().filter(|k| words.contains(**k)).count();
        if hits > 0 && best.map_or(true, |(_, b)| hits > b) {
            best = Some((label, hits));
        }
    }
    best.map(|(l, _)| l).unwrap_or(FALLBACK_CATEGORY)
}

/// First `n` distinct sentences of the text.
pub fn leading_sentences(text: &str, n: usize) -> Vec<String> {
    static RE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?\n]+").expect("sentence regex"));
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for part in RE_SPLIT.split(text) {
        let s = sanitize_point(part);
        if s.chars().count() < 4 {
            continue;
        }
        if seen.insert(normalize(&s)) {
            out.push(s);
        }
        if out.len() >= n {
            break;
        }
    }
    out
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn points(&self, text: &str, n: usize) -> Result<Vec<String>> {
        let points = leading_sentences(text, n);
        if points.is_empty() {
            bail!("no sentences to extract");
        }
        Ok(points)
    }

    async fn category(&self, text: &str) -> Result<String> {
        Ok(keyword_category(text).to_string())
    }

    fn name(&self) -> &'static str {
        "extractive"
    }
}

// ------------------------------------------------------------
// Output cleanup
// ------------------------------------------------------------

/// Single line, collapsed whitespace, bounded length.
pub fn sanitize_point(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(POINT_MAX_CHARS).collect::<String>().trim().to_string()
}

/// One point per line; bullets and list numbering stripped; at most `n`.
pub fn parse_points(raw: &str, n: usize) -> Vec<String> {
    static RE_BULLET: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\s*(?:[-*•·]+|\d+[.)])\s*").expect("bullet regex"));
    raw.lines()
        .map(|l| RE_BULLET.replace(l, "").to_string())
        .map(|l| sanitize_point(&l))
        .filter(|l| !l.is_empty())
        .take(n)
        .collect()
}

/// Map a free-form label onto the known set.
pub fn canonical_category(raw: &str) -> String {
    let label = raw
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if CATEGORIES.contains(&label.as_str()) {
        label
    } else {
        FALLBACK_CATEGORY.to_string()
    }
}
