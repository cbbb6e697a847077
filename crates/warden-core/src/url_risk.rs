//! URL path and query risk analysis.
//!
//! Catches explicit content hosted on otherwise acceptable domains
//! (community sections, tagged albums, suggestive filenames) as an extra
//! layer beyond domain reputation. The resulting confidence feeds the
//! fusion context term.

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};

use crate::trust::host_of;

/// What kind of URL evidence matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlRiskCategory {
    /// A known adult community section (e.g. an NSFW subreddit).
    AdultCommunity,
    /// An explicit path segment.
    ExplicitPath,
    /// An explicit query keyword.
    ExplicitQuery,
    /// An explicit media filename.
    ExplicitFilename,
    /// Content tagged NSFW/mature by the host.
    NsfwTag,
}

/// Result of URL risk analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRiskResult {
    /// Whether the URL carries explicit-content evidence.
    pub is_explicit: bool,
    /// The pattern that matched, for explainability.
    pub matched_pattern: Option<String>,
    /// Category of the match.
    pub category: Option<UrlRiskCategory>,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

impl UrlRiskResult {
    fn clean() -> Self {
        Self {
            is_explicit: false,
            matched_pattern: None,
            category: None,
            confidence: 0.0,
        }
    }

    fn matched(category: UrlRiskCategory, pattern: impl Into<String>, confidence: f32) -> Self {
        Self {
            is_explicit: true,
            matched_pattern: Some(pattern.into()),
            category: Some(category),
            confidence,
        }
    }

    /// Risk contribution on the fusion 0-100 scale.
    pub fn score(&self) -> f32 {
        if self.is_explicit {
            self.confidence * 100.0
        } else {
            0.0
        }
    }
}

const NSFW_SUBREDDITS: &[&str] = &[
    "nsfw", "gonewild", "porn", "sex", "nudes", "nsfw_gifs", "realgirls", "amateur",
    "milf", "onoff", "collegesluts", "hotwife", "bdsm", "bondage", "femdom", "hentai",
    "rule34", "nsfw_snapchat", "dirtysnapchat",
];

const EXPLICIT_PATH_SEGMENTS: &[&str] = &[
    "/xxx/", "/porn/", "/adult/", "/nsfw/", "/nude/", "/naked/", "/sex/", "/erotic/",
    "/fetish/", "/hentai/", "/r18/", "/18+/", "/mature/", "/explicit/", "/uncensored/",
];

const EXPLICIT_QUERY_KEYWORDS: &[&str] = &[
    "porn", "sex", "xxx", "nude", "naked", "nsfw", "hentai", "erotic", "fetish", "explicit",
];

const ADULT_HOST_INDICATORS: &[&str] = &[
    "onlyfans.com/", "fansly.com/", "pornhub.com", "xvideos.com", "xhamster.com",
];

static EXPLICIT_FILENAMES: Lazy<RegexSet> = Lazy::new(|| {
    let stems = ["porn", "nude", "xxx", "nsfw", "sex"];
    let patterns: Vec<String> = stems
        .iter()
        .map(|stem| format!(r"{}[^/]*\.(jpg|jpeg|png|gif|webp|mp4|webm)", stem))
        .collect();
    RegexSet::new(&patterns).expect("Invalid filename patterns")
});

static SUBREDDIT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/r/([^/]+)").expect("Invalid subreddit pattern"));

/// Analyzes a URL for explicit content evidence in its path and query.
pub fn analyze(url: &str) -> UrlRiskResult {
    if url.trim().is_empty() {
        return UrlRiskResult::clean();
    }

    let lower = url.to_lowercase();
    let host = host_of(&lower).unwrap_or_default();
    let (path, query) = split_path_query(&lower);

    // 1. Known adult community sections on reddit.
    if host.contains("reddit.com") || host.contains("redd.it") {
        if let Some(captures) = SUBREDDIT_PATH.captures(path) {
            let subreddit = &captures[1];
            if NSFW_SUBREDDITS.contains(&subreddit) {
                tracing::warn!("NSFW community section detected: r/{}", subreddit);
                return UrlRiskResult::matched(
                    UrlRiskCategory::AdultCommunity,
                    format!("r/{}", subreddit),
                    0.95,
                );
            }
        }
    }

    // 2. Explicit path segments.
    for segment in EXPLICIT_PATH_SEGMENTS {
        if path.contains(segment) {
            return UrlRiskResult::matched(UrlRiskCategory::ExplicitPath, *segment, 0.90);
        }
    }

    // 3. Explicit query keywords.
    for keyword in EXPLICIT_QUERY_KEYWORDS {
        if query.contains(keyword) {
            return UrlRiskResult::matched(UrlRiskCategory::ExplicitQuery, *keyword, 0.85);
        }
    }

    // 4. Explicit media filenames anywhere in the URL.
    if let Some(index) = EXPLICIT_FILENAMES.matches(&lower).iter().next() {
        return UrlRiskResult::matched(
            UrlRiskCategory::ExplicitFilename,
            format!("filename pattern #{}", index),
            0.80,
        );
    }

    // 5. NSFW/mature tags on image-hosting sites.
    if host.contains("imgur.com") || host.contains("tumblr.com") {
        if path.contains("/nsfw") || query.contains("nsfw=1") || query.contains("mature=1") {
            return UrlRiskResult::matched(UrlRiskCategory::NsfwTag, "nsfw_tag", 0.85);
        }
    }

    // 6. Adult platforms by host fragment.
    for indicator in ADULT_HOST_INDICATORS {
        if lower.contains(indicator) {
            return UrlRiskResult::matched(UrlRiskCategory::ExplicitPath, *indicator, 0.95);
        }
    }

    UrlRiskResult::clean()
}

/// Quick check: does the URL carry explicit evidence at all?
pub fn is_explicit(url: &str) -> bool {
    analyze(url).is_explicit
}

/// Splits a lowercased URL into (path, query), both possibly empty.
fn split_path_query(lower: &str) -> (&str, &str) {
    let rest = lower.split_once("://").map(|(_, r)| r).unwrap_or(lower);
    let rest = rest.split('#').next().unwrap_or(rest);

    let path_start = rest.find('/').unwrap_or(rest.len());
    let after_host = &rest[path_start..];

    match after_host.split_once('?') {
        Some((path, query)) => (path, query),
        None => (after_host, ""),
    }
}
