//! Domain trust levels, the reputation interface, and the trusted-source
//! allowlist.
//!
//! Reputation influences fusion weighting; the allowlist short-circuits
//! analysis entirely for curated hosts. Both use strict suffix matching
//! (host equals the domain or ends with ".domain") to prevent bypasses
//! like "wikipedia.org.evil.example".

use serde::{Deserialize, Serialize};

/// Coarse domain-reputation classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// Curated, professionally moderated host.
    High,
    /// No reputation signal either way.
    #[default]
    Neutral,
    /// Host with a history of explicit or harmful content.
    Suspicious,
}

impl TrustLevel {
    /// Returns the level as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::High => "high",
            TrustLevel::Neutral => "neutral",
            TrustLevel::Suspicious => "suspicious",
        }
    }

    /// Baseline network-reputation score (0-100) fed into fusion when no
    /// finer-grained network signal is available.
    pub fn baseline_network_score(&self) -> f32 {
        match self {
            TrustLevel::High => 0.0,
            TrustLevel::Neutral => 25.0,
            TrustLevel::Suspicious => 75.0,
        }
    }
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Host-to-trust lookup consulted before fusion weighting.
pub trait DomainReputation: Send + Sync {
    /// Returns the trust level for a host string.
    fn trust_for(&self, host: &str) -> TrustLevel;
}

/// Strict suffix match: host equals the domain or ends with ".domain".
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Extracts the lowercased host from a URL string, without a full URL parse.
pub fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let host = rest
        .split(['/', '?', '#'])
        .next()?
        .split('@')
        .next_back()?
        .split(':')
        .next()?;
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

/// In-memory reputation table.
///
/// Defaults carry a curated high-trust list (encyclopedias, universities,
/// wire services) and a sample of known adult/gore hosts; everything else
/// is neutral. Product builds replace or extend both lists from the
/// reputation store.
#[derive(Debug, Clone)]
pub struct StaticReputation {
    high: Vec<String>,
    suspicious: Vec<String>,
}

impl StaticReputation {
    /// Creates a reputation table from explicit lists.
    pub fn new(high: Vec<String>, suspicious: Vec<String>) -> Self {
        Self { high, suspicious }
    }
}

impl Default for StaticReputation {
    fn default() -> Self {
        let high = [
            "wikimedia.org",
            "wikipedia.org",
            "britannica.com",
            "khanacademy.org",
            "nasa.gov",
            "nationalgeographic.com",
            "bbc.co.uk",
            "bbc.com",
            "reuters.com",
            "apnews.com",
        ];
        let suspicious = [
            "pornhub.com",
            "xvideos.com",
            "xnxx.com",
            "redtube.com",
            "youporn.com",
            "xhamster.com",
            "spankbang.com",
            "onlyfans.com",
            "fansly.com",
            "chaturbate.com",
            "livejasmin.com",
            "stripchat.com",
            "rule34.xxx",
            "e621.net",
            "gelbooru.com",
            "nhentai.net",
            "hanime.tv",
            "bestgore.com",
            "theync.com",
            "kaotic.com",
        ];
        Self {
            high: high.iter().map(|s| s.to_string()).collect(),
            suspicious: suspicious.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DomainReputation for StaticReputation {
    fn trust_for(&self, host: &str) -> TrustLevel {
        let host = host.to_ascii_lowercase();
        if self.suspicious.iter().any(|d| host_matches(&host, d)) {
            return TrustLevel::Suspicious;
        }
        if self.high.iter().any(|d| host_matches(&host, d)) {
            return TrustLevel::High;
        }
        TrustLevel::Neutral
    }
}

/// Allowlist of sources whose content skips classification entirely.
///
/// Only hosts serving curated, moderated content belong here; CDNs that
/// serve arbitrary user content, search engines, and social media do not.
#[derive(Debug, Clone)]
pub struct TrustedSources {
    domains: Vec<String>,
}

impl TrustedSources {
    /// Creates an allowlist from explicit domains.
    pub fn new(domains: Vec<String>) -> Self {
        Self { domains }
    }

    /// Empty allowlist: nothing short-circuits.
    pub fn none() -> Self {
        Self { domains: Vec::new() }
    }

    /// Returns true if the host is on the allowlist.
    pub fn is_trusted_host(&self, host: &str) -> bool {
        if host.is_empty() {
            return false;
        }
        let host = host.to_ascii_lowercase();
        self.domains.iter().any(|d| host_matches(&host, d))
    }

    /// Returns true if the URL's host is on the allowlist.
    pub fn is_trusted_url(&self, url: &str) -> bool {
        match host_of(url) {
            Some(host) => self.is_trusted_host(&host),
            None => false,
        }
    }
}

impl Default for TrustedSources {
    fn default() -> Self {
        let domains = [
            // Educational institutions, curated content only
            "wikimedia.org",
            "wikipedia.org",
            "britannica.com",
            "khanacademy.org",
            "coursera.org",
            "edx.org",
            "mit.edu",
            "stanford.edu",
            "harvard.edu",
            "yale.edu",
            "nasa.gov",
            "nationalgeographic.com",
            // Professional journalism
            "bbc.co.uk",
            "bbc.com",
            "reuters.com",
            "apnews.com",
        ];
        Self {
            domains: domains.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_of_handles_common_shapes() {
        assert_eq!(
            host_of("https://upload.wikimedia.org/a/b.jpg").as_deref(),
            Some("upload.wikimedia.org")
        );
        assert_eq!(
            host_of("http://Example.COM:8080/path?q=1").as_deref(),
            Some("example.com")
        );
        assert_eq!(host_of("example.org/path").as_deref(), Some("example.org"));
        assert_eq!(host_of("https://"), None);
    }

    #[test]
    fn suffix_match_is_strict() {
        let trusted = TrustedSources::default();
        assert!(trusted.is_trusted_host("wikipedia.org"));
        assert!(trusted.is_trusted_host("en.wikipedia.org"));
        assert!(!trusted.is_trusted_host("wikipedia.org.evil.example"));
        assert!(!trusted.is_trusted_host("notwikipedia.org"));
        assert!(!trusted.is_trusted_host(""));
    }

    #[test]
    fn trusted_url_goes_through_host_extraction() {
        let trusted = TrustedSources::default();
        assert!(trusted.is_trusted_url("https://upload.wikimedia.org/img.png"));
        assert!(!trusted.is_trusted_url("https://cdn.example.com/img.png"));
        assert!(!trusted.is_trusted_url("not a url at all "));
    }

    #[test]
    fn reputation_classifies_hosts() {
        let rep = StaticReputation::default();
        assert_eq!(rep.trust_for("en.wikipedia.org"), TrustLevel::High);
        assert_eq!(rep.trust_for("cdn.pornhub.com"), TrustLevel::Suspicious);
        assert_eq!(rep.trust_for("example.com"), TrustLevel::Neutral);
    }

    #[test]
    fn baseline_scores_track_trust() {
        assert_eq!(TrustLevel::High.baseline_network_score(), 0.0);
        assert_eq!(TrustLevel::Neutral.baseline_network_score(), 25.0);
        assert_eq!(TrustLevel::Suspicious.baseline_network_score(), 75.0);
    }
}
