use std::sync::Arc;
use tracing::debug;

use crate::{
    features::{FeatureExtractor, FeatureVector},
    parts::{with_default_scheme, UrlParts},
    types::RuleHit,
};

// Calibration constants. Changing any of these changes every trust score.
pub const IP_HOST_POINTS: u32 = 55;
pub const AT_SYMBOL_POINTS: u32 = 25;
pub const NO_HTTPS_POINTS: u32 = 15;
pub const VERY_LONG_POINTS: u32 = 12;
pub const MANY_SUBDOMAINS_POINTS: u32 = 15;
pub const SUSPICIOUS_TOKENS_POINTS: u32 = 20;
pub const SUSPICIOUS_EXT_POINTS: u32 = 35;
pub const SUSPICIOUS_PORT_POINTS: u32 = 18;

pub const VERY_LONG_URL_LEN: f64 = 120.0;
pub const MANY_SUBDOMAINS_MIN: f64 = 3.0;
pub const SUSPICIOUS_TOKENS_MIN: f64 = 2.0;

/// Points that saturate heuristic risk at 1.0.
pub const RISK_POINT_DIVISOR: f64 = 100.0;

/// File endings typical of malware-delivery URLs.
pub const SUSPICIOUS_EXTENSIONS: [&str; 14] = [
    ".sh", ".exe", ".ps1", ".bat", ".cmd", ".js", ".vbs", ".scr", ".msi", ".apk", ".jar", ".zip",
    ".rar", ".7z",
];

/// Legitimate but over-represented in throwaway hosting.
pub const SUSPICIOUS_PORTS: [u16; 13] = [
    81, 82, 83, 444, 8000, 8080, 8081, 8888, 1337, 2082, 2083, 2095, 2096,
];

/// Independent, point-weighted checks. Every check runs; none short-circuits
/// another, and hits come back in evaluation order.
pub struct RuleEngine {
    extractor: Arc<FeatureExtractor>,
}

impl RuleEngine {
    pub fn new(extractor: Arc<FeatureExtractor>) -> Self {
        Self { extractor }
    }

    pub fn evaluate(&self, url: &str) -> Vec<RuleHit> {
        let features = self.extractor.extract(url);
        self.evaluate_with(url, &features)
    }

    /// Same as `evaluate`, reusing features already extracted for `url`.
    pub fn evaluate_with(&self, url: &str, features: &FeatureVector) -> Vec<RuleHit> {
        let url = with_default_scheme(url);
        let parts = UrlParts::split(&url);
        let mut hits = Vec::new();

        if features.has_ip_host == 1.0 {
            hits.push(RuleHit::new(
                "ip_host",
                IP_HOST_POINTS,
                "URL uses a raw IP address as host (strong malicious indicator).",
            ));
        }

        if features.has_at_symbol == 1.0 {
            hits.push(RuleHit::new(
                "at_symbol",
                AT_SYMBOL_POINTS,
                "URL contains '@' which can be used to mislead users.",
            ));
        }

        if !parts.scheme.eq_ignore_ascii_case("https") {
            hits.push(RuleHit::new("no_https", NO_HTTPS_POINTS, "URL is not using HTTPS."));
        }

        if features.url_len > VERY_LONG_URL_LEN {
            hits.push(RuleHit::new("very_long", VERY_LONG_POINTS, "URL is unusually long."));
        }

        if features.num_subdomains >= MANY_SUBDOMAINS_MIN {
            hits.push(RuleHit::new(
                "many_subdomains",
                MANY_SUBDOMAINS_POINTS,
                "URL has many subdomains (can be used for spoofing).",
            ));
        }

        if features.suspicious_token_count >= SUSPICIOUS_TOKENS_MIN {
            hits.push(RuleHit::new(
                "suspicious_tokens",
                SUSPICIOUS_TOKENS_POINTS,
                "URL contains multiple suspicious keywords (login/verify/etc.).",
            ));
        }

        if let Some(ext) = suspicious_extension(parts.path) {
            hits.push(RuleHit::new(
                "suspicious_ext",
                SUSPICIOUS_EXT_POINTS,
                format!("URL path ends with a suspicious file type ({ext})."),
            ));
        }

        if let Some(port) = parts.port().filter(|port| SUSPICIOUS_PORTS.contains(port)) {
            hits.push(RuleHit::new(
                "suspicious_port",
                SUSPICIOUS_PORT_POINTS,
                format!("URL uses an uncommon port ({port}), often seen in suspicious hosting."),
            ));
        }

        debug!(url = %url, hits = hits.len(), "rules evaluated");
        hits
    }

    /// `min(1, points / 100)` together with the hits that produced it.
    pub fn heuristic_risk(&self, url: &str) -> (f64, Vec<RuleHit>) {
        let hits = self.evaluate(url);
        (risk_from_hits(&hits), hits)
    }
}

pub fn risk_from_hits(hits: &[RuleHit]) -> f64 {
    let points: u32 = hits.iter().map(|hit| hit.points).sum();
    (points as f64 / RISK_POINT_DIVISOR).min(1.0)
}

fn suspicious_extension(path: &str) -> Option<&'static str> {
    let path = path.to_lowercase();
    SUSPICIOUS_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| path.ends_with(ext))
}
