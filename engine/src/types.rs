use serde::{Deserialize, Serialize};

use crate::features::FEATURE_NAMES;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Safe,
    Suspicious,
    Dangerous,
}

impl Verdict {
    /// Closed, ordered mapping: first matching band wins.
    pub fn from_trust_score(trust_score: u8, safe_threshold: u8, suspicious_threshold: u8) -> Self {
        if trust_score >= safe_threshold {
            Verdict::Safe
        } else if trust_score >= suspicious_threshold {
            Verdict::Suspicious
        } else {
            Verdict::Dangerous
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Suspicious => "SUSPICIOUS",
            Verdict::Dangerous => "DANGEROUS",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One triggered heuristic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleHit {
    pub code: String,
    pub points: u32,
    pub message: String,
}

impl RuleHit {
    pub fn new(code: &str, points: u32, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            points,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskBreakdown {
    pub r#final: f64,
    pub ml: f64,
    pub heuristic: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    pub url_input: String,
    pub canonical_url: String,
    pub trust_score: u8,
    pub verdict: Verdict,
    pub risk: RiskBreakdown,
    pub feature_names: Vec<String>,
    pub reasons: Vec<RuleHit>,
}

impl ScoreResult {
    pub fn feature_names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub status: String,
    pub version: String,
    pub model_version: String,
    pub timestamp: String,
}
