use serde::{Deserialize, Serialize};

use crate::types::{RiskBreakdown, RuleHit, ScoreResult, Verdict};

pub const ML_WEIGHT: f64 = 0.30;
pub const HEURISTIC_WEIGHT: f64 = 0.70;
pub const SAFE_THRESHOLD: u8 = 70;
pub const SUSPICIOUS_THRESHOLD: u8 = 40;

/// Blend weights and verdict bands. Fixed per deployment; callers never
/// influence them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlendConfig {
    pub ml_weight: f64,
    pub heuristic_weight: f64,
    pub safe_threshold: u8,
    pub suspicious_threshold: u8,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            ml_weight: ML_WEIGHT,
            heuristic_weight: HEURISTIC_WEIGHT,
            safe_threshold: SAFE_THRESHOLD,
            suspicious_threshold: SUSPICIOUS_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreBlender {
    config: BlendConfig,
}

impl ScoreBlender {
    pub fn new(config: BlendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BlendConfig {
        &self.config
    }

    pub fn final_risk(&self, ml_probability: f64, heuristic_risk: f64) -> f64 {
        let blended = self.config.ml_weight * clamp_unit(ml_probability)
            + self.config.heuristic_weight * clamp_unit(heuristic_risk);
        clamp_unit(blended)
    }

    pub fn verdict(&self, trust_score: u8) -> Verdict {
        Verdict::from_trust_score(
            trust_score,
            self.config.safe_threshold,
            self.config.suspicious_threshold,
        )
    }

    pub fn blend(
        &self,
        url_input: &str,
        canonical_url: &str,
        ml_probability: f64,
        heuristic_risk: f64,
        hits: Vec<RuleHit>,
    ) -> ScoreResult {
        let final_risk = self.final_risk(ml_probability, heuristic_risk);
        let trust_score = trust_score(final_risk);

        ScoreResult {
            url_input: url_input.to_string(),
            canonical_url: canonical_url.to_string(),
            trust_score,
            verdict: self.verdict(trust_score),
            risk: RiskBreakdown {
                r#final: final_risk,
                ml: clamp_unit(ml_probability),
                heuristic: clamp_unit(heuristic_risk),
            },
            feature_names: ScoreResult::feature_names(),
            reasons: hits,
        }
    }
}

/// `round(100 * (1 - risk))`, ties to even.
pub fn trust_score(final_risk: f64) -> u8 {
    (100.0 * (1.0 - clamp_unit(final_risk))).round_ties_even() as u8
}

/// Clamps into [0, 1]. NaN is treated as maximum risk.
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
