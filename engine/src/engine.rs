use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    blend::{BlendConfig, ScoreBlender},
    canonical::canonicalize,
    error::AppError,
    features::FeatureExtractor,
    model::Classifier,
    rules::{risk_from_hits, RuleEngine},
    suffix::SuffixLookup,
    types::ScoreResult,
};

/// Canonicalize, extract, classify, evaluate rules, blend. Holds no
/// per-request state, so one instance serves every request concurrently.
pub struct TrustEngine {
    classifier: Arc<dyn Classifier>,
    extractor: Arc<FeatureExtractor>,
    rules: RuleEngine,
    blender: ScoreBlender,
}

impl TrustEngine {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        suffixes: Arc<dyn SuffixLookup>,
        blend: BlendConfig,
    ) -> Self {
        let extractor = Arc::new(FeatureExtractor::new(suffixes));
        info!(
            "Trust engine ready (classifier {}, ml_weight {}, heuristic_weight {})",
            classifier.version(),
            blend.ml_weight,
            blend.heuristic_weight
        );
        Self {
            classifier,
            rules: RuleEngine::new(extractor.clone()),
            extractor,
            blender: ScoreBlender::new(blend),
        }
    }

    pub fn score(&self, url: &str) -> Result<ScoreResult, AppError> {
        let canonical = canonicalize(url);
        let features = self.extractor.extract(&canonical);

        let ml_probability = self.classifier.predict_probability(&features.as_array())?;

        let hits = self.rules.evaluate_with(&canonical, &features);
        let heuristic_risk = risk_from_hits(&hits);

        debug!(
            canonical = %canonical,
            ml = ml_probability,
            heuristic = heuristic_risk,
            "components computed"
        );

        let result = self
            .blender
            .blend(url, &canonical, ml_probability, heuristic_risk, hits);

        debug!(
            "Scored {} -> {} ({})",
            result.canonical_url, result.trust_score, result.verdict
        );
        Ok(result)
    }

    pub fn model_version(&self) -> &str {
        self.classifier.version()
    }

    pub fn blend_config(&self) -> &BlendConfig {
        self.blender.config()
    }
}
