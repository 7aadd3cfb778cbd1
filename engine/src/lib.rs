pub mod blend;
pub mod canonical;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod model;
pub mod parts;
pub mod routes;
pub mod rules;
pub mod suffix;
pub mod types;

pub use blend::{BlendConfig, ScoreBlender};
pub use canonical::canonicalize;
pub use engine::TrustEngine;
pub use error::AppError;
pub use features::{FeatureExtractor, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use model::{Classifier, LinearModel, ModelError};
pub use rules::RuleEngine;
pub use suffix::{PublicSuffixTable, SuffixLookup};
pub use types::{RuleHit, ScoreResult, Verdict};
