use crate::application::trainer::ModelArtifact;
use crate::domain::errors::ForecastError;
use crate::domain::features::{FEATURE_SCHEMA_VERSION, FeatureVector};
use crate::domain::labels::Direction;
use crate::domain::prediction::{PROBABILITY_TOLERANCE, ProbabilityTriple};

/// Produces the three-class probability triple for one (ticker, horizon)
/// from its latest feature vector and current model artifact.
///
/// Normalization is this component's contract: the classifier's raw additive
/// scores pass through softmax here, and the result is verified to sum to 1
/// within tolerance. A triple that cannot be normalized aborts the
/// (ticker, horizon) instead of shipping garbage probabilities. A missing
/// artifact is the caller's signal to report the horizon as unavailable,
/// never to fabricate a default.
pub struct MultiHorizonPredictor;

impl MultiHorizonPredictor {
    pub fn predict(
        artifact: &ModelArtifact,
        latest: &FeatureVector,
    ) -> Result<ProbabilityTriple, ForecastError> {
        if artifact.schema_version != FEATURE_SCHEMA_VERSION {
            return Err(ForecastError::SchemaMismatch {
                expected: artifact.schema_version.clone(),
                found: FEATURE_SCHEMA_VERSION.to_string(),
            });
        }

        let probs = artifact.model.predict_proba(latest.values()).map_err(|_| {
            ForecastError::NormalizationFailure {
                symbol: artifact.ticker.clone(),
                horizon: artifact.horizon,
                sum: f64::NAN,
            }
        })?;

        let mut triple = ProbabilityTriple::new(
            probs[Direction::Down.index()],
            probs[Direction::Flat.index()],
            probs[Direction::Up.index()],
        );

        // Softmax output should already be normalized; one corrective rescale
        // is allowed before giving up.
        if !triple.is_normalized() {
            let sum = triple.sum();
            if sum.is_finite() && sum > 0.0 {
                triple = ProbabilityTriple::new(
                    triple.down / sum,
                    triple.flat / sum,
                    triple.up / sum,
                );
            }
            if !triple.is_normalized() {
                return Err(ForecastError::NormalizationFailure {
                    symbol: artifact.ticker.clone(),
                    horizon: artifact.horizon,
                    sum,
                });
            }
        }

        debug_assert!((triple.sum() - 1.0).abs() <= PROBABILITY_TOLERANCE);
        Ok(triple)
    }
}
