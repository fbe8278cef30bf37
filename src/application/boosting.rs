use crate::domain::labels::Direction;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Hyperparameters for the boosted ensemble. Shallow trees with shrinkage;
/// the defaults are sized for daily-bar training windows of a few hundred
/// rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingParams {
    /// Boosting rounds (trees per class).
    pub rounds: usize,
    /// Shrinkage applied to every tree's contribution.
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            rounds: 50,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 5,
            min_samples_split: 10,
        }
    }
}

/// Multiclass gradient boosting with multinomial log-loss.
///
/// Maintains one additive score function F_k per class, initialized to the
/// log class prior. Each round fits one regression tree per class to the
/// softmax residuals (one-hot minus predicted probability) and adds its
/// shrunken output to F_k. Predicted probabilities are softmax(F).
#[derive(Serialize, Deserialize)]
pub struct GradientBoostClassifier {
    params: BoostingParams,
    base_scores: Vec<f64>,
    /// rounds[m][k] = round m's tree for class k.
    rounds: Vec<Vec<Tree>>,
}

impl GradientBoostClassifier {
    pub fn fit(x: &[Vec<f64>], y: &[Direction], params: BoostingParams) -> Result<Self> {
        let n = x.len();
        if n == 0 || n != y.len() {
            return Err(anyhow!(
                "Training set shape mismatch: {} feature rows, {} labels",
                n,
                y.len()
            ));
        }

        let matrix =
            DenseMatrix::from_2d_vec(&x.to_vec()).map_err(|e| anyhow!("Matrix error: {e}"))?;

        // Smoothed log priors keep an absent class finite.
        let mut counts = [0usize; Direction::COUNT];
        for &label in y {
            counts[label.index()] += 1;
        }
        let base_scores: Vec<f64> = counts
            .iter()
            .map(|&c| (((c + 1) as f64) / ((n + Direction::COUNT) as f64)).ln())
            .collect();

        let mut scores: Vec<Vec<f64>> = vec![base_scores.clone(); n];
        let mut rounds: Vec<Vec<Tree>> = Vec::with_capacity(params.rounds);

        let tree_params = || {
            DecisionTreeRegressorParameters::default()
                .with_max_depth(params.max_depth)
                .with_min_samples_leaf(params.min_samples_leaf)
                .with_min_samples_split(params.min_samples_split)
        };

        for _ in 0..params.rounds {
            let probs: Vec<Vec<f64>> = scores.iter().map(|row| softmax(row)).collect();
            let mut round_trees = Vec::with_capacity(Direction::COUNT);

            for class in 0..Direction::COUNT {
                let residuals: Vec<f64> = (0..n)
                    .map(|i| {
                        let target = if y[i].index() == class { 1.0 } else { 0.0 };
                        target - probs[i][class]
                    })
                    .collect();

                let tree = DecisionTreeRegressor::fit(&matrix, &residuals, tree_params())
                    .map_err(|e| anyhow!("Tree fit error: {e}"))?;
                let updates = tree
                    .predict(&matrix)
                    .map_err(|e| anyhow!("Tree predict error: {e}"))?;
                for (i, update) in updates.iter().enumerate() {
                    scores[i][class] += params.learning_rate * update;
                }
                round_trees.push(tree);
            }
            rounds.push(round_trees);
        }

        Ok(Self {
            params,
            base_scores,
            rounds,
        })
    }

    /// Raw additive scores F_k for one feature row.
    pub fn decision_scores(&self, row: &[f64]) -> Result<Vec<f64>> {
        let matrix = DenseMatrix::from_2d_vec(&vec![row.to_vec()])
            .map_err(|e| anyhow!("Matrix error: {e}"))?;
        let mut scores = self.base_scores.clone();
        for round in &self.rounds {
            for (class, tree) in round.iter().enumerate() {
                let pred = tree
                    .predict(&matrix)
                    .map_err(|e| anyhow!("Tree predict error: {e}"))?;
                scores[class] += self.params.learning_rate * pred[0];
            }
        }
        Ok(scores)
    }

    /// Class probabilities for one feature row: softmax over the raw scores.
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>> {
        Ok(softmax(&self.decision_scores(row)?))
    }

    /// Batch probabilities, one tree traversal per tree instead of per row.
    pub fn predict_proba_batch(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let n = x.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let matrix =
            DenseMatrix::from_2d_vec(&x.to_vec()).map_err(|e| anyhow!("Matrix error: {e}"))?;
        let mut scores: Vec<Vec<f64>> = vec![self.base_scores.clone(); n];
        for round in &self.rounds {
            for (class, tree) in round.iter().enumerate() {
                let preds = tree
                    .predict(&matrix)
                    .map_err(|e| anyhow!("Tree predict error: {e}"))?;
                for (i, pred) in preds.iter().enumerate() {
                    scores[i][class] += self.params.learning_rate * pred;
                }
            }
        }
        Ok(scores.iter().map(|row| softmax(row)).collect())
    }

    /// Most probable class for one feature row.
    pub fn predict_class(&self, row: &[f64]) -> Result<Direction> {
        let probs = self.predict_proba(row)?;
        Ok(argmax_direction(&probs))
    }
}

pub fn argmax_direction(probs: &[f64]) -> Direction {
    let mut best = 0;
    for (i, &p) in probs.iter().enumerate() {
        if p > probs[best] {
            best = i;
        }
    }
    Direction::from_index(best).unwrap_or(Direction::Flat)
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|&e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Separable three-class problem: the first feature alone decides the
    /// label.
    fn separable_data() -> (Vec<Vec<f64>>, Vec<Direction>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let jitter = (i % 7) as f64 * 0.01;
            x.push(vec![1.0 + jitter, 0.5]);
            y.push(Direction::Up);
            x.push(vec![-1.0 - jitter, 0.5]);
            y.push(Direction::Down);
            x.push(vec![0.0 + jitter * 0.1, 0.5]);
            y.push(Direction::Flat);
        }
        (x, y)
    }

    #[test]
    fn test_learns_separable_classes() {
        let (x, y) = separable_data();
        let model = GradientBoostClassifier::fit(&x, &y, BoostingParams::default()).unwrap();

        assert_eq!(model.predict_class(&[1.2, 0.5]).unwrap(), Direction::Up);
        assert_eq!(model.predict_class(&[-1.2, 0.5]).unwrap(), Direction::Down);
        assert_eq!(model.predict_class(&[0.01, 0.5]).unwrap(), Direction::Flat);

        let probs = model.predict_proba(&[1.2, 0.5]).unwrap();
        assert!(probs[Direction::Up.index()] > 0.8);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = separable_data();
        let model = GradientBoostClassifier::fit(&x, &y, BoostingParams::default()).unwrap();

        for row in &x {
            let probs = model.predict_proba(row).unwrap();
            let sum: f64 = probs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_batch_matches_single_row() {
        let (x, y) = separable_data();
        let model = GradientBoostClassifier::fit(&x, &y, BoostingParams::default()).unwrap();

        let batch = model.predict_proba_batch(&x[..5].to_vec()).unwrap();
        for (i, row) in x[..5].iter().enumerate() {
            let single = model.predict_proba(row).unwrap();
            for k in 0..Direction::COUNT {
                assert!((batch[i][k] - single[k]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_empty_training_set_rejected() {
        let result = GradientBoostClassifier::fit(&[], &[], BoostingParams::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_roundtrip_preserves_predictions() {
        let (x, y) = separable_data();
        let params = BoostingParams {
            rounds: 10,
            ..Default::default()
        };
        let model = GradientBoostClassifier::fit(&x, &y, params).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: GradientBoostClassifier = serde_json::from_str(&json).unwrap();

        let before = model.predict_proba(&[1.0, 0.5]).unwrap();
        let after = restored.predict_proba(&[1.0, 0.5]).unwrap();
        for k in 0..Direction::COUNT {
            assert!((before[k] - after[k]).abs() < 1e-12);
        }
    }
}
