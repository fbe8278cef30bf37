use crate::domain::labels::Direction;
use crate::domain::prediction::ProbabilityTriple;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Discrete trading action derived from a probability triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Hold,
    Short,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Hold => write!(f, "HOLD"),
            Action::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    /// Probability of the class that drove the action. For a HOLD issued
    /// because no directional class cleared the threshold, this is P(Flat).
    pub confidence: f64,
}

/// Map a probability triple and confidence threshold to an action.
///
/// Deterministic: identical inputs always yield the identical action and
/// confidence. Both directional classes clearing the threshold at once is
/// impossible for a normalized triple with threshold > 0.5, but the guard
/// stays: that input is inconsistent and resolves to HOLD, never to the
/// larger of the two.
pub fn recommend(probabilities: &ProbabilityTriple, threshold: f64) -> Recommendation {
    let up_clears = probabilities.up >= threshold;
    let down_clears = probabilities.down >= threshold;

    if up_clears && down_clears {
        warn!(
            up = probabilities.up,
            down = probabilities.down,
            threshold,
            "Inconsistent probability triple: both directional classes clear the threshold"
        );
        return Recommendation {
            action: Action::Hold,
            confidence: probabilities.of(Direction::Flat),
        };
    }

    if up_clears {
        Recommendation {
            action: Action::Buy,
            confidence: probabilities.up,
        }
    } else if down_clears {
        Recommendation {
            action: Action::Short,
            confidence: probabilities.down,
        }
    } else {
        Recommendation {
            action: Action::Hold,
            confidence: probabilities.of(Direction::Flat),
        }
    }
}
