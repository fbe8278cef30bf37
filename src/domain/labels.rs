use crate::domain::series::AlignedSeries;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-class directional outcome over one horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Flat,
    Up,
}

impl Direction {
    pub const COUNT: usize = 3;
    pub const ALL: [Direction; 3] = [Direction::Down, Direction::Flat, Direction::Up];

    pub fn index(self) -> usize {
        match self {
            Direction::Down => 0,
            Direction::Flat => 1,
            Direction::Up => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Direction> {
        match index {
            0 => Some(Direction::Down),
            1 => Some(Direction::Flat),
            2 => Some(Direction::Up),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Down => "Down",
            Direction::Flat => "Flat",
            Direction::Up => "Up",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Classifies forward returns into Down/Flat/Up with a symmetric dead-zone.
///
/// Flat is |forward return| <= dead_zone, not an arbitrary midpoint. The
/// dead-zone width travels with every model artifact trained from these
/// labels.
#[derive(Debug, Clone, Copy)]
pub struct Labeler {
    pub horizon: usize,
    pub dead_zone: f64,
}

impl Labeler {
    pub fn new(horizon: usize, dead_zone: f64) -> Self {
        Self { horizon, dead_zone }
    }

    /// Label the observation at `index`, or None when `index + horizon` runs
    /// off the end of history (the pair is excluded from training).
    pub fn label(&self, prices: &AlignedSeries, index: usize) -> Option<Direction> {
        let future = index.checked_add(self.horizon)?;
        if future >= prices.len() {
            return None;
        }
        let now = prices.value_at(index);
        if now == 0.0 {
            return None;
        }
        let forward_return = prices.value_at(future) / now - 1.0;
        Some(self.classify(forward_return))
    }

    pub fn classify(&self, forward_return: f64) -> Direction {
        if forward_return > self.dead_zone {
            Direction::Up
        } else if forward_return < -self.dead_zone {
            Direction::Down
        } else {
            Direction::Flat
        }
    }
}
