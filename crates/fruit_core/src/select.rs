use crate::labels::FruitClass;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectError {
    #[error("expected {expected} scores, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("score at index {index} is not a non-negative number: {value}")]
    InvalidScore { index: usize, value: f64 },
}

/// Winning class of a single classification output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestClass {
    pub class: FruitClass,
    /// The raw maximum score, not normalized.
    pub score: f64,
    /// `score` rendered with two decimals.
    pub percentage: String,
}

/// Pick the class with the highest score from a six-element model output.
///
/// Scores are taken as-is. When the maximum occurs more than once the lowest
/// index wins.
pub fn best_class(output: &[f64]) -> Result<BestClass, SelectError> {
    if output.len() != FruitClass::ALL.len() {
        return Err(SelectError::Length {
            expected: FruitClass::ALL.len(),
            actual: output.len(),
        });
    }
    if let Some((index, &value)) = output
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(SelectError::InvalidScore { index, value });
    }

    let mut best_idx = 0;
    for (idx, &score) in output.iter().enumerate().skip(1) {
        if score > output[best_idx] {
            best_idx = idx;
        }
    }
    let score = output[best_idx];
    let class = FruitClass::from_index(best_idx).ok_or(SelectError::Length {
        expected: FruitClass::ALL.len(),
        actual: output.len(),
    })?;

    Ok(BestClass {
        class,
        score,
        percentage: format!("{score:.2}"),
    })
}
