//! Combine the per-image results of one batch into a single verdict.

use crate::grade::Grade;
use crate::wire::PerImageResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("cannot aggregate an empty batch")]
    Empty,
    #[error("batch sequences differ in length: {labels} labels, {grades} grades, {scores} scores")]
    LengthMismatch {
        labels: usize,
        grades: usize,
        scores: usize,
    },
}

/// Overall result for a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult<G> {
    pub overall_label: String,
    pub overall_grade: G,
    /// Mean score rounded to two decimals.
    pub overall_score: f64,
}

impl<G> AggregateResult<G> {
    pub fn formatted_score(&self) -> String {
        format!("{:.2}", self.overall_score)
    }
}

/// Aggregate parallel label, grade and score sequences.
///
/// * label: most frequent; a label only takes the lead when its running
///   count strictly exceeds the leader's, so earlier labels win ties.
/// * grade: minimum under `G`'s ordering.
/// * score: arithmetic mean rounded to two decimals.
pub fn aggregate<S, G>(
    labels: &[S],
    grades: &[G],
    scores: &[f64],
) -> Result<AggregateResult<G>, AggregateError>
where
    S: AsRef<str>,
    G: Ord + Clone,
{
    if labels.len() != grades.len() || labels.len() != scores.len() {
        return Err(AggregateError::LengthMismatch {
            labels: labels.len(),
            grades: grades.len(),
            scores: scores.len(),
        });
    }
    let overall_grade = grades.iter().min().cloned().ok_or(AggregateError::Empty)?;
    Ok(AggregateResult {
        overall_label: majority_label(labels)?,
        overall_grade,
        overall_score: mean_score(scores)?,
    })
}

/// Aggregate decoded per-image results.
///
/// Images without a grade are ignored for the grade minimum; the overall
/// grade is `None` when no image carries one.
pub fn aggregate_results(
    results: &[PerImageResult],
) -> Result<AggregateResult<Option<Grade>>, AggregateError> {
    let labels: Vec<&str> = results.iter().map(|r| r.label.as_str()).collect();
    let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
    Ok(AggregateResult {
        overall_label: majority_label(&labels)?,
        overall_grade: results.iter().filter_map(|r| r.grade.clone()).min(),
        overall_score: mean_score(&scores)?,
    })
}

fn majority_label<S: AsRef<str>>(labels: &[S]) -> Result<String, AggregateError> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut leader: Option<(&str, usize)> = None;
    for label in labels {
        let label = label.as_ref();
        let count = match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, c)) => {
                *c += 1;
                *c
            }
            None => {
                counts.push((label, 1));
                1
            }
        };
        if leader.is_none_or(|(_, best)| count > best) {
            leader = Some((label, count));
        }
    }
    leader
        .map(|(label, _)| label.to_string())
        .ok_or(AggregateError::Empty)
}

fn mean_score(scores: &[f64]) -> Result<f64, AggregateError> {
    if scores.is_empty() {
        return Err(AggregateError::Empty);
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    Ok(round2(mean))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
