//! JSON body returned by the prediction endpoint.
//!
//! Older deployments answer one image with a flat six-element `output`, a
//! single `Grade` string and a single `result`; batch deployments answer
//! with one row, grade and label per image.

use crate::grade::{Grade, grade_for};
use crate::labels::FruitClass;
use crate::select::{SelectError, best_class};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("response contained no classification rows")]
    Empty,
    #[error("response shape mismatch: {rows} rows but {field} has {len} entries")]
    Shape {
        rows: usize,
        field: &'static str,
        len: usize,
    },
    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: SelectError,
    },
    #[error("invalid response body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result for one submitted image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerImageResult {
    pub label: String,
    pub score: f64,
    pub grade: Option<Grade>,
}

impl PerImageResult {
    /// Fill a missing grade using the service's thresholds. `score` is read
    /// as a percentage, which is how the service reports it.
    pub fn fill_grade(&mut self) {
        if self.grade.is_some() {
            return;
        }
        if let Ok(class) = self.label.parse::<FruitClass>() {
            self.grade = Some(grade_for(class, self.score));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Output {
    Single(Vec<f64>),
    Batch(Vec<Vec<f64>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub output: Output,
    #[serde(rename = "Grade", default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<OneOrMany<Grade>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OneOrMany<String>>,
}

impl PredictionResponse {
    pub fn from_json(body: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Number of images this response describes.
    pub fn rows(&self) -> usize {
        match &self.output {
            Output::Single(_) => 1,
            Output::Batch(rows) => rows.len(),
        }
    }

    pub fn into_results(self) -> Result<Vec<PerImageResult>, WireError> {
        let rows = match self.output {
            Output::Single(scores) => vec![scores],
            Output::Batch(rows) => rows,
        };
        let n = rows.len();
        if n == 0 {
            return Err(WireError::Empty);
        }

        let labels = spread(self.result, n, "result", false)?;
        let grades = spread(self.grade, n, "Grade", true)?;

        rows.iter()
            .zip(labels)
            .zip(grades)
            .enumerate()
            .map(|(row, ((scores, label), grade))| {
                let best = best_class(scores).map_err(|source| WireError::Row { row, source })?;
                Ok(PerImageResult {
                    label: label.unwrap_or_else(|| best.class.to_string()),
                    score: best.score,
                    grade,
                })
            })
            .collect()
    }
}

/// Expand an optional one-or-many field to exactly `n` entries. A single
/// value only spreads over several rows when `broadcast` is set.
fn spread<T: Clone>(
    field: Option<OneOrMany<T>>,
    n: usize,
    name: &'static str,
    broadcast: bool,
) -> Result<Vec<Option<T>>, WireError> {
    match field {
        None => Ok(vec![None; n]),
        Some(OneOrMany::One(v)) if n == 1 || broadcast => Ok(vec![Some(v); n]),
        Some(OneOrMany::Many(v)) if v.len() == n => Ok(v.into_iter().map(Some).collect()),
        Some(other) => Err(WireError::Shape {
            rows: n,
            field: name,
            len: other.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flat_output_uses_selector_when_result_is_missing() {
        let resp =
            PredictionResponse::from_json(r#"{"output":[0.1,0.9,0.05,0.02,0.01,0.0],"Grade":"A"}"#)
                .unwrap();
        let results = resp.into_results().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "freshBananas");
        assert_relative_eq!(results[0].score, 0.9);
        assert_eq!(results[0].grade, Some(Grade::from("A")));
    }

    #[test]
    fn flat_output_with_scalar_result_from_service() {
        let body = r#"{"output":[1.2,0.3,0.0,96.5,2.0,0.0],"result":"rottenApples","Grade":"C"}"#;
        let results = PredictionResponse::from_json(body)
            .unwrap()
            .into_results()
            .unwrap();
        assert_eq!(results[0].label, "rottenApples");
        assert_relative_eq!(results[0].score, 96.5);
    }

    #[test]
    fn batch_output_pairs_rows_with_labels_and_grades() {
        let body = r#"{
            "output": [[0.9,0,0,0,0,0],[0,0,0,0,0.7,0.1]],
            "Grade": ["A", "B"],
            "result": ["freshApples", "rottenBananas"]
        }"#;
        let results = PredictionResponse::from_json(body)
            .unwrap()
            .into_results()
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].label, "rottenBananas");
        assert_eq!(results[1].grade, Some(Grade::from("B")));
        assert_relative_eq!(results[1].score, 0.7);
    }

    #[test]
    fn single_grade_is_broadcast_over_batch() {
        let body = r#"{"output": [[0.9,0,0,0,0,0],[0,0.8,0,0,0,0]], "Grade": 2}"#;
        let results = PredictionResponse::from_json(body)
            .unwrap()
            .into_results()
            .unwrap();
        assert!(results.iter().all(|r| r.grade == Some(Grade::from(2.0))));
        assert_eq!(results[1].label, "freshBananas");
    }

    #[test]
    fn label_count_mismatch_is_rejected() {
        let body = r#"{"output": [[0.9,0,0,0,0,0],[0,0.8,0,0,0,0]], "result": ["freshApples"]}"#;
        let err = PredictionResponse::from_json(body)
            .unwrap()
            .into_results()
            .unwrap_err();
        assert!(matches!(
            err,
            WireError::Shape {
                rows: 2,
                field: "result",
                len: 1
            }
        ));
    }

    #[test]
    fn short_row_reports_its_index() {
        let body = r#"{"output": [[0.9,0,0,0,0,0],[0.1,0.2]]}"#;
        let err = PredictionResponse::from_json(body)
            .unwrap()
            .into_results()
            .unwrap_err();
        assert!(matches!(err, WireError::Row { row: 1, .. }));
    }

    #[test]
    fn empty_batch_is_rejected() {
        let resp = PredictionResponse::from_json(r#"{"output": [[]]}"#).unwrap();
        assert!(resp.into_results().is_err());
        let resp = PredictionResponse {
            output: Output::Batch(vec![]),
            grade: None,
            result: None,
        };
        assert!(matches!(resp.into_results(), Err(WireError::Empty)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            PredictionResponse::from_json("<html>"),
            Err(WireError::Json(_))
        ));
    }

    #[test]
    fn fill_grade_uses_service_thresholds() {
        let mut r = PerImageResult {
            label: "freshOranges".into(),
            score: 82.0,
            grade: None,
        };
        r.fill_grade();
        assert_eq!(r.grade, Some(Grade::from("A")));

        let mut unknown = PerImageResult {
            label: "pear".into(),
            score: 82.0,
            grade: None,
        };
        unknown.fill_grade();
        assert_eq!(unknown.grade, None);
    }
}
