//! Quality grades as returned by the prediction service.

use crate::labels::FruitClass;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Opaque quality rating.
///
/// The service sends either a number or a string. Numeric grades sort
/// numerically, letter grades lexicographically, and every numeric grade
/// sorts before every letter grade so that mixed batches still have a total
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Grade {
    Numeric(f64),
    Letter(String),
}

impl Grade {
    pub fn letter(s: impl Into<String>) -> Self {
        Grade::Letter(s.into())
    }
}

impl PartialEq for Grade {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Grade {}

impl PartialOrd for Grade {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Grade {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Grade::Numeric(a), Grade::Numeric(b)) => a.total_cmp(b),
            (Grade::Letter(a), Grade::Letter(b)) => a.cmp(b),
            (Grade::Numeric(_), Grade::Letter(_)) => Ordering::Less,
            (Grade::Letter(_), Grade::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl From<&str> for Grade {
    fn from(s: &str) -> Self {
        Grade::Letter(s.to_string())
    }
}

impl From<f64> for Grade {
    fn from(v: f64) -> Self {
        Grade::Numeric(v)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Numeric(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{}", *v as i64),
            Grade::Numeric(v) => write!(f, "{v}"),
            Grade::Letter(s) => f.write_str(s),
        }
    }
}

/// Grade thresholds the prediction service applies, keyed on the winning
/// class and its percentage (0..=100).
///
/// Fresh fruit grades `A` from 70 and `B` from 40; rotten fruit grades `C`
/// from 70 and `B` from 40. Anything below 40 is `C`.
pub fn grade_for(class: FruitClass, percentage: f64) -> Grade {
    let high = if class.is_fresh() { "A" } else { "C" };
    let letter = if percentage >= 70.0 {
        high
    } else if percentage >= 40.0 {
        "B"
    } else {
        "C"
    };
    Grade::letter(letter)
}
