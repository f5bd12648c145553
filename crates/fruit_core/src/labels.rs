use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six classes the remote model predicts.
///
/// Variant order matches the position of the score in the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FruitClass {
    FreshApples,
    FreshBananas,
    FreshOranges,
    RottenApples,
    RottenBananas,
    RottenOranges,
}

impl FruitClass {
    pub const ALL: [FruitClass; 6] = [
        FruitClass::FreshApples,
        FruitClass::FreshBananas,
        FruitClass::FreshOranges,
        FruitClass::RottenApples,
        FruitClass::RottenBananas,
        FruitClass::RottenOranges,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FruitClass::FreshApples => "freshApples",
            FruitClass::FreshBananas => "freshBananas",
            FruitClass::FreshOranges => "freshOranges",
            FruitClass::RottenApples => "rottenApples",
            FruitClass::RottenBananas => "rottenBananas",
            FruitClass::RottenOranges => "rottenOranges",
        }
    }

    pub fn is_fresh(self) -> bool {
        matches!(
            self,
            FruitClass::FreshApples | FruitClass::FreshBananas | FruitClass::FreshOranges
        )
    }

    pub fn is_rotten(self) -> bool {
        !self.is_fresh()
    }
}

impl fmt::Display for FruitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fruit class: {0}")]
pub struct UnknownClass(pub String);

impl FromStr for FruitClass {
    type Err = UnknownClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownClass(s.to_string()))
    }
}
