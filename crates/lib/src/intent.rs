//! Lexical intent classification.
//!
//! Keywords are matched as lowercase substrings, not on token boundaries, so a
//! keyword embedded in an unrelated longer word still counts as a hit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Healthcare subject of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    Hiv,
    Prep,
    Std,
    General,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Hiv => "hiv",
            Topic::Prep => "prep",
            Topic::Std => "std",
            Topic::General => "general",
        }
    }

    /// True for topics answered from the static knowledge base.
    pub fn is_specific(self) -> bool {
        self != Topic::General
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const HIV_KEYWORDS: &[&str] = &["hiv", "aids", "เอชไอวี", "เอดส์"];
const PREP_KEYWORDS: &[&str] = &["prep", "pre-exposure", "เพรพ", "การป้องกันก่อนสัมผัส"];
const STD_KEYWORDS: &[&str] = &[
    "std",
    "sti",
    "sexually transmitted",
    "โรคติดต่อทางเพศ",
    "โรคกามโรค",
];

/// Keyword sets in precedence order; the first set with a hit wins.
const RULES: &[(Topic, &[&str])] = &[
    (Topic::Hiv, HIV_KEYWORDS),
    (Topic::Prep, PREP_KEYWORDS),
    (Topic::Std, STD_KEYWORDS),
];

pub fn classify(text: &str) -> Topic {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(topic, _)| *topic)
        .unwrap_or(Topic::General)
}
