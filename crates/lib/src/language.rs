//! Language detection from script content.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reply language. Only Thai and English are supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Thai,
    #[default]
    English,
}

impl Language {
    /// Two-letter code used in prompts, content keys and the health payload.
    pub fn code(self) -> &'static str {
        match self {
            Language::Thai => "th",
            Language::English => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "th" => Some(Language::Thai),
            "en" => Some(Language::English),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Thai Unicode block, U+0E00..=U+0E7F.
fn is_thai(c: char) -> bool {
    ('\u{0E00}'..='\u{0E7F}').contains(&c)
}

/// Thai when any character falls in the Thai block, English otherwise (including empty text).
pub fn detect(text: &str) -> Language {
    if text.chars().any(is_thai) {
        Language::Thai
    } else {
        Language::English
    }
}
