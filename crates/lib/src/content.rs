//! Static bilingual knowledge base.
//!
//! Topic entries live under `crates/lib/content/topics/{topic}.{lang}.md` and are embedded
//! at build time. They are read-only for the life of the process, so the bundled store
//! can be shared across requests without locking.

use crate::intent::Topic;
use crate::language::Language;
use include_dir::{include_dir, Dir};

static TOPICS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/content/topics");

const WELCOME: &str = include_str!("../content/welcome.txt");
const SYSTEM_PROMPT_EN: &str = include_str!("../content/prompts/system.en.txt");
const SYSTEM_PROMPT_TH: &str = include_str!("../content/prompts/system.th.txt");

/// Source of canned answers keyed by (topic, language). General never has an entry.
pub trait ContentStore: Send + Sync {
    fn lookup(&self, topic: Topic, language: Language) -> Option<String>;
}

/// Content compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledContent;

impl BundledContent {
    pub fn new() -> Self {
        Self
    }
}

impl ContentStore for BundledContent {
    fn lookup(&self, topic: Topic, language: Language) -> Option<String> {
        if !topic.is_specific() {
            return None;
        }
        let name = format!("{}.{}.md", topic.as_str(), language.code());
        TOPICS
            .get_file(&name)
            .and_then(|f| f.contents_utf8())
            .map(|s| s.trim_end().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Bilingual greeting sent on follow events (Thai first, then English).
pub fn welcome_message() -> &'static str {
    WELCOME.trim_end()
}

/// Healthcare system prompt for the AI fallback.
pub fn system_prompt(language: Language) -> &'static str {
    match language {
        Language::Thai => SYSTEM_PROMPT_TH.trim_end(),
        Language::English => SYSTEM_PROMPT_EN.trim_end(),
    }
}

/// User prompt tagged with the detected topic and language.
pub fn user_prompt(text: &str, topic: Topic, language: Language) -> String {
    format!(
        "User query: {}\nIntent: {}\nLanguage: {}",
        text,
        topic.as_str(),
        language.code()
    )
}
