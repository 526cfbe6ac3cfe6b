//! Record shapes flowing through the pipeline.

use serde::{Deserialize, Serialize};

/// Question field as the scrape emits it: either a bare HTML string or a
/// wrapper object carrying the HTML under `content`. Resolved to a single
/// string at ingestion so nothing downstream branches on shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Question {
    PlainHtml(String),
    Wrapped {
        #[serde(default)]
        content: String,
    },
}

impl Question {
    pub fn content(&self) -> &str {
        match self {
            Question::PlainHtml(html) => html,
            Question::Wrapped { content } => content,
        }
    }
}

/// One scraped entry as parsed from a repaired input file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub question: Question,
    pub answers: Vec<String>,
}

/// A record after HTML cleanup: question and answers restricted to the
/// allowed tag subset. Written to the combined corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub question: String,
    pub answers: Vec<String>,
}

/// Token-ready strings per role and channel, derived from one record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedEntry {
    pub question_code: Vec<String>,
    pub question_text: Vec<String>,
    pub answer_code: Vec<String>,
    pub answer_text: Vec<String>,
}
