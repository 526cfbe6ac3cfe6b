//! Two-pass bag-of-words vectorization over the code and text channels.
//!
//! Pass one counts tokens across the whole corpus and freezes one capped
//! vocabulary per channel; pass two encodes entries against the frozen
//! vocabularies. The builder only yields an encoder once the fit is done,
//! so a half-fitted vocabulary can never produce vectors.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::records::ProcessedEntry;

// Identifiers and keywords tokenize whole; any other non-whitespace
// character stands alone.
static CODE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*|\S").unwrap());
static TEXT_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Code,
    Text,
}

impl Channel {
    fn tokenizer(self) -> &'static Regex {
        match self {
            Channel::Code => &CODE_TOKEN_RE,
            Channel::Text => &TEXT_TOKEN_RE,
        }
    }
}

fn tokenize(channel: Channel, text: &str) -> impl Iterator<Item = &str> {
    channel.tokenizer().find_iter(text).map(|m| m.as_str())
}

/// Token → index mapping for one channel, frozen after fit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    index: BTreeMap<String, usize>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Cap by frequency (ties broken lexicographically), then assign indices
    /// in lexicographic token order so serialized vocabularies are stable.
    fn from_counts(counts: HashMap<String, u64>, max_size: usize) -> Self {
        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_size);
        let mut tokens: Vec<String> = ranked.into_iter().map(|(token, _)| token).collect();
        tokens.sort();
        let index = tokens
            .into_iter()
            .enumerate()
            .map(|(i, token)| (token, i))
            .collect();
        Vocabulary { index }
    }
}

/// Accumulates corpus-wide token counts for both channels.
pub struct VocabularyBuilder {
    max_vocab_size: usize,
    code_counts: HashMap<String, u64>,
    text_counts: HashMap<String, u64>,
}

impl VocabularyBuilder {
    pub fn new(max_vocab_size: usize) -> Self {
        Self {
            max_vocab_size,
            code_counts: HashMap::new(),
            text_counts: HashMap::new(),
        }
    }

    pub fn observe(&mut self, entry: &ProcessedEntry) {
        for doc in entry.question_code.iter().chain(&entry.answer_code) {
            for token in tokenize(Channel::Code, doc) {
                *self.code_counts.entry(token.to_string()).or_insert(0) += 1;
            }
        }
        for doc in entry.question_text.iter().chain(&entry.answer_text) {
            for token in tokenize(Channel::Text, doc) {
                *self.text_counts.entry(token.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Freeze both vocabularies and hand over the encoder.
    pub fn fit(self) -> BagOfWordsEncoder {
        BagOfWordsEncoder {
            code_vocab: Vocabulary::from_counts(self.code_counts, self.max_vocab_size),
            text_vocab: Vocabulary::from_counts(self.text_counts, self.max_vocab_size),
        }
    }
}

/// Count vectors for one corpus entry, one per role/channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryVectors {
    pub question_code: Vec<u32>,
    pub question_text: Vec<u32>,
    pub answer_code: Vec<u32>,
    pub answer_text: Vec<u32>,
}

pub struct BagOfWordsEncoder {
    code_vocab: Vocabulary,
    text_vocab: Vocabulary,
}

impl BagOfWordsEncoder {
    /// Sum in-vocabulary token counts across all input strings into one
    /// fixed-length vector. Empty input yields an all-zero vector.
    pub fn encode(&self, docs: &[String], channel: Channel) -> Vec<u32> {
        let vocab = self.vocabulary(channel);
        let mut counts = vec![0u32; vocab.len()];
        for doc in docs {
            for token in tokenize(channel, doc) {
                if let Some(idx) = vocab.index_of(token) {
                    counts[idx] += 1;
                }
            }
        }
        counts
    }

    pub fn encode_entry(&self, entry: &ProcessedEntry) -> EntryVectors {
        EntryVectors {
            question_code: self.encode(&entry.question_code, Channel::Code),
            question_text: self.encode(&entry.question_text, Channel::Text),
            answer_code: self.encode(&entry.answer_code, Channel::Code),
            answer_text: self.encode(&entry.answer_text, Channel::Text),
        }
    }

    pub fn vocabulary(&self, channel: Channel) -> &Vocabulary {
        match channel {
            Channel::Code => &self.code_vocab,
            Channel::Text => &self.text_vocab,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &[&str], text: &[&str]) -> ProcessedEntry {
        ProcessedEntry {
            question_code: code.iter().map(|s| s.to_string()).collect(),
            question_text: text.iter().map(|s| s.to_string()).collect(),
            answer_code: vec![],
            answer_text: vec![],
        }
    }

    fn fit(entries: &[ProcessedEntry], max: usize) -> BagOfWordsEncoder {
        let mut builder = VocabularyBuilder::new(max);
        for e in entries {
            builder.observe(e);
        }
        builder.fit()
    }

    #[test]
    fn code_tokens_split_identifiers_and_punctuation() {
        let tokens: Vec<&str> = tokenize(Channel::Code, "x = foo_bar ( 1 )").collect();
        assert_eq!(tokens, vec!["x", "=", "foo_bar", "(", "1", ")"]);
    }

    #[test]
    fn code_punctuation_tokenizes_per_character() {
        let tokens: Vec<&str> = tokenize(Channel::Code, "==").collect();
        assert_eq!(tokens, vec!["=", "="]);
    }

    #[test]
    fn text_tokens_are_alphanumeric_runs() {
        let tokens: Vec<&str> = tokenize(Channel::Text, "the value 3.14 rocks").collect();
        assert_eq!(tokens, vec!["the", "value", "3", "14", "rocks"]);
    }

    #[test]
    fn cap_keeps_most_frequent() {
        let entries = vec![entry(&[], &["foo foo foo foo foo bar"])];
        let encoder = fit(&entries, 1);
        let vocab = encoder.vocabulary(Channel::Text);
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.index_of("foo"), Some(0));
        assert_eq!(vocab.index_of("bar"), None);
    }

    #[test]
    fn encode_empty_is_zero_vector() {
        let entries = vec![entry(&["x = 1"], &["some words here"])];
        let encoder = fit(&entries, 100);
        let vector = encoder.encode(&[], Channel::Text);
        assert_eq!(vector.len(), encoder.vocabulary(Channel::Text).len());
        assert!(vector.iter().all(|&c| c == 0));
    }

    #[test]
    fn encode_sums_across_spans() {
        let entries = vec![entry(&["a = 1", "a = 2"], &[])];
        let encoder = fit(&entries, 100);
        let vector = encoder.encode(
            &["a = 1".to_string(), "a = 2".to_string()],
            Channel::Code,
        );
        let vocab = encoder.vocabulary(Channel::Code);
        assert_eq!(vector[vocab.index_of("a").unwrap()], 2);
        assert_eq!(vector[vocab.index_of("=").unwrap()], 2);
        assert_eq!(vector[vocab.index_of("1").unwrap()], 1);
    }

    #[test]
    fn unknown_tokens_ignored() {
        let entries = vec![entry(&[], &["known words"])];
        let encoder = fit(&entries, 100);
        let vector = encoder.encode(&["unseen vocabulary".to_string()], Channel::Text);
        assert!(vector.iter().all(|&c| c == 0));
    }

    #[test]
    fn indices_are_dense_and_stable() {
        let entries = vec![entry(&[], &["delta alpha charlie alpha"])];
        let encoder = fit(&entries, 100);
        let vocab = encoder.vocabulary(Channel::Text);
        assert_eq!(vocab.index_of("alpha"), Some(0));
        assert_eq!(vocab.index_of("charlie"), Some(1));
        assert_eq!(vocab.index_of("delta"), Some(2));
    }
}
