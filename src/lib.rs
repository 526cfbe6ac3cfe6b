//! Q&A scrape preprocessing: JSON repair, question-level deduplication and
//! two-channel bag-of-words vectorization.

pub mod dedup;
pub mod html;
pub mod normalize;
pub mod pipeline;
pub mod records;
pub mod repair;
pub mod split;
pub mod vectorize;

pub use dedup::{Deduplicator, DuplicateReport};
pub use records::{NormalizedRecord, ProcessedEntry, Question, RawRecord};
pub use vectorize::{BagOfWordsEncoder, Channel, EntryVectors, Vocabulary, VocabularyBuilder};
