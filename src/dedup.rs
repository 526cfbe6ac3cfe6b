//! Question-content deduplication across scrape files.
//!
//! Identity is the question alone: two entries with the same question text
//! but different answer sets are duplicates, and the first-seen copy wins.
//! The seen-hash set spans every file fed to one `Deduplicator`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::html;
use crate::records::{NormalizedRecord, RawRecord};

#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    unique: Vec<NormalizedRecord>,
    groups: BTreeMap<String, Vec<DuplicateLocation>>,
    file_counts: Vec<FileCount>,
    total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateLocation {
    pub index: usize,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCount {
    pub file: String,
    pub entries: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub file_counts: Vec<FileCount>,
    pub total_entries: usize,
    pub unique_entries: usize,
    pub duplicates_removed: usize,
    pub duplicate_groups: BTreeMap<String, Vec<DuplicateLocation>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize one file's records and fold them into the running corpus.
    /// First occurrences are kept in input order; later occurrences are
    /// recorded under their question hash.
    pub fn add_file(&mut self, file: &str, records: &[RawRecord]) {
        self.file_counts.push(FileCount {
            file: file.to_string(),
            entries: records.len(),
        });
        self.total += records.len();

        for (index, record) in records.iter().enumerate() {
            let normalized = NormalizedRecord {
                question: html::clean(record.question.content()),
                answers: record.answers.iter().map(|a| html::clean(a)).collect(),
            };
            let hash = question_hash(&normalized.question);
            if self.seen.contains(&hash) {
                self.groups.entry(hash).or_default().push(DuplicateLocation {
                    index,
                    file: file.to_string(),
                });
            } else {
                self.seen.insert(hash);
                self.unique.push(normalized);
            }
        }
    }

    pub fn finish(self) -> (Vec<NormalizedRecord>, DuplicateReport) {
        let unique_entries = self.unique.len();
        let report = DuplicateReport {
            file_counts: self.file_counts,
            total_entries: self.total,
            unique_entries,
            duplicates_removed: self.total - unique_entries,
            duplicate_groups: self.groups,
        };
        (self.unique, report)
    }
}

/// Digest over the canonicalized question text. Answers never participate.
fn question_hash(question_html: &str) -> String {
    let canonical = html::canonical_text(question_html);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl DuplicateReport {
    /// Printable form of the report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Duplicate Removal Report ===\n\n");
        out.push_str("Original file counts:\n");
        for fc in &self.file_counts {
            out.push_str(&format!("  {}: {} entries\n", fc.file, fc.entries));
        }
        out.push_str(&format!("\nTotal original entries: {}\n", self.total_entries));
        out.push_str(&format!("Unique entries: {}\n", self.unique_entries));
        out.push_str(&format!("Duplicates removed: {}\n", self.duplicates_removed));

        if !self.duplicate_groups.is_empty() {
            out.push_str("\nDuplicate question groups:\n");
            for (hash, locations) in &self.duplicate_groups {
                out.push_str(&format!("  {}:\n", &hash[..12.min(hash.len())]));
                for loc in locations {
                    out.push_str(&format!("    - index {} in {}\n", loc.index, loc.file));
                }
            }
        }

        out
    }
}
