//! Phase orchestration: combine (repair, parse, dedupe) then vectorize.
//!
//! Phases are strictly sequential; each consumes the complete output of the
//! previous one. Per-record work inside the vectorize phase fans out over
//! rayon, which is safe because record processing is pure.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::dedup::{Deduplicator, DuplicateReport};
use crate::normalize::{normalize_code, normalize_text};
use crate::records::{NormalizedRecord, ProcessedEntry, RawRecord};
use crate::repair::{self, RepairError};
use crate::split;
use crate::vectorize::{Channel, EntryVectors, VocabularyBuilder};

pub const COMBINED_FILE: &str = "combined_data.json";
pub const REPORT_FILE: &str = "duplicate_report.json";
pub const CODE_VOCAB_FILE: &str = "code_vocabulary.json";
pub const TEXT_VOCAB_FILE: &str = "text_vocabulary.json";
pub const VECTORS_FILE: &str = "bag_of_words.bin";
pub const SAMPLES_FILE: &str = "processed_samples.json";

/// Repair, parse and deduplicate the input files, in order, then write the
/// combined corpus and the duplicate report.
///
/// A file that fails to parse is skipped with its diagnostics on disk; the
/// run only fails outright when every file fails or nothing unique survives.
pub fn combine(
    inputs: &[PathBuf],
    out_dir: &Path,
) -> Result<(Vec<NormalizedRecord>, DuplicateReport)> {
    let mut deduper = Deduplicator::new();
    let mut failed = 0usize;

    for input in inputs {
        let name = file_name(input);
        match load_records(input) {
            Ok(records) => {
                info!(file = %name, entries = records.len(), "parsed scrape file");
                deduper.add_file(&name, &records);
            }
            Err(err) => {
                error!(file = %name, %err, "skipping file");
                failed += 1;
            }
        }
    }

    if failed == inputs.len() {
        bail!("all {failed} input files failed to parse");
    }

    let (unique, report) = deduper.finish();
    if unique.is_empty() {
        bail!("no unique entries survived deduplication");
    }

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    fs::write(
        out_dir.join(COMBINED_FILE),
        serde_json::to_string_pretty(&unique)?,
    )?;
    fs::write(
        out_dir.join(REPORT_FILE),
        serde_json::to_string_pretty(&report)?,
    )?;

    Ok((unique, report))
}

/// Read one raw scrape file through repair and validation, leaving the
/// intermediate stages in a `debug/` directory beside the input.
fn load_records(path: &Path) -> Result<Vec<RawRecord>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let debug_dir = path.parent().unwrap_or(Path::new(".")).join("debug");
    fs::create_dir_all(&debug_dir)
        .with_context(|| format!("creating {}", debug_dir.display()))?;
    fs::write(debug_dir.join("original.txt"), &raw)?;

    let escaped = repair::escape_code_spans(&raw);
    fs::write(debug_dir.join("after_code_processing.txt"), &escaped)?;

    let repaired = repair::fix_structure(&escaped);
    fs::write(debug_dir.join("preprocessed.json"), &repaired)?;

    match repair::parse_records(&repaired) {
        Ok((records, dropped)) => {
            if dropped > 0 {
                warn!(file = %path.display(), dropped, "dropped invalid entries");
            }
            Ok(records)
        }
        Err(err) => {
            if let RepairError::Parse {
                offset,
                message,
                context,
            } = &err
            {
                fs::write(
                    debug_dir.join("error_details.txt"),
                    format!("Error position: {offset}\nError message: {message}\n\nContext:\n{context}\n"),
                )?;
            }
            Err(err.into())
        }
    }
}

/// Load a combined corpus written by `combine`.
pub fn load_corpus(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let records: Vec<NormalizedRecord> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(records)
}

#[derive(Debug)]
pub struct VectorizeSummary {
    pub entries: usize,
    pub code_vocab: usize,
    pub text_vocab: usize,
}

impl VectorizeSummary {
    pub fn print(&self) {
        println!(
            "Encoded {} entries (code vocab: {} tokens, text vocab: {} tokens).",
            self.entries, self.code_vocab, self.text_vocab
        );
    }
}

/// Split, normalize and encode the corpus, then persist vocabularies, the
/// bag-of-words dataset and an inspection sample.
pub fn vectorize(
    records: &[NormalizedRecord],
    out_dir: &Path,
    max_vocab: usize,
    samples: usize,
) -> Result<VectorizeSummary> {
    if records.is_empty() {
        bail!("nothing to vectorize");
    }

    let entries = process_records(records);

    // Vocabulary fit is one global pass; encoding only starts afterwards.
    let mut builder = VocabularyBuilder::new(max_vocab);
    for entry in &entries {
        builder.observe(entry);
    }
    let encoder = builder.fit();
    if encoder.vocabulary(Channel::Code).is_empty() {
        warn!("code vocabulary is empty; code vectors will have zero length");
    }

    let vectors: Vec<EntryVectors> = entries.iter().map(|e| encoder.encode_entry(e)).collect();

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    fs::write(
        out_dir.join(CODE_VOCAB_FILE),
        serde_json::to_string_pretty(encoder.vocabulary(Channel::Code))?,
    )?;
    fs::write(
        out_dir.join(TEXT_VOCAB_FILE),
        serde_json::to_string_pretty(encoder.vocabulary(Channel::Text))?,
    )?;
    fs::write(out_dir.join(VECTORS_FILE), bincode::serialize(&vectors)?)?;

    let sample_count = samples.min(entries.len());
    fs::write(
        out_dir.join(SAMPLES_FILE),
        serde_json::to_string_pretty(&entries[..sample_count])?,
    )?;

    Ok(VectorizeSummary {
        entries: entries.len(),
        code_vocab: encoder.vocabulary(Channel::Code).len(),
        text_vocab: encoder.vocabulary(Channel::Text).len(),
    })
}

fn process_records(records: &[NormalizedRecord]) -> Vec<ProcessedEntry> {
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut entries = Vec::with_capacity(records.len());
    for chunk in records.chunks(500) {
        let processed: Vec<ProcessedEntry> = chunk.par_iter().map(process_record).collect();
        entries.extend(processed);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();
    entries
}

fn process_record(record: &NormalizedRecord) -> ProcessedEntry {
    let mut entry = ProcessedEntry::default();

    let (code, text) = split::split(&record.question);
    entry.question_code = code.iter().map(|c| normalize_code(c)).collect();
    entry.question_text = text.iter().map(|t| normalize_text(t)).collect();

    for answer in &record.answers {
        let (code, text) = split::split(answer);
        entry.answer_code.extend(code.iter().map(|c| normalize_code(c)));
        entry.answer_text.extend(text.iter().map(|t| normalize_text(t)));
    }

    entry
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
