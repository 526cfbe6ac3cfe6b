use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use qa_preprocessor::pipeline;

#[derive(Parser)]
#[command(name = "qa_preprocessor", about = "Q&A scrape repair, dedup and bag-of-words pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repair, parse and deduplicate raw scrape files
    Combine {
        /// Raw scrape JSON files, processed in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory for the combined corpus and report
        #[arg(short, long, default_value = "processed")]
        out: PathBuf,
    },
    /// Split, normalize and encode a combined corpus
    Vectorize {
        /// Combined corpus produced by `combine`
        corpus: PathBuf,
        /// Output directory for vocabularies and vectors
        #[arg(short, long, default_value = "processed")]
        out: PathBuf,
        /// Max tokens kept per channel vocabulary
        #[arg(long, default_value = "50000")]
        max_vocab: usize,
        /// Processed entries saved for manual inspection
        #[arg(long, default_value = "5")]
        samples: usize,
    },
    /// Combine + vectorize in one pipeline
    Run {
        /// Raw scrape JSON files, processed in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory for all artifacts
        #[arg(short, long, default_value = "processed")]
        out: PathBuf,
        /// Max tokens kept per channel vocabulary
        #[arg(long, default_value = "50000")]
        max_vocab: usize,
        /// Processed entries saved for manual inspection
        #[arg(long, default_value = "5")]
        samples: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Combine { inputs, out } => {
            let (unique, report) = pipeline::combine(&inputs, &out)?;
            println!("{}", report.render());
            println!(
                "Wrote {} unique entries to {}",
                unique.len(),
                out.join(pipeline::COMBINED_FILE).display()
            );
            Ok(())
        }
        Commands::Vectorize {
            corpus,
            out,
            max_vocab,
            samples,
        } => {
            let records = pipeline::load_corpus(&corpus)?;
            println!("Loaded {} entries from {}", records.len(), corpus.display());
            let summary = pipeline::vectorize(&records, &out, max_vocab, samples)?;
            summary.print();
            Ok(())
        }
        Commands::Run {
            inputs,
            out,
            max_vocab,
            samples,
        } => {
            let (unique, report) = pipeline::combine(&inputs, &out)?;
            println!("{}", report.render());
            println!("Vectorizing {} entries...", unique.len());
            let summary = pipeline::vectorize(&unique, &out, max_vocab, samples)?;
            summary.print();
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}
