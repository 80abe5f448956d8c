use anyhow::{bail, Result};
use clap::Parser;
use rerafinder::config::StoreOptions;
use rerafinder::debug;
use rerafinder::store::RecordStore;
use rerafinder::utils;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Merge scraped records into a keyed CSV store")]
struct Args {
    /// Records to merge: CSV with a header row, or JSON lines (.jsonl)
    input: PathBuf,

    /// Path to output CSV file
    #[clap(short, long, default_value = "ahmedabad_projects.csv")]
    output: PathBuf,

    /// JSON file overriding key column, aliases and column order
    #[clap(long)]
    options: Option<PathBuf>,

    /// Key column used to detect duplicates
    #[clap(short, long)]
    key_column: Option<String>,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,

    /// Only print warnings and errors
    #[clap(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    debug::set_from_flags(args.quiet, args.debug);

    let mut options = match &args.options {
        Some(path) => StoreOptions::from_json_file(path)?,
        None => StoreOptions::default(),
    };
    if let Some(key) = args.key_column {
        options.key_column = key;
    }

    let records = utils::load_records(&args.input)?;
    let store = RecordStore::new(&args.output, options);

    let Ok(report) = store.reconcile(&records) else {
        bail!("Merge into {} failed; see the error above", args.output.display());
    };

    println!("\n=== Summary ===");
    println!("Records read: {}", records.len());
    println!("{}", report.summary());
    if report.rewritten {
        println!("Rewrote {} in full", args.output.display());
    }
    println!("Saved to: {}", args.output.display());

    Ok(())
}
