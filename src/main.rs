use anyhow::{bail, Result};
use clap::Parser;
use rerafinder::config::StoreOptions;
use rerafinder::debug;
use rerafinder::extract::{run_ingest, IngestOptions};
use rerafinder::page::HtmlPage;
use rerafinder::store::RecordStore;
use rerafinder::tui::ReconcileTUI;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Rerafinder - RERA project pages to CSV")]
struct Args {
    /// Saved project detail pages (HTML)
    #[clap(required = true)]
    pages: Vec<PathBuf>,

    /// Path to output CSV file
    #[clap(short, long, default_value = "ahmedabad_projects.csv")]
    output: PathBuf,

    /// JSON file overriding key column, aliases and column order
    #[clap(long)]
    options: Option<PathBuf>,

    /// Key column used to detect duplicates
    #[clap(short, long)]
    key_column: Option<String>,

    /// Maximum number of pages to ingest (if not set, ingest all)
    #[clap(short = 'i', long)]
    max_items: Option<usize>,

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

    println!("Rerafinder - RERA Project Pages to CSV");
    println!("======================================");

    let mut options = match &args.options {
        Some(path) => StoreOptions::from_json_file(path)?,
        None => StoreOptions::default(),
    };
    if let Some(key) = args.key_column {
        options.key_column = key;
    }
    options.validate()?;

    let store = RecordStore::new(&args.output, options);
    let mut tui = ReconcileTUI::new(args.pages.len());
    tui.show_store(&store)?;

    let ingest_options = IngestOptions { max_items: args.max_items, ..Default::default() };
    let pages = args.pages.iter().map(HtmlPage::from_file);
    let summary = run_ingest(pages, &store, &ingest_options, Some(&mut tui));
    tui.show_totals(&summary)?;

    if summary.failures > 0 && summary.failures == summary.pages {
        bail!("Every page failed; {} left unchanged", args.output.display());
    }
    Ok(())
}
