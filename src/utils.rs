use crate::models::Record;
use crate::{status_println, warn_eprintln};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Records from a CSV file with a header row. Short rows leave their
/// trailing columns out of the record.
pub fn load_records_from_csv(input_path: &Path) -> Result<Vec<Record>> {
    let file = File::open(input_path)
        .context(format!("Failed to open input file: {}", input_path.display()))?;

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader
        .headers()
        .context(format!("Failed to read header of {}", input_path.display()))?
        .clone();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.context(format!("Failed to read row in {}", input_path.display()))?;
        if row.len() > headers.len() {
            warn_eprintln!("Skipping row with more fields than the header: {:?}", row);
            continue;
        }
        records.push(headers.iter().zip(row.iter()).collect::<Record>());
    }

    status_println!("Loaded {} records from {}", records.len(), input_path.display());
    Ok(records)
}

/// Records from a JSON-lines file, one object per line. Blank lines are ignored.
pub fn load_records_from_jsonl(input_path: &Path) -> Result<Vec<Record>> {
    let file = File::open(input_path)
        .context(format!("Failed to open input file: {}", input_path.display()))?;

    let mut records = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context(format!("Failed to read {}", input_path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line)
            .context(format!("Invalid record on line {} of {}", i + 1, input_path.display()))?;
        records.push(record);
    }

    status_println!("Loaded {} records from {}", records.len(), input_path.display());
    Ok(records)
}

/// Pick the loader by extension: `.jsonl`/`.json` are JSON lines, anything else CSV.
pub fn load_records(input_path: &Path) -> Result<Vec<Record>> {
    match input_path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("json") => {
            load_records_from_jsonl(input_path)
        }
        _ => load_records_from_csv(input_path),
    }
}
