use crate::config::StoreOptions;
use crate::error::StoreError;
use crate::models::{ReconcileReport, Record};
use crate::schema::{normalize_key, order_columns, unique_header};
use crate::{debug_println, error_eprintln, status_println, warn_eprintln};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Full in-memory copy of the store.
#[derive(Debug, Clone, Default)]
pub struct StoreTable {
    pub header: Vec<String>,
    pub rows: Vec<Record>,
}

impl StoreTable {
    /// Row indices per normalized key. Rows without a key are left out.
    pub fn key_index(&self, key_column: &str) -> HashMap<String, Vec<usize>> {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            let key = normalize_key(row.get(key_column).unwrap_or_default());
            if !key.is_empty() {
                index.entry(key).or_default().push(i);
            }
        }
        index
    }
}

/// A CSV file of records keyed by one column, merged into rather than
/// overwritten. Every call re-reads the file; nothing is cached between calls
/// and only one writer at a time is supported.
pub struct RecordStore {
    path: PathBuf,
    options: StoreOptions,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self { path: path.into(), options }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Merge `batch` into the store.
    ///
    /// New keys are appended, known keys only fill blank cells, and the header
    /// grows to cover every incoming column. Records without a key are skipped
    /// and listed in the report. On error the failure has already been logged;
    /// a read failure leaves the file untouched.
    pub fn reconcile(&self, batch: &[Record]) -> Result<ReconcileReport, StoreError> {
        self.try_reconcile(batch).map_err(|e| {
            error_eprintln!(
                "Reconcile failed for {} ({} record(s), key '{}'): {}",
                self.path.display(),
                batch.len(),
                self.options.key_column,
                e
            );
            e
        })
    }

    fn try_reconcile(&self, batch: &[Record]) -> Result<ReconcileReport, StoreError> {
        let mut report = ReconcileReport::default();
        if batch.is_empty() {
            status_println!("No data to append to {}.", self.path.display());
            return Ok(report);
        }
        self.options.validate()?;

        let prepared = self.prepare_batch(batch, &mut report);
        if prepared.is_empty() {
            warn_eprintln!(
                "No record in batch has a '{}' value; nothing written to {}",
                self.options.key_column,
                self.path.display()
            );
            return Ok(report);
        }

        let key_column = self.options.key_column.as_str();
        let existing_header = self.read_header()?.unwrap_or_default();
        let has_store = !existing_header.is_empty();

        let existing_keys = if existing_header.iter().any(|c| c == key_column) {
            self.existing_keys()?
        } else {
            HashSet::new()
        };
        debug_println!("{} existing key(s) in {}", existing_keys.len(), self.path.display());

        let mut incoming_columns: Vec<&str> = Vec::new();
        for (_, record) in &prepared {
            for column in record.columns() {
                if !incoming_columns.contains(&column) {
                    incoming_columns.push(column);
                }
            }
        }
        let header = order_columns(
            existing_header.iter().map(String::as_str),
            incoming_columns.iter().copied(),
            &self.options,
        );

        // Later records with an already-seen key fold into the first one
        let mut fresh: Vec<Record> = Vec::new();
        let mut fresh_index: HashMap<&str, usize> = HashMap::new();
        let mut duplicates: Vec<(&str, &Record)> = Vec::new();
        for (key, record) in &prepared {
            if existing_keys.contains(key) {
                report.merged += 1;
                duplicates.push((key.as_str(), record));
            } else if let Some(&i) = fresh_index.get(key.as_str()) {
                report.merged += 1;
                let filled = fresh[i].fill_blanks_from(record, key_column);
                debug_println!("Merged in-batch duplicate {} ({} field(s))", key, filled);
            } else {
                fresh_index.insert(key.as_str(), fresh.len());
                fresh.push(record.clone());
            }
        }

        if !has_store {
            self.write_all(&header, fresh.iter().map(|r| r.reindex(&header)))?;
            report.appended = fresh.len();
            status_println!(
                "Appended {} new rows to {} (skipped {} duplicates).",
                report.appended,
                self.path.display(),
                report.merged
            );
            return Ok(report);
        }

        report.removed_columns = existing_header
            .iter()
            .filter(|c| self.options.is_disallowed(c))
            .cloned()
            .collect();
        report.header_changed = header != existing_header;

        let mut table = None;
        if !duplicates.is_empty() {
            let mut loaded = self.load()?.unwrap_or_default();
            let index = loaded.key_index(key_column);
            for (key, record) in &duplicates {
                for &row in index.get(*key).into_iter().flatten() {
                    report.updated_cells += loaded.rows[row].fill_blanks_from(record, key_column);
                }
            }
            table = Some(loaded);
        }

        if report.header_changed || report.updated_cells > 0 {
            let table = match table {
                Some(table) => table,
                None => self.load()?.unwrap_or_default(),
            };
            let rows = table
                .rows
                .iter()
                .chain(fresh.iter())
                .map(|r| r.reindex(&header));
            self.write_all(&header, rows)?;
            report.rewritten = true;

            if !report.removed_columns.is_empty() {
                status_println!("Removed columns {:?} from {}.", report.removed_columns, self.path.display());
            }
            if report.updated_cells > 0 {
                status_println!(
                    "Updated {} field(s) for existing rows in {}.",
                    report.updated_cells,
                    self.path.display()
                );
            }
            if report.header_changed {
                status_println!("Updated header to include new columns in {}.", self.path.display());
            }
        } else if !fresh.is_empty() {
            self.append_rows(fresh.iter().map(|r| r.reindex(&header)))?;
        }

        report.appended = fresh.len();
        if report.appended > 0 {
            status_println!(
                "Appended {} new rows to {} (skipped {} duplicates).",
                report.appended,
                self.path.display(),
                report.merged
            );
        } else {
            status_println!(
                "No new rows to append to {} (all duplicates by {}).",
                self.path.display(),
                key_column
            );
        }

        Ok(report)
    }

    /// Drop disallowed columns, resolve and normalize the key. Records
    /// without a usable key are reported and left out.
    fn prepare_batch(&self, batch: &[Record], report: &mut ReconcileReport) -> Vec<(String, Record)> {
        let key_column = &self.options.key_column;
        let mut prepared = Vec::with_capacity(batch.len());

        for (index, record) in batch.iter().enumerate() {
            let mut record = record.clone();
            record.retain(|column, _| !self.options.is_disallowed(column));

            let Some(raw) = self.resolve_key(&record) else {
                let err = StoreError::MissingKeyColumn { index, key_column: key_column.clone() };
                warn_eprintln!("{} ({})", err, self.path.display());
                report.skipped.push(err);
                continue;
            };

            let key = normalize_key(&raw);
            record.insert(key_column.as_str(), key.clone());
            prepared.push((key, record));
        }

        prepared
    }

    /// The key column's value, else the first alias with a value.
    fn resolve_key(&self, record: &Record) -> Option<String> {
        std::iter::once(&self.options.key_column)
            .chain(self.options.key_aliases.iter())
            .filter_map(|column| record.get(column))
            .find(|value| !value.trim().is_empty())
            .map(str::to_string)
    }

    /// Header row of the store; `None` when the file does not exist.
    /// Repeated names come back as `Name.1`, `Name.2`, ...
    pub fn read_header(&self) -> Result<Option<Vec<String>>, StoreError> {
        let Some(mut reader) = self.open_reader()? else {
            return Ok(None);
        };
        let raw = reader.headers().map_err(|e| StoreError::read(&self.path, e))?;
        let header = unique_header(raw.iter());
        if raw.iter().ne(header.iter().map(String::as_str)) {
            warn_eprintln!(
                "Repeated column names in {}; reading them as {:?}",
                self.path.display(),
                header
            );
        }
        Ok(Some(header))
    }

    /// Normalized keys already stored, reading only the key column.
    pub fn existing_keys(&self) -> Result<HashSet<String>, StoreError> {
        let mut keys = HashSet::new();
        let Some(mut reader) = self.open_reader()? else {
            return Ok(keys);
        };
        let headers = reader.headers().map_err(|e| StoreError::read(&self.path, e))?;
        let width = headers.len();
        let Some(idx) = headers.iter().position(|c| c == self.options.key_column) else {
            return Ok(keys);
        };

        let mut row = csv::StringRecord::new();
        while reader.read_record(&mut row).map_err(|e| StoreError::read(&self.path, e))? {
            self.check_width(&row, width)?;
            let key = normalize_key(row.get(idx).unwrap_or_default());
            if !key.is_empty() {
                keys.insert(key);
            }
        }
        Ok(keys)
    }

    /// Whole store in memory; `None` when the file does not exist.
    pub fn load(&self) -> Result<Option<StoreTable>, StoreError> {
        let Some(mut reader) = self.open_reader()? else {
            return Ok(None);
        };
        let raw = reader.headers().map_err(|e| StoreError::read(&self.path, e))?;
        let header = unique_header(raw.iter());

        let mut rows = Vec::new();
        for result in reader.records() {
            let row = result.map_err(|e| StoreError::read(&self.path, e))?;
            self.check_width(&row, header.len())?;
            // Short rows come back with their trailing cells absent
            rows.push(header.iter().map(String::as_str).zip(row.iter()).collect::<Record>());
        }

        debug_println!("Loaded {} row(s) from {}", rows.len(), self.path.display());
        Ok(Some(StoreTable { header, rows }))
    }

    fn open_reader(&self) -> Result<Option<csv::Reader<File>>, StoreError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(
                csv::ReaderBuilder::new()
                    .has_headers(true)
                    .flexible(true)
                    .from_reader(file),
            )),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::read(&self.path, e)),
        }
    }

    fn check_width(&self, row: &csv::StringRecord, width: usize) -> Result<(), StoreError> {
        if row.len() <= width {
            return Ok(());
        }
        let line = row.position().map_or(0, |p| p.line());
        Err(StoreError::read(
            &self.path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {} fields but the header has {}", line, row.len(), width),
            ),
        ))
    }

    /// Write header and rows to a temporary file next to the store, then
    /// move it over the store. The old content survives any failure before
    /// the final rename.
    fn write_all<I>(&self, header: &[String], rows: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let existing_mode = fs::metadata(&self.path).ok().map(|meta| meta.permissions());
        let mut builder = tempfile::Builder::new();
        builder.prefix(".rerafinder-").suffix(".csv.tmp");
        if let (None, Some(mode)) = (&existing_mode, new_store_permissions()) {
            builder.permissions(mode);
        }
        let tmp = builder
            .tempfile_in(dir)
            .map_err(|e| StoreError::write(&self.path, e))?;
        // Copied as is; unlike creation this is not masked by the umask
        if let Some(mode) = existing_mode {
            fs::set_permissions(tmp.path(), mode).map_err(|e| StoreError::write(&self.path, e))?;
        }

        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());
            writer
                .write_record(header)
                .map_err(|e| StoreError::write(&self.path, e))?;
            for row in rows {
                writer
                    .write_record(&row)
                    .map_err(|e| StoreError::write(&self.path, e))?;
            }
            writer.flush().map_err(|e| StoreError::write(&self.path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::write(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::write(&self.path, e.error))?;

        debug_println!("Rewrote {}", self.path.display());
        Ok(())
    }

    /// Add rows to the end of the store without touching what is there.
    fn append_rows<I>(&self, rows: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::write(&self.path, e))?;
        if !ends_with_newline(&mut file).map_err(|e| StoreError::write(&self.path, e))? {
            file.write_all(b"\n").map_err(|e| StoreError::write(&self.path, e))?;
        }

        let mut writer = csv::Writer::from_writer(&file);
        for row in rows {
            writer
                .write_record(&row)
                .map_err(|e| StoreError::write(&self.path, e))?;
        }
        writer.flush().map_err(|e| StoreError::write(&self.path, e))?;
        Ok(())
    }
}

/// Mode for a store created from scratch, masked by the umask on creation
/// like any file the user writes.
#[cfg(unix)]
fn new_store_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o666))
}

#[cfg(not(unix))]
fn new_store_permissions() -> Option<Permissions> {
    None
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
