use crate::extract::IngestSummary;
use crate::models::ReconcileReport;
use crate::store::RecordStore;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};

/// Per-page progress lines for an ingest run, written to stdout unless
/// another writer is given.
pub struct ReconcileTUI<W: Write = io::Stdout> {
    out: W,
    total_pages: usize,
    done: usize,
}

impl ReconcileTUI {
    pub fn new(total_pages: usize) -> Self {
        Self::with_writer(io::stdout(), total_pages)
    }
}

impl<W: Write> ReconcileTUI<W> {
    pub fn with_writer(out: W, total_pages: usize) -> Self {
        Self { out, total_pages, done: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Grey line with the number of keys already in the store. A store that
    /// cannot be read gets a yellow warning instead; reconcile reports the
    /// details per page.
    pub fn show_store(&mut self, store: &RecordStore) -> io::Result<Option<usize>> {
        let path = store.path().display();
        match store.existing_keys() {
            Ok(keys) => {
                execute!(
                    self.out,
                    SetForegroundColor(Color::DarkGrey),
                    Print(format!("📁 {} existing projects in {}\n", keys.len(), path)),
                    ResetColor
                )?;
                Ok(Some(keys.len()))
            }
            Err(e) => {
                execute!(
                    self.out,
                    SetForegroundColor(Color::Yellow),
                    Print(format!("⚠ Could not read {}: {}\n", path, e)),
                    ResetColor
                )?;
                Ok(None)
            }
        }
    }

    pub fn start_page(&mut self, name: &str) -> io::Result<()> {
        execute!(
            self.out,
            SetForegroundColor(Color::White),
            Print(format!(
                "⏳ [{}/{}] {}\n",
                self.done + 1,
                self.total_pages,
                truncate(name)
            )),
            ResetColor
        )
    }

    pub fn finish_page(&mut self, name: &str, report: &ReconcileReport) -> io::Result<()> {
        self.done += 1;

        let (color, marker) = if !report.skipped.is_empty() {
            (Color::Yellow, "⚠")
        } else if report.appended > 0 {
            (Color::Green, "✓")
        } else {
            (Color::DarkGrey, "=")
        };
        execute!(
            self.out,
            SetForegroundColor(color),
            Print(format!("{} {} ({})\n", marker, truncate(name), report.summary())),
            ResetColor
        )
    }

    pub fn fail_page(&mut self, name: &str, error: &str) -> io::Result<()> {
        self.done += 1;
        execute!(
            self.out,
            SetForegroundColor(Color::Red),
            Print(format!("✗ {}: {}\n", truncate(name), error)),
            ResetColor
        )
    }

    pub fn show_totals(&mut self, summary: &IngestSummary) -> io::Result<()> {
        let color = if summary.failures > 0 { Color::Yellow } else { Color::Green };
        execute!(
            self.out,
            SetForegroundColor(color),
            Print(format!(
                "Done: {} pages, {} appended, {} merged, {} field(s) updated, {} skipped, {} failed\n",
                summary.pages,
                summary.appended,
                summary.merged,
                summary.updated_cells,
                summary.skipped,
                summary.failures
            )),
            ResetColor
        )
    }
}

/// Keep the end of long page names, where the file name is.
fn truncate(name: &str) -> String {
    const MAX: usize = 70;
    let count = name.chars().count();
    if count <= MAX {
        name.to_string()
    } else {
        let tail: String = name.chars().skip(count - (MAX - 3)).collect();
        format!("...{}", tail)
    }
}
