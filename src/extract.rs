use crate::models::{Partner, Record, Table};
use crate::page::PageSource;
use crate::parser;
use crate::store::RecordStore;
use crate::tui::ReconcileTUI;
use crate::{debug_eprintln, debug_println, status_println};
use anyhow::Result;
use std::io::{self, Write};

/// A store column and the page labels that may carry its value, tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub column: String,
    pub labels: Vec<String>,
}

impl FieldSpec {
    pub fn new(column: &str, labels: &[&str]) -> Self {
        let labels = if labels.is_empty() {
            vec![column.to_string()]
        } else {
            labels.iter().map(|l| l.to_string()).collect()
        };
        Self { column: column.to_string(), labels }
    }
}

/// Label table for a project detail page.
pub fn project_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("Project Name", &[]),
        FieldSpec::new(
            "RERA Reg. No.",
            &["GUJRERA Reg. No.", "RERA Reg. No.", "Registration No", "RERA No", "Reg No"],
        ),
        FieldSpec::new("Project Address", &[]),
        FieldSpec::new("Taluka", &[]),
        FieldSpec::new("District", &[]),
        FieldSpec::new("State", &[]),
        FieldSpec::new("Project Type", &[]),
        FieldSpec::new("About Property", &[]),
        FieldSpec::new("Project Start Date", &[]),
        FieldSpec::new("Project End Date", &[]),
        FieldSpec::new("Project Land Area", &[]),
        FieldSpec::new("Total Open Area", &[]),
        FieldSpec::new("Total Covered Area", &[]),
        FieldSpec::new("Carpet Area of Units (Range)", &["Carpet Area of Units"]),
        FieldSpec::new("Plan Passing Authority", &[]),
        FieldSpec::new("Redevelopment Project", &[]),
        FieldSpec::new("Affordable Housing", &[]),
        FieldSpec::new("Amenities", &[]),
        FieldSpec::new("Total Units", &[]),
        FieldSpec::new("Available Units", &["Available Units", "Available Unit"]),
        FieldSpec::new("Total No. of Towers/Blocks", &[]),
        FieldSpec::new("Promoter Name", &["Promoter Name", "Builder"]),
        FieldSpec::new("Promoter Type", &[]),
        FieldSpec::new("Contact", &[]),
        FieldSpec::new("Email Id", &[]),
        FieldSpec::new("Office Address", &[]),
        FieldSpec::new("Project Estimated Cost (Rs.)", &["Project Estimated Cost"]),
        FieldSpec::new("Percentage Loan Against Project Estimated Cost", &[]),
        FieldSpec::new("Total Quarterly Compliance Required", &[]),
        FieldSpec::new("Total Complied Quarters", &[]),
        FieldSpec::new("Total Quarterly Compliance Defaulted", &[]),
        FieldSpec::new("Total Annual Compliance Required", &[]),
        FieldSpec::new("Total Complied Annual Compliance", &[]),
        FieldSpec::new("Total Annual Compliance Defaulted", &[]),
        FieldSpec::new("Project Status", &[]),
        FieldSpec::new("Website", &[]),
        FieldSpec::new("Approved Date", &[]),
    ]
}

/// Read every field off `page`. Fields the page does not show become empty
/// cells; the type-details table and partner list are folded in when present.
pub fn extract_project<P: PageSource + ?Sized>(page: &P, fields: &[FieldSpec]) -> Record {
    let mut record = Record::new();
    for field in fields {
        let value = field
            .labels
            .iter()
            .find_map(|label| page.lookup(label))
            .unwrap_or_default();
        if value.is_empty() {
            debug_println!("{}: no value for '{}'", page.name(), field.column);
        }
        record.insert(field.column.as_str(), value);
    }

    if let Some(table) = page.table("Type Details") {
        record = combine_rows(&record, &type_details(&table));
    }

    for (column, value) in partner_columns(&page.partners()) {
        record.insert(column, value);
    }

    record
}

/// One record per body row of a type-details table, holding `Unit Type`
/// and `Block`. Booked/un-booked counts are not carried over.
pub fn type_details(table: &Table) -> Vec<Record> {
    let unit_idx = table.find_column(|h| h.contains("unit") && h.contains("type"));
    let block_idx = table.find_column(|h| h.contains("block"));

    table
        .rows
        .iter()
        .map(|cells| {
            let mut row = Record::new();
            for (column, idx) in [("Unit Type", unit_idx), ("Block", block_idx)] {
                if let Some(value) = idx.and_then(|i| cells.get(i)).filter(|v| !v.is_empty()) {
                    row.insert(column, value.as_str());
                }
            }
            row
        })
        .filter(|row| !row.is_empty())
        .collect()
}

/// `base` with each column of `rows` set to that column's non-empty values
/// joined by `"; "`. Columns absent from every row are left alone.
pub fn combine_rows(base: &Record, rows: &[Record]) -> Record {
    let mut combined = base.clone();
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for column in row.columns() {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
    }

    for column in columns {
        let values: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            combined.insert(column, values.join("; "));
        }
    }
    combined
}

/// `Partner 1`, `Partner 2`, ... cells as `"Name, Mobile, Email"`, mobile
/// reduced to digits and empty parts left out.
pub fn partner_columns(partners: &[Partner]) -> Vec<(String, String)> {
    partners
        .iter()
        .enumerate()
        .filter_map(|(i, partner)| {
            let mobile = partner.mobile.trim();
            let mobile = if mobile.is_empty() { String::new() } else { parser::digits_only(mobile) };
            let parts: Vec<&str> = [partner.name.trim(), mobile.as_str(), partner.email.trim()]
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect();
            (!parts.is_empty()).then(|| (format!("Partner {}", i + 1), parts.join(", ")))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub fields: Vec<FieldSpec>,
    /// Stop after this many pages (if not set, take every page given).
    pub max_items: Option<usize>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { fields: project_fields(), max_items: None }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub pages: usize,
    pub appended: usize,
    pub merged: usize,
    pub updated_cells: usize,
    pub skipped: usize,
    pub failures: usize,
}

/// Extract each page and reconcile it into `store` on its own, so one bad
/// page or one failed write does not lose the others.
pub fn run_ingest<I, P, W>(
    pages: I,
    store: &RecordStore,
    options: &IngestOptions,
    mut tui: Option<&mut ReconcileTUI<W>>,
) -> IngestSummary
where
    I: IntoIterator<Item = Result<P>>,
    P: PageSource,
    W: Write,
{
    let mut summary = IngestSummary::default();

    for page in pages {
        if let Some(max) = options.max_items {
            if summary.pages >= max {
                status_println!("Reached maximum number of items ({}), stopping", max);
                break;
            }
        }
        summary.pages += 1;

        let page = match page {
            Ok(page) => page,
            Err(e) => {
                debug_eprintln!("Error loading page #{}: {:#}", summary.pages, e);
                summary.failures += 1;
                if let Some(tui) = tui.as_mut() {
                    terminal(tui.fail_page(&format!("page #{}", summary.pages), &format!("{:#}", e)));
                }
                continue;
            }
        };

        if let Some(tui) = tui.as_mut() {
            terminal(tui.start_page(page.name()));
        }

        let record = extract_project(&page, &options.fields);
        match store.reconcile(std::slice::from_ref(&record)) {
            Ok(report) => {
                summary.appended += report.appended;
                summary.merged += report.merged;
                summary.updated_cells += report.updated_cells;
                summary.skipped += report.skipped.len();
                if let Some(tui) = tui.as_mut() {
                    terminal(tui.finish_page(page.name(), &report));
                }
            }
            Err(e) => {
                summary.failures += 1;
                if let Some(tui) = tui.as_mut() {
                    terminal(tui.fail_page(page.name(), &e.to_string()));
                }
            }
        }
    }

    summary
}

/// Progress output is best effort; a closed terminal must not stop the ingest.
fn terminal(result: io::Result<()>) {
    if let Err(e) = result {
        debug_eprintln!("Terminal output failed: {}", e);
    }
}
