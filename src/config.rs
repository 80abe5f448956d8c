use crate::error::StoreError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const DEFAULT_KEY_COLUMN: &str = "RERA Reg. No.";

pub const DEFAULT_KEY_ALIASES: &[&str] = &[
    "RERA Reg Number",
    "regno",
    "Registration No.",
    "Registration Number",
    "RERA No",
];

/// Column order used when writing the projects CSV. Unknown columns follow.
pub const DEFAULT_PREFERRED_COLUMNS: &[&str] = &[
    "Project Name",
    "RERA Reg. No.",
    "Project Address",
    "Taluka",
    "District",
    "State",
    "Project Type",
    "About Property",
    "Project Start Date",
    "Project End Date",
    "Project Land Area",
    "Total Open Area",
    "Total Covered Area",
    "Carpet Area of Units (Range)",
    "Plan Passing Authority",
    "Redevelopment Project",
    "Affordable Housing",
    "Amenities",
    "Unit Type",
    "Block",
    "Total Units",
    "Available Units",
    "Total No. of Towers/Blocks",
    "Promoter Name",
    "Promoter Type",
    "Contact",
    "Email Id",
    "Address",
    "Office Address",
    // "Name, Mobile, Email Id" in a single cell
    "Partner 1",
    "Partner 2",
    "Partner 3",
    "Partner 4",
    "Partner 5",
    "Project Estimated Cost (Rs.)",
    "Percentage Loan Against Project Estimated Cost",
    "Total Quarterly Compliance Required",
    "Total Complied Quarters",
    "Total Quarterly Compliance Defaulted",
    "Total Annual Compliance Required",
    "Total Complied Annual Compliance",
    "Total Annual Compliance Defaulted",
    "Project Status",
    "Website",
    "Approved Date",
];

pub const DEFAULT_DISALLOWED_COLUMNS: &[&str] = &[
    "Booked Units as on",
    "Un-booked Units as on",
    // legacy name-only partner columns
    "Partner 1 Name",
    "Partner 2 Name",
    "Partner 3 Name",
    "Partner 4 Name",
    "Partner 5 Name",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    pub key_column: String,
    /// Tried in order when a record has no value under `key_column`.
    pub key_aliases: Vec<String>,
    pub preferred_columns: Vec<String>,
    /// Dropped from every record and from the store header on sight.
    pub disallowed_columns: BTreeSet<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            key_aliases: to_strings(DEFAULT_KEY_ALIASES),
            preferred_columns: to_strings(DEFAULT_PREFERRED_COLUMNS),
            disallowed_columns: DEFAULT_DISALLOWED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl StoreOptions {
    /// Options with only a key column: no aliases, no preferred order, nothing disallowed.
    pub fn keyed_by(key_column: &str) -> Self {
        Self {
            key_column: key_column.to_string(),
            key_aliases: Vec::new(),
            preferred_columns: Vec::new(),
            disallowed_columns: BTreeSet::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.key_aliases = to_strings(aliases);
        self
    }

    pub fn with_preferred(mut self, columns: &[&str]) -> Self {
        self.preferred_columns = to_strings(columns);
        self
    }

    pub fn with_disallowed(mut self, columns: &[&str]) -> Self {
        self.disallowed_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Load options from a JSON file. Missing fields keep the project preset.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .context(format!("Failed to open options file: {}", path.display()))?;
        let options: StoreOptions = serde_json::from_reader(BufReader::new(file))
            .context(format!("Failed to parse options file: {}", path.display()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.key_column.trim().is_empty() {
            return Err(StoreError::InvalidOptions("key column must not be empty".to_string()));
        }
        if self.is_disallowed(&self.key_column) {
            return Err(StoreError::InvalidOptions(format!(
                "key column '{}' is listed as disallowed",
                self.key_column
            )));
        }
        Ok(())
    }

    pub fn is_disallowed(&self, column: &str) -> bool {
        self.disallowed_columns.contains(column)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_is_project_preset() {
        let options = StoreOptions::default();
        assert_eq!(options.key_column, "RERA Reg. No.");
        assert_eq!(options.key_aliases.first().map(String::as_str), Some("RERA Reg Number"));
        assert_eq!(options.preferred_columns.len(), DEFAULT_PREFERRED_COLUMNS.len());
        assert!(options.is_disallowed("Partner 3 Name"));
        assert!(!options.is_disallowed("Partner 3"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn rejects_bad_key_column() {
        assert!(StoreOptions::keyed_by("  ").validate().is_err());
        let options = StoreOptions::keyed_by("Id").with_disallowed(&["Id"]);
        assert!(matches!(options.validate(), Err(StoreError::InvalidOptions(_))));
    }

    #[test]
    fn json_overrides_keep_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"key_column": "Project ID", "key_aliases": ["ID"]}}"#).unwrap();

        let options = StoreOptions::from_json_file(file.path()).unwrap();
        assert_eq!(options.key_column, "Project ID");
        assert_eq!(options.key_aliases, vec!["ID".to_string()]);
        assert_eq!(options.preferred_columns, StoreOptions::default().preferred_columns);
    }

    #[test]
    fn json_file_errors_carry_context() {
        let err = StoreOptions::from_json_file("/nonexistent/options.json").unwrap_err();
        assert!(err.to_string().contains("Failed to open options file"));
    }
}
