use crate::error::StoreError;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One scraped entity: column name to value, in first-inserted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Set a value. An existing column keeps its position.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        let pos = self.fields.iter().position(|(name, _)| name == column)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.fields.retain(|(name, value)| keep(name, value));
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// True when the column is absent or holds only whitespace.
    pub fn is_blank(&self, column: &str) -> bool {
        self.get(column).map_or(true, |v| v.trim().is_empty())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Values laid out along `header`; absent columns become empty cells.
    pub fn reindex(&self, header: &[String]) -> Vec<String> {
        header
            .iter()
            .map(|column| self.get(column).unwrap_or_default().to_string())
            .collect()
    }

    /// Copy every non-blank value of `incoming` into a blank cell of `self`,
    /// except `skip`. Populated cells are never touched. Returns the number
    /// of cells written.
    pub fn fill_blanks_from(&mut self, incoming: &Record, skip: &str) -> usize {
        let mut filled = 0;
        for (column, value) in incoming.iter() {
            if column == skip || value.trim().is_empty() {
                continue;
            }
            if self.is_blank(column) {
                self.insert(column, value);
                filled += 1;
            }
        }
        filled
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

// Records travel as plain JSON objects, keeping column order.
impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of column names to values")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Record, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut record = Record::new();
                while let Some((column, value)) = access.next_entry::<String, serde_json::Value>()? {
                    // Scraped JSON sometimes carries numbers or nulls
                    let value = match value {
                        serde_json::Value::Null => String::new(),
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    record.insert(column, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// A person listed on the promoter page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub name: String,
    pub mobile: String,
    pub email: String,
}

impl Partner {
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.mobile.trim().is_empty() && self.email.trim().is_empty()
    }
}

/// A table read off a page: header cells plus body rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Index of the first header for which `pred` holds on its lower-cased text.
    pub fn find_column(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.headers.iter().position(|h| pred(&h.to_lowercase()))
    }
}

/// What one reconcile call did to the store.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// New rows added to the end of the store.
    pub appended: usize,
    /// Incoming records whose key was already present (in the store or earlier in the batch).
    pub merged: usize,
    /// Blank cells filled from incoming duplicates.
    pub updated_cells: usize,
    /// Records dropped for lack of a key.
    pub skipped: Vec<StoreError>,
    pub header_changed: bool,
    /// Disallowed columns found in, and removed from, the existing store.
    pub removed_columns: Vec<String>,
    /// The store was rewritten in full rather than appended to.
    pub rewritten: bool,
}

impl ReconcileReport {
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} appended, {} merged, {} field(s) updated",
            self.appended, self.merged, self.updated_cells
        );
        if !self.skipped.is_empty() {
            line.push_str(&format!(", {} skipped (no key)", self.skipped.len()));
        }
        line
    }

    /// Whether the call touched the file at all.
    pub fn wrote(&self) -> bool {
        self.rewritten || self.appended > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn insert_keeps_first_position() {
        let mut r = record(&[("A", "1"), ("B", "2")]);
        r.insert("A", "3");
        r.insert("C", "4");
        assert_eq!(r.columns().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(r.get("A"), Some("3"));
    }

    #[test]
    fn fill_blanks_never_overwrites() {
        let mut existing = record(&[("Id", "X"), ("Name", "Old"), ("City", " ")]);
        let incoming = record(&[("Id", "x"), ("Name", "New"), ("City", "Surat"), ("Zip", ""), ("State", "GJ")]);

        let filled = existing.fill_blanks_from(&incoming, "Id");

        assert_eq!(filled, 2);
        assert_eq!(existing.get("Id"), Some("X"));
        assert_eq!(existing.get("Name"), Some("Old"));
        assert_eq!(existing.get("City"), Some("Surat"));
        assert_eq!(existing.get("State"), Some("GJ"));
        assert!(!existing.contains("Zip"));
    }

    #[test]
    fn reindex_pads_missing_columns() {
        let r = record(&[("B", "2"), ("A", "1")]);
        let header = vec!["A".to_string(), "C".to_string(), "B".to_string()];
        assert_eq!(r.reindex(&header), vec!["1", "", "2"]);
    }

    #[test]
    fn json_object_round_trips_in_order() {
        let r: Record = serde_json::from_str(r#"{"Z": "1", "A": 2, "M": null}"#).unwrap();
        assert_eq!(r.columns().collect::<Vec<_>>(), vec!["Z", "A", "M"]);
        assert_eq!(r.get("A"), Some("2"));
        assert_eq!(r.get("M"), Some(""));
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"Z":"1","A":"2","M":""}"#);
    }

    #[test]
    fn report_summary_mentions_skips() {
        let mut report = ReconcileReport { appended: 1, merged: 2, updated_cells: 3, ..Default::default() };
        assert_eq!(report.summary(), "1 appended, 2 merged, 3 field(s) updated");
        report.skipped.push(StoreError::MissingKeyColumn { index: 0, key_column: "Id".into() });
        assert!(report.summary().ends_with("1 skipped (no key)"));
    }
}
