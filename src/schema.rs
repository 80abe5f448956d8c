use crate::config::StoreOptions;
use std::collections::HashSet;

/// Canonical form of a key value: trimmed and upper-cased.
pub fn normalize_key(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Rename repeated header names to `Name.1`, `Name.2`, ... so every column
/// keeps its own cells. Suffixes already taken by another column are skipped.
pub fn unique_header<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    let mut taken: HashSet<String> = names.iter().cloned().collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut header = Vec::with_capacity(names.len());

    for name in &names {
        if seen.insert(name.as_str()) {
            header.push(name.clone());
            continue;
        }
        let mut n = 1;
        let renamed = loop {
            let candidate = format!("{}.{}", name, n);
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        taken.insert(renamed.clone());
        header.push(renamed);
    }
    header
}

/// Header for the next write: preferred columns present on either side, in
/// preferred order, then every other column in first-seen order (existing
/// before incoming). Disallowed columns never make it in.
pub fn order_columns<'a, E, I>(existing: E, incoming: I, options: &StoreOptions) -> Vec<String>
where
    E: IntoIterator<Item = &'a str>,
    I: IntoIterator<Item = &'a str>,
{
    let mut seen_order: Vec<&str> = Vec::new();
    let mut present: HashSet<&str> = HashSet::new();
    for column in existing.into_iter().chain(incoming) {
        if present.insert(column) {
            seen_order.push(column);
        }
    }

    let mut union = Vec::with_capacity(seen_order.len());
    let mut placed: HashSet<&str> = HashSet::new();

    for column in &options.preferred_columns {
        let column = column.as_str();
        if present.contains(column) && !options.is_disallowed(column) && placed.insert(column) {
            union.push(column.to_string());
        }
    }
    for column in seen_order {
        if !options.is_disallowed(column) && placed.insert(column) {
            union.push(column.to_string());
        }
    }

    union
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> StoreOptions {
        StoreOptions::keyed_by("Id")
            .with_preferred(&["Name", "Id", "City"])
            .with_disallowed(&["Booked"])
    }

    #[test]
    fn normalizes_keys() {
        assert_eq!(normalize_key("  gj/ahd/123 "), "GJ/AHD/123");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn preferred_first_then_first_seen() {
        let header = order_columns(["Extra", "Id"], ["Zeta", "Name", "Extra", "Alpha"], &opts());
        assert_eq!(header, vec!["Name", "Id", "Extra", "Zeta", "Alpha"]);
    }

    #[test]
    fn drops_disallowed_everywhere() {
        let options = opts().with_preferred(&["Booked", "Id"]);
        let header = order_columns(["Id", "Booked"], ["Booked", "Note"], &options);
        assert_eq!(header, vec!["Id", "Note"]);
    }

    #[test]
    fn repeated_header_names_get_suffixes() {
        assert_eq!(unique_header(["RegNo", "Name", "Name"]), vec!["RegNo", "Name", "Name.1"]);
        assert_eq!(
            unique_header(["A", "A", "A.1", "A"]),
            vec!["A", "A.2", "A.1", "A.3"]
        );
        assert_eq!(unique_header(["x", "y"]), vec!["x", "y"]);
    }

    #[test]
    fn stable_when_nothing_new() {
        let options = opts();
        let first = order_columns(Vec::<&str>::new(), ["City", "Id", "Other"], &options);
        let again = order_columns(first.iter().map(String::as_str), ["Other", "Id"], &options);
        assert_eq!(first, again);
    }
}
