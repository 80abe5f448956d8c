use regex::Regex;
use std::sync::LazyLock;

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?::-|:|-)?\s*").expect("separator regex"));
static NON_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\D+").expect("non-digit regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Text following `marker` inside `text`, with a leading `:-`, `:` or `-`
/// removed. When nothing follows on the marker's line, the next non-empty
/// line is used instead. Matching is case-insensitive.
pub fn value_after_marker(text: &str, marker: &str) -> Option<String> {
    let marker = marker.trim();
    if marker.is_empty() {
        return None;
    }
    let needle = marker.to_lowercase();
    let lines: Vec<&str> = text.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        let Some(pos) = find_case_insensitive(line, &needle) else {
            continue;
        };
        let rest = &line[pos + needle.len()..];
        let value = SEPARATOR.replace(rest, "").trim().to_string();
        if !value.is_empty() {
            return Some(value);
        }
        return lines[i + 1..]
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .map(str::to_string);
    }
    None
}

// Byte offset in `haystack` of `needle_lower`, compared without case.
fn find_case_insensitive(haystack: &str, needle_lower: &str) -> Option<usize> {
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| {
            haystack[i..]
                .get(..needle_lower.len())
                .is_some_and(|window| window.to_lowercase() == needle_lower)
        })
}

/// Keep only the digits of a phone number. Input without digits is returned trimmed.
pub fn digits_only(text: &str) -> String {
    let digits = NON_DIGIT.replace_all(text, "");
    if digits.is_empty() {
        text.trim().to_string()
    } else {
        digits.into_owned()
    }
}

/// Label text as it appears in a column name: single-spaced, no trailing colon or dash.
pub fn clean_label(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ");
    collapsed
        .trim_end_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
        .to_string()
}
