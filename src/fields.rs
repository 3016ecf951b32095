//! Structured-data extraction from recognized text.
//!
//! A fixed, ordered set of regular expressions per category. All matches
//! across all patterns in a category are collected, in pattern order then
//! match order within the text, without deduplication. A category with no
//! matches yields an empty list.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::StructuredFields;

/// Locale-specific date formats, numeric and French month names.
const DATE_PATTERNS: &[&str] = &[
    r"\d{1,2}/\d{1,2}/\d{4}",
    r"\d{1,2}-\d{1,2}-\d{4}",
    r"(?i)\d{1,2}\s+(?:janvier|février|mars|avril|mai|juin|juillet|août|septembre|octobre|novembre|décembre)\s+\d{4}",
    r"\d{4}-\d{2}-\d{2}",
];

/// Monetary values adjacent to a euro marker.
const AMOUNT_PATTERNS: &[&str] = &[
    r"(?i)\d{1,3}(?:\s\d{3})*(?:,\d{2})?\s*(?:€|euros?|EUR)",
    r"(?i)(?:€|euros?|EUR)\s*\d{1,3}(?:\s\d{3})*(?:,\d{2})?",
    r"(?i)\d+(?:,\d{2})?\s*(?:€|euros?|EUR)",
];

const EMAIL_PATTERNS: &[&str] = &[r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"];

/// French national and international phone numbering.
const PHONE_PATTERNS: &[&str] = &[
    r"(?:\+33|0)\s*[1-9](?:[\s.-]?\d{2}){4}",
    r"0[1-9]\s*\d{2}\s*\d{2}\s*\d{2}\s*\d{2}",
];

fn compiled(cell: &'static OnceLock<Vec<Regex>>, patterns: &[&str]) -> &'static Vec<Regex> {
    cell.get_or_init(|| {
        patterns
            .iter()
            .map(|p| Regex::new(p).expect("field pattern must compile"))
            .collect()
    })
}

fn collect(regexes: &[Regex], text: &str) -> Vec<String> {
    let mut matches = Vec::new();
    for re in regexes {
        for m in re.find_iter(text) {
            matches.push(m.as_str().to_string());
        }
    }
    matches
}

/// Scan extracted text for pattern-matched entities.
pub fn extract_fields(text: &str) -> StructuredFields {
    static DATES: OnceLock<Vec<Regex>> = OnceLock::new();
    static AMOUNTS: OnceLock<Vec<Regex>> = OnceLock::new();
    static EMAILS: OnceLock<Vec<Regex>> = OnceLock::new();
    static PHONES: OnceLock<Vec<Regex>> = OnceLock::new();

    StructuredFields {
        dates: collect(compiled(&DATES, DATE_PATTERNS), text),
        amounts: collect(compiled(&AMOUNTS, AMOUNT_PATTERNS), text),
        emails: collect(compiled(&EMAILS, EMAIL_PATTERNS), text),
        phones: collect(compiled(&PHONES, PHONE_PATTERNS), text),
    }
}
