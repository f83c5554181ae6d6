// src/heuristics/mod.rs

mod lines;

use serde::Deserialize;
use serde::Serialize;

/// Characters of raw recognized text kept as the free-text excerpt.
const EXCERPT_CHARS: usize = 200;

/// Structured fields extracted from recognized invoice text.
///
/// Empty string means "not found" — the review stage shows every field
/// either way, so there is no distinction between missing and blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub date: String,
    pub vendor: String,
    pub invoice_number: String,
    pub total: String,
    pub excerpt: String,
}

impl InvoiceRecord {
    /// Names of the mandatory fields (date, vendor, total) that are still empty.
    pub fn missing_mandatory(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.date.is_empty() {
            missing.push("date");
        }
        if self.vendor.is_empty() {
            missing.push("vendor");
        }
        if self.total.is_empty() {
            missing.push("total");
        }
        missing
    }

    /// How many of the heuristic fields were filled (excerpt excluded).
    pub fn coverage(&self) -> (usize, usize) {
        let filled = [
            !self.date.is_empty(),
            !self.vendor.is_empty(),
            !self.invoice_number.is_empty(),
            !self.total.is_empty(),
        ]
        .iter()
        .filter(|&&v| v)
        .count();
        (filled, 4)
    }
}

/// Extract structured invoice fields from raw recognized text.
///
/// Pure and deterministic: line-oriented pattern rules, first matching
/// line wins per field. Input with no matches is not an error — the
/// result then carries only the excerpt.
pub fn extract(text: &str) -> InvoiceRecord {
    let rules = lines::LineRules::new();
    let mut record = InvoiceRecord {
        excerpt: text.chars().take(EXCERPT_CHARS).collect(),
        ..InvoiceRecord::default()
    };

    for line in text.lines() {
        let line = line.trim();

        if record.date.is_empty() {
            if let Some(date) = rules.date(line) {
                record.date = date;
            }
        }
        if record.total.is_empty() {
            if let Some(total) = rules.total(line) {
                record.total = total;
            }
        }
        if record.invoice_number.is_empty() {
            if let Some(number) = rules.invoice_number(line) {
                record.invoice_number = number;
            }
        }
        if record.vendor.is_empty() && rules.vendor_candidate(line) {
            record.vendor = line.to_string();
        }
    }

    record
}
