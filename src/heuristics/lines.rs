use regex::Regex;

/// Compiled per-line pattern rules, built once per extraction pass.
///
/// Each rule is an independent predicate-plus-extractor over a single
/// trimmed line, so the rules can be tested in isolation and reordered
/// without touching each other.
pub(super) struct LineRules {
    date: Regex,
    date_y4: Regex,
    date_y2: Regex,
    total: Regex,
    invoice: Regex,
    digit_run: Regex,
    vendor_stop: Regex,
}

impl LineRules {
    pub(super) fn new() -> Self {
        Self {
            date: Regex::new(r"(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4})").unwrap(),
            date_y4: Regex::new(r"(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4})").unwrap(),
            date_y2: Regex::new(r"(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2})").unwrap(),
            total: Regex::new(r"(?i)(?:total|importe|precio)[\s:]*€?\s*(\d+[,.]\d{2})").unwrap(),
            // The label group repeats so stacked labels ("Factura Nº:")
            // are all consumed before the token is captured.
            invoice: Regex::new(r"(?i)(?:(?:factura|fact|nº|n°|numero)[\s:]*)+([A-Z0-9\-]+)")
                .unwrap(),
            digit_run: Regex::new(r"\d{10,}").unwrap(),
            vendor_stop: Regex::new(r"(?i)fecha|total|factura").unwrap(),
        }
    }

    /// First day/month/year triple on the line, normalized to `YYYY-MM-DD`.
    pub(super) fn date(&self, line: &str) -> Option<String> {
        let raw = self.date.captures(line)?.get(1)?.as_str();
        self.normalize_date(raw)
    }

    /// Labelled amount ("total"/"importe"/"precio"), decimal comma
    /// normalized to a dot.
    pub(super) fn total(&self, line: &str) -> Option<String> {
        let cap = self.total.captures(line)?;
        Some(cap[1].replace(',', "."))
    }

    /// Alphanumeric token after an invoice-number label; the label is
    /// discarded, only the token is kept.
    pub(super) fn invoice_number(&self, line: &str) -> Option<String> {
        let cap = self.invoice.captures(line)?;
        Some(cap[1].to_string())
    }

    /// Accepts the first short, number-sparse, keyword-free line as the
    /// vendor name. Intentionally coarse — it will misfire on plenty of
    /// real invoices, which is an accepted limitation of this design.
    pub(super) fn vendor_candidate(&self, line: &str) -> bool {
        let len = line.chars().count();
        len > 5 && len < 50 && !self.digit_run.is_match(line) && !self.vendor_stop.is_match(line)
    }

    /// Try the 4-digit-year form first, then the 2-digit one ("20"
    /// prefixed). Day and month are zero-padded. The outer date pattern
    /// guarantees a separator-delimited triple, so a miss here is rare;
    /// in that case the field simply stays empty.
    fn normalize_date(&self, raw: &str) -> Option<String> {
        for format in [&self.date_y4, &self.date_y2] {
            if let Some(cap) = format.captures(raw) {
                let day = &cap[1];
                let month = &cap[2];
                let year = if cap[3].len() == 2 {
                    format!("20{}", &cap[3])
                } else {
                    cap[3].to_string()
                };
                return Some(format!("{year}-{month:0>2}-{day:0>2}"));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_rule_matches_all_separators() {
        let rules = LineRules::new();
        assert_eq!(rules.date("05/03/2024"), Some("2024-03-05".into()));
        assert_eq!(rules.date("5-3-24"), Some("2024-03-05".into()));
        assert_eq!(rules.date("Fecha: 1.2.2023 tienda"), Some("2023-02-01".into()));
        assert_eq!(rules.date("sin fecha"), None);
    }

    #[test]
    fn date_rule_zero_pads_day_and_month() {
        let rules = LineRules::new();
        assert_eq!(rules.date("7/4/2022"), Some("2022-04-07".into()));
    }

    #[test]
    fn total_rule_labels_and_separators() {
        let rules = LineRules::new();
        assert_eq!(rules.total("Total: €12,50"), Some("12.50".into()));
        assert_eq!(rules.total("PRECIO 8.00"), Some("8.00".into()));
        assert_eq!(rules.total("subtotal-free line 12,50"), None);
        // "subtotal" contains "total", same as the original heuristic
        assert_eq!(rules.total("Subtotal: 3,00"), Some("3.00".into()));
    }

    #[test]
    fn total_rule_requires_two_decimals() {
        let rules = LineRules::new();
        assert_eq!(rules.total("Total: 12"), None);
        assert_eq!(rules.total("Total: 12,5"), None);
    }

    #[test]
    fn invoice_rule_accepts_label_variants() {
        let rules = LineRules::new();
        assert_eq!(rules.invoice_number("Factura Nº: A-1023"), Some("A-1023".into()));
        assert_eq!(rules.invoice_number("FACT 2024-17"), Some("2024-17".into()));
        assert_eq!(rules.invoice_number("numero 88B"), Some("88B".into()));
        assert_eq!(rules.invoice_number("nº F-77"), Some("F-77".into()));
        assert_eq!(rules.invoice_number("no label here"), None);
    }

    #[test]
    fn vendor_rule_length_bounds_are_strict() {
        let rules = LineRules::new();
        assert!(!rules.vendor_candidate("ACME1")); // exactly 5 chars
        assert!(rules.vendor_candidate("ACME12"));
        assert!(!rules.vendor_candidate(&"v".repeat(50)));
        assert!(rules.vendor_candidate(&"v".repeat(49)));
    }

    #[test]
    fn vendor_rule_rejects_digit_runs_and_keywords() {
        let rules = LineRules::new();
        assert!(!rules.vendor_candidate("123456789012345"));
        assert!(rules.vendor_candidate("C/ 123456789 local 2")); // 9 digits is fine
        assert!(!rules.vendor_candidate("Fecha de emision"));
        assert!(!rules.vendor_candidate("TOTAL GENERAL"));
        assert!(!rules.vendor_candidate("factura simplificada"));
    }
}
