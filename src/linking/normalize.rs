//! Haystack construction for the matcher.

use unicode_normalization::UnicodeNormalization;

use crate::entity::{Record, TextField};

/// Join the record's present text fields with single spaces and lowercase
/// the result. Missing or blank fields contribute nothing; an empty string
/// comes back when no field is present.
pub fn normalize_text(record: &Record, fields: &[TextField]) -> String {
    let joined = fields
        .iter()
        .filter_map(|field| record.text(*field))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    normalize_str(&joined)
}

/// NFC + lowercase. Punctuation is left for the tokenizer.
pub fn normalize_str(value: &str) -> String {
    value.trim().nfc().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::types::DEFAULT_TEXT_FIELDS;

    #[test]
    fn test_joins_present_fields_in_order() {
        let mut invoice = Record::new(EntityType::Invoice, "i1");
        invoice.title = Some("Invoice for TechCorp".to_string());
        invoice.description = Some("Monthly Retainer".to_string());
        invoice.notes = Some("   ".to_string());
        assert_eq!(
            normalize_text(&invoice, &DEFAULT_TEXT_FIELDS),
            "invoice for techcorp monthly retainer"
        );
    }

    #[test]
    fn test_respects_configured_fields() {
        let mut task = Record::new(EntityType::Task, "t1");
        task.title = Some("Logo".to_string());
        task.notes = Some("Ask about Brand Refresh".to_string());
        assert_eq!(normalize_text(&task, &[TextField::Notes]), "ask about brand refresh");
        assert_eq!(normalize_text(&task, &[]), "");
    }

    #[test]
    fn test_empty_record_is_empty_string() {
        let record = Record::new(EntityType::Project, "p1");
        assert_eq!(normalize_text(&record, &DEFAULT_TEXT_FIELDS), "");
    }

    #[test]
    fn test_keeps_punctuation_and_composes_accents() {
        // "Cafe\u{301}" is the decomposed spelling of "Café".
        assert_eq!(normalize_str("Cafe\u{301} Nord, LLC"), "café nord, llc");
    }
}
