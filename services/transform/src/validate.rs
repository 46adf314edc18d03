use crate::identifier::{clean_identifier, is_valid_identifier};
use crate::normalize::ExpenseRecord;
use serde::Serialize;

/// Rows dropped by validation, counted by the first rule they failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub input_rows: usize,
    pub valid_rows: usize,
    pub invalid_identifier: usize,
    pub invalid_value: usize,
    pub empty_name: usize,
}

/// Keep rows with a valid identifier, a positive value and a non-empty name.
/// Identifiers are re-cleaned and names trimmed on the way through.
pub fn validate_records(records: Vec<ExpenseRecord>) -> (Vec<ExpenseRecord>, ValidationStats) {
    let mut stats = ValidationStats {
        input_rows: records.len(),
        ..Default::default()
    };

    let valid: Vec<ExpenseRecord> = records
        .into_iter()
        .filter_map(|mut record| {
            record.identifier = clean_identifier(&record.identifier);
            record.entity_name = record.entity_name.trim().to_string();

            if !is_valid_identifier(&record.identifier) {
                stats.invalid_identifier += 1;
                return None;
            }
            if !matches!(record.expense_value, Some(v) if v > 0.0) {
                stats.invalid_value += 1;
                return None;
            }
            if record.entity_name.is_empty() {
                stats.empty_name += 1;
                return None;
            }
            Some(record)
        })
        .collect();

    stats.valid_rows = valid.len();
    (valid, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "11222333000181";

    fn record(id: &str, name: &str, value: Option<f64>) -> ExpenseRecord {
        ExpenseRecord {
            identifier: id.to_string(),
            entity_name: name.to_string(),
            quarter: 1,
            year: 2025,
            expense_value: value,
        }
    }

    #[test]
    fn test_validate_keeps_valid_rows() {
        let (valid, stats) = validate_records(vec![record(VALID, "  Op A ", Some(10.0))]);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].entity_name, "Op A");
        assert_eq!(stats.valid_rows, 1);
    }

    #[test]
    fn test_validate_rejection_reasons() {
        let input = vec![
            record("11222333000182", "A", Some(10.0)),
            record("11111111111111", "A", Some(10.0)),
            record(VALID, "A", None),
            record(VALID, "A", Some(0.0)),
            record(VALID, "A", Some(-5.0)),
            record(VALID, "   ", Some(5.0)),
            record("11.222.333/0001-81", "B", Some(1.0)),
        ];
        let (valid, stats) = validate_records(input);

        assert_eq!(
            stats,
            ValidationStats {
                input_rows: 7,
                valid_rows: 1,
                invalid_identifier: 2,
                invalid_value: 3,
                empty_name: 1,
            }
        );
        assert_eq!(valid[0].identifier, VALID);
        assert_eq!(valid[0].entity_name, "B");
    }

    #[test]
    fn test_validate_preserves_order() {
        let input = vec![
            record(VALID, "C", Some(3.0)),
            record(VALID, "A", Some(1.0)),
            record(VALID, "B", Some(2.0)),
        ];
        let (valid, _) = validate_records(input);
        let names: Vec<&str> = valid.iter().map(|r| r.entity_name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }
}
