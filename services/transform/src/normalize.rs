//! Projection of a raw expense table into canonical expense records.

use crate::identifier::clean_identifier;
use crate::period::Period;
use crate::schema::resolve_expense_columns;
use crate::table::{Cell, RawTable};
use serde::{Deserialize, Serialize};

/// Header of the consolidated checkpoint, in column order.
pub const CONSOLIDATED_HEADER: &[&str] = &["CNPJ", "RazaoSocial", "Trimestre", "Ano", "ValorDespesas"];

/// One accepted source row. Field order is the checkpoint column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    #[serde(rename = "CNPJ")]
    pub identifier: String,
    #[serde(rename = "RazaoSocial")]
    pub entity_name: String,
    #[serde(rename = "Trimestre")]
    pub quarter: u32,
    #[serde(rename = "Ano")]
    pub year: i32,
    #[serde(rename = "ValorDespesas")]
    pub expense_value: Option<f64>,
}

/// Parse a pt-BR formatted number: `.` is a thousands separator and `,` the
/// decimal separator. Anything unparseable (or non-finite) is `None`.
pub fn parse_locale_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace('.', "").replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn cell_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Number(_) => None,
        Cell::Text(s) => parse_locale_decimal(s),
    }
}

/// Normalize every row of `table`. Returns no records if the identifier or
/// value column cannot be resolved.
pub fn normalize_table(table: &RawTable, period: Period) -> Vec<ExpenseRecord> {
    let Some(cols) = resolve_expense_columns(&table.headers) else {
        return Vec::new();
    };

    tracing::debug!(
        identifier = %table.headers[cols.identifier],
        value = %table.headers[cols.value],
        name = ?cols.name.map(|i| &table.headers[i]),
        "resolved expense columns"
    );

    (0..table.rows.len())
        .map(|row| ExpenseRecord {
            identifier: clean_identifier(&table.cell(row, cols.identifier).as_text()),
            entity_name: cols
                .name
                .map(|col| table.cell(row, col).as_text())
                .unwrap_or_default(),
            quarter: period.quarter,
            year: period.year,
            expense_value: cell_value(table.cell(row, cols.value)),
        })
        .collect()
}
