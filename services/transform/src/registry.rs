//! Registry of active operators: column resolution, identifier cleaning and
//! deduplication down to one entry per identifier.

use crate::error::PipelineError;
use crate::identifier::clean_identifier;
use crate::schema::{resolve_column, ColumnRule};
use crate::table::RawTable;

const IDENTIFIER_RULE: ColumnRule<'static> = ColumnRule::AnyOf(&["cnpj"]);
const REGISTRATION_RULE: ColumnRule<'static> = ColumnRule::AllOf(&["registro", "ans"]);
const CATEGORY_RULE: ColumnRule<'static> = ColumnRule::AnyOf(&["modalidade"]);
const REGION_RULE: ColumnRule<'static> = ColumnRule::Exact(&["uf", "estado"]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub identifier: String,
    pub registration_id: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct RegistryColumns {
    identifier: usize,
    registration_id: Option<usize>,
    category: Option<usize>,
    region: Option<usize>,
}

fn resolve_registry_columns(headers: &[String]) -> Result<RegistryColumns, PipelineError> {
    let identifier = resolve_column(headers, IDENTIFIER_RULE)
        .ok_or(PipelineError::MissingRegistryColumn("identifier"))?;

    let optional = |rule: ColumnRule<'_>, role: &str| {
        let col = resolve_column(headers, rule);
        match col {
            Some(idx) => tracing::debug!(role, header = %headers[idx], "registry column"),
            None => tracing::warn!(role, "registry column not found, values will be null"),
        }
        col
    };

    Ok(RegistryColumns {
        identifier,
        registration_id: optional(REGISTRATION_RULE, "registration_id"),
        category: optional(CATEGORY_RULE, "category"),
        region: optional(REGION_RULE, "region"),
    })
}

fn optional_text(table: &RawTable, row: usize, col: Option<usize>) -> Option<String> {
    let cell = table.cell(row, col?);
    if cell.is_empty() {
        None
    } else {
        Some(cell.as_text().trim().to_string())
    }
}

/// Build registry entries from the raw registry table, one per row.
pub fn load_registry(table: &RawTable) -> Result<Vec<RegistryEntry>, PipelineError> {
    let cols = resolve_registry_columns(&table.headers)?;

    Ok((0..table.rows.len())
        .map(|row| RegistryEntry {
            identifier: clean_identifier(&table.cell(row, cols.identifier).as_text()),
            registration_id: optional_text(table, row, cols.registration_id),
            category: optional_text(table, row, cols.category),
            region: optional_text(table, row, cols.region),
        })
        .collect())
}

/// Sort ascending by identifier and keep the first entry per identifier.
/// The sort is stable, so among duplicates the earliest registry row wins.
pub fn dedup_registry(mut entries: Vec<RegistryEntry>) -> Vec<RegistryEntry> {
    entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    entries.dedup_by(|later, first| later.identifier == first.identifier);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn registry(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| {
                    r.iter()
                        .map(|c| if c.is_empty() { Cell::Empty } else { Cell::Text(c.to_string()) })
                        .collect()
                })
                .collect(),
            skipped_lines: 0,
        }
    }

    const HEADERS: &[&str] = &["Registro_ANS", "CNPJ", "Razao_Social", "Modalidade", "UF"];

    // -------------------------------------------------------------------------
    // LOADING
    // -------------------------------------------------------------------------

    #[test]
    fn test_load_registry_resolves_columns() {
        let t = registry(HEADERS, &[&["123456", "11.222.333/0001-81", "Op A", "Cooperativa Médica", "SP"]]);
        let entries = load_registry(&t).unwrap();
        assert_eq!(
            entries,
            vec![RegistryEntry {
                identifier: "11222333000181".to_string(),
                registration_id: Some("123456".to_string()),
                category: Some("Cooperativa Médica".to_string()),
                region: Some("SP".to_string()),
            }]
        );
    }

    #[test]
    fn test_load_registry_region_requires_exact_header() {
        let t = registry(&["CNPJ", "UF_Sede", "Estado"], &[&["1", "RJ", "SP"]]);
        let entries = load_registry(&t).unwrap();
        assert_eq!(entries[0].region.as_deref(), Some("SP"));
    }

    #[test]
    fn test_load_registry_missing_optional_columns_are_null() {
        let t = registry(&["CNPJ"], &[&["1"]]);
        let entries = load_registry(&t).unwrap();
        assert_eq!(entries[0].registration_id, None);
        assert_eq!(entries[0].category, None);
        assert_eq!(entries[0].region, None);
    }

    #[test]
    fn test_load_registry_empty_cells_are_null() {
        let t = registry(HEADERS, &[&["", "1", "X", "", "MG"]]);
        let entries = load_registry(&t).unwrap();
        assert_eq!(entries[0].registration_id, None);
        assert_eq!(entries[0].category, None);
    }

    #[test]
    fn test_load_registry_without_identifier_column_fails() {
        let t = registry(&["Registro_ANS", "UF"], &[&["1", "SP"]]);
        assert!(matches!(
            load_registry(&t),
            Err(PipelineError::MissingRegistryColumn("identifier"))
        ));
    }

    // -------------------------------------------------------------------------
    // DEDUPLICATION
    // -------------------------------------------------------------------------

    #[test]
    fn test_dedup_keeps_first_after_sort() {
        let t = registry(
            HEADERS,
            &[
                &["3", "22222222000191", "C", "Seguradora", "RJ"],
                &["1", "11222333000181", "A", "Cooperativa", "SP"],
                &["2", "11.222.333/0001-81", "B", "Filantropia", "MG"],
            ],
        );
        let entries = dedup_registry(load_registry(&t).unwrap());

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].identifier, "11222333000181");
        assert_eq!(entries[0].registration_id.as_deref(), Some("1"));
        assert_eq!(entries[0].region.as_deref(), Some("SP"));
        assert_eq!(entries[1].identifier, "22222222000191");
    }

    #[test]
    fn test_dedup_unique_identifiers_untouched() {
        let t = registry(HEADERS, &[&["1", "2", "A", "", ""], &["2", "1", "B", "", ""]]);
        let entries = dedup_registry(load_registry(&t).unwrap());
        let ids: Vec<&str> = entries.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
