//! Many-to-one left join of validated expenses onto the deduplicated registry.

use crate::error::PipelineError;
use crate::normalize::ExpenseRecord;
use crate::registry::RegistryEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const ENRICHED_HEADER: &[&str] = &[
    "CNPJ",
    "RazaoSocial",
    "Trimestre",
    "Ano",
    "ValorDespesas",
    "RegistroANS",
    "Modalidade",
    "UF",
    "SemCadastro",
];

/// Expense columns followed by the matched registry columns. Kept flat so
/// the csv serializer can write it as one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
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
    #[serde(rename = "RegistroANS")]
    pub registration_id: Option<String>,
    #[serde(rename = "Modalidade")]
    pub category: Option<String>,
    #[serde(rename = "UF")]
    pub region: Option<String>,
    #[serde(rename = "SemCadastro")]
    pub missing_registry: bool,
}

impl EnrichedRecord {
    fn new(expense: ExpenseRecord, entry: Option<&RegistryEntry>) -> Self {
        Self {
            identifier: expense.identifier,
            entity_name: expense.entity_name,
            quarter: expense.quarter,
            year: expense.year,
            expense_value: expense.expense_value,
            registration_id: entry.and_then(|e| e.registration_id.clone()),
            category: entry.and_then(|e| e.category.clone()),
            region: entry.and_then(|e| e.region.clone()),
            missing_registry: entry.is_none(),
        }
    }
}

/// Index the registry by identifier. More than one entry for an identifier
/// is a fatal integrity error: joining on it would duplicate expense rows.
fn index_registry(registry: &[RegistryEntry]) -> Result<HashMap<&str, &RegistryEntry>, PipelineError> {
    let mut index: HashMap<&str, &RegistryEntry> = HashMap::with_capacity(registry.len());
    for entry in registry {
        if index.insert(entry.identifier.as_str(), entry).is_some() {
            let count = registry
                .iter()
                .filter(|e| e.identifier == entry.identifier)
                .count();
            return Err(PipelineError::RegistryCardinality {
                identifier: entry.identifier.clone(),
                count,
            });
        }
    }
    Ok(index)
}

/// Left join: every input record yields exactly one output record, in order.
pub fn enrich(
    records: Vec<ExpenseRecord>,
    registry: &[RegistryEntry],
) -> Result<Vec<EnrichedRecord>, PipelineError> {
    let index = index_registry(registry)?;

    Ok(records
        .into_iter()
        .map(|expense| {
            let entry = index.get(expense.identifier.as_str()).copied();
            EnrichedRecord::new(expense, entry)
        })
        .collect())
}
