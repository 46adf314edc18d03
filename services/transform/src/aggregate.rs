//! Per-entity KPIs grouped by (entity name, region).

use crate::enrich::EnrichedRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const AGGREGATED_HEADER: &[&str] = &[
    "RazaoSocial",
    "UF",
    "TotalDespesas",
    "MediaDespesasTrimestre",
    "DesvioPadraoDespesas",
    "QuantidadeRegistros",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    #[serde(rename = "RazaoSocial")]
    pub entity_name: String,
    #[serde(rename = "UF")]
    pub region: Option<String>,
    #[serde(rename = "TotalDespesas")]
    pub total: f64,
    #[serde(rename = "MediaDespesasTrimestre")]
    pub mean: f64,
    /// Sample standard deviation; `None` for single-row groups.
    #[serde(rename = "DesvioPadraoDespesas")]
    pub std_dev: Option<f64>,
    #[serde(rename = "QuantidadeRegistros")]
    pub count: usize,
}

fn sample_std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Total descending; equal totals by entity name, then region with a missing
/// region last.
fn output_order(a: &AggregateRow, b: &AggregateRow) -> Ordering {
    b.total
        .total_cmp(&a.total)
        .then_with(|| a.entity_name.cmp(&b.entity_name))
        .then_with(|| match (&a.region, &b.region) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Group records by (entity name, region) and compute total, mean, sample
/// standard deviation and count. Records without a value are ignored.
pub fn aggregate(records: &[EnrichedRecord]) -> Vec<AggregateRow> {
    let mut groups: HashMap<(&str, Option<&str>), Vec<f64>> = HashMap::new();
    for record in records {
        let Some(value) = record.expense_value else {
            continue;
        };
        groups
            .entry((record.entity_name.as_str(), record.region.as_deref()))
            .or_default()
            .push(value);
    }

    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|((name, region), values)| {
            let total: f64 = values.iter().sum();
            let mean = total / values.len() as f64;
            AggregateRow {
                entity_name: name.to_string(),
                region: region.map(str::to_string),
                total,
                mean,
                std_dev: sample_std_dev(&values, mean),
                count: values.len(),
            }
        })
        .collect();

    rows.sort_by(output_order);
    rows
}
