//! Heuristic column resolution over unknown headers.
//!
//! Headers are scanned left to right and the first header matching the rule
//! wins. Keyword order inside a rule never changes which column is picked.

/// Identifier column keywords in expense tables.
pub const IDENTIFIER_KEYWORDS: &[&str] = &["cnpj", "reg_ans"];
/// Entity name column keywords.
pub const NAME_KEYWORDS: &[&str] = &["razao", "razão", "operadora", "nome"];
/// Declared value column keywords.
pub const VALUE_KEYWORDS: &[&str] = &["vl_saldo_final", "despesa", "sinistro", "valor"];
/// A table is an expense table if any header contains one of these.
pub const EXPENSE_TABLE_KEYWORDS: &[&str] = &["despesa", "sinistro", "evento", "vl_saldo_final"];

/// How a header is tested against a list of keywords. Comparison is always
/// case-insensitive.
#[derive(Debug, Clone, Copy)]
pub enum ColumnRule<'a> {
    /// Header contains at least one keyword.
    AnyOf(&'a [&'a str]),
    /// Header contains every keyword.
    AllOf(&'a [&'a str]),
    /// Header equals one of the keywords.
    Exact(&'a [&'a str]),
}

impl ColumnRule<'_> {
    pub fn matches(&self, header: &str) -> bool {
        let lower = header.to_lowercase();
        match self {
            ColumnRule::AnyOf(keywords) => keywords.iter().any(|k| lower.contains(k)),
            ColumnRule::AllOf(keywords) => keywords.iter().all(|k| lower.contains(k)),
            ColumnRule::Exact(keywords) => keywords.iter().any(|k| lower == *k),
        }
    }
}

/// Index of the first header (left to right) that satisfies `rule`.
pub fn resolve_column(headers: &[String], rule: ColumnRule<'_>) -> Option<usize> {
    headers.iter().position(|h| rule.matches(h))
}

/// First header, in header order, containing any of `keywords`.
pub fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    resolve_column(headers, ColumnRule::AnyOf(keywords))
}

/// Whether a decoded table looks like an expense/claims table.
pub fn is_expense_table(headers: &[String]) -> bool {
    find_column(headers, EXPENSE_TABLE_KEYWORDS).is_some()
}

/// Columns the record normalizer needs from an expense table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseColumns {
    pub identifier: usize,
    pub value: usize,
    pub name: Option<usize>,
}

/// Resolve the expense-table roles. `None` when identifier or value is missing.
pub fn resolve_expense_columns(headers: &[String]) -> Option<ExpenseColumns> {
    let identifier = find_column(headers, IDENTIFIER_KEYWORDS)?;
    let value = find_column(headers, VALUE_KEYWORDS)?;
    let name = find_column(headers, NAME_KEYWORDS);
    Some(ExpenseColumns {
        identifier,
        value,
        name,
    })
}
