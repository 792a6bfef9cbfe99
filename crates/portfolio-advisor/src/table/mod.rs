//! Portfolio Tables
//!
//! Parsing of the markdown table an LLM embeds in its recommendation:
//!
//! ```text
//! raw answer ──▶ extract_markdown_table ──▶ (table block, prose)
//!                                               │
//!                     TableNormalizer::normalize ◀┘
//!                                               │
//!                               NormalizedTable ▼ ──▶ charts
//! ```
//!
//! Both steps are pure functions; failures come back as `TableError`
//! values so callers can fall back to showing the raw text.

mod extract;
mod normalize;

pub use extract::{Extraction, extract_markdown_table};
pub use normalize::{TableNormalizer, normalize_table};

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::error::TableError;

/// Column separator of markdown tables
pub const SEPARATOR: char = '|';

/// Ordered keyword lists used to recognise columns by name.
///
/// Matching is a case-insensitive substring test against trimmed column
/// names; the first matching column (left to right) wins.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnKeywords {
    pub weight: Vec<String>,
    pub ticker: Vec<String>,
    pub country: Vec<String>,
    pub industry: Vec<String>,
}

impl Default for ColumnKeywords {
    fn default() -> Self {
        let list = |words: &[&str]| words.iter().map(|w| (*w).to_string()).collect();
        Self {
            weight: list(&["weight", "비중", "ratio"]),
            ticker: list(&["ticker", "티커", "symbol"]),
            country: list(&["country", "국가", "region"]),
            industry: list(&["industry", "업종", "sector"]),
        }
    }
}

impl ColumnKeywords {
    pub fn find_weight(&self, columns: &[String]) -> Option<usize> {
        find_column(columns, &self.weight)
    }

    pub fn find_ticker(&self, columns: &[String]) -> Option<usize> {
        find_column(columns, &self.ticker)
    }

    pub fn find_country(&self, columns: &[String]) -> Option<usize> {
        find_column(columns, &self.country)
    }

    pub fn find_industry(&self, columns: &[String]) -> Option<usize> {
        find_column(columns, &self.industry)
    }
}

fn find_column(columns: &[String], keywords: &[String]) -> Option<usize> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    columns.iter().position(|column| {
        let name = column.trim().to_lowercase();
        keywords.iter().any(|k| !k.is_empty() && name.contains(k.as_str()))
    })
}

/// One data row; the weight cell is kept both as text and as a number
#[derive(Clone, Debug, Serialize)]
pub struct TableRow {
    cells: Vec<String>,
    weight: f64,
}

impl TableRow {
    pub(crate) const fn new(cells: Vec<String>, weight: f64) -> Self {
        Self { cells, weight }
    }

    /// Cell text by column index (empty when out of range)
    pub fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map_or("", String::as_str)
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub const fn weight(&self) -> f64 {
        self.weight
    }
}

/// A parsed table whose weight column holds only finite numbers
#[derive(Clone, Debug, Serialize)]
pub struct NormalizedTable {
    columns: Vec<String>,
    weight_column: usize,
    rows: Vec<TableRow>,
}

impl NormalizedTable {
    pub(crate) const fn new(columns: Vec<String>, weight_column: usize, rows: Vec<TableRow>) -> Self {
        Self {
            columns,
            weight_column,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub const fn weight_column(&self) -> usize {
        self.weight_column
    }

    pub fn weight_column_name(&self) -> &str {
        &self.columns[self.weight_column]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn weights(&self) -> Vec<f64> {
        self.rows.iter().map(TableRow::weight).collect()
    }

    pub fn total_weight(&self) -> f64 {
        self.rows.iter().map(TableRow::weight).sum()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header plus data rows, no separator row; weights written as numbers
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "| {} |", self.columns.join(" | "));

        for row in &self.rows {
            let cells: Vec<String> = row
                .cells
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    if i == self.weight_column {
                        row.weight.to_string()
                    } else {
                        cell.clone()
                    }
                })
                .collect();
            let _ = writeln!(out, "| {} |", cells.join(" | "));
        }

        out
    }

    /// Rows viewed as holdings.
    ///
    /// The name is the first column; the ticker comes from a ticker-like
    /// column when one exists.
    pub fn portfolio_rows(&self, keywords: &ColumnKeywords) -> Vec<PortfolioRow> {
        let ticker = keywords.find_ticker(&self.columns);
        let country = keywords.find_country(&self.columns);
        let industry = keywords.find_industry(&self.columns);
        let optional = |row: &TableRow, column: Option<usize>| {
            column
                .map(|c| row.cell(c).to_string())
                .filter(|v| !v.is_empty() && v != "-")
        };

        self.rows
            .iter()
            .map(|row| PortfolioRow {
                name: row.cell(0).to_string(),
                ticker: optional(row, ticker),
                weight: row.weight,
                country: optional(row, country),
                industry: optional(row, industry),
            })
            .collect()
    }
}

/// A holding as the chart layer sees it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PortfolioRow {
    pub name: String,
    pub ticker: Option<String>,
    pub weight: f64,
    pub country: Option<String>,
    pub industry: Option<String>,
}

/// Full parse of one model answer
#[derive(Clone, Debug)]
pub struct ParsedResponse {
    pub prose: String,

    /// Raw table text, kept for display when normalization fails
    pub table_text: Option<String>,

    pub table: Result<NormalizedTable, TableError>,
}

/// Extract and normalize in one pass
pub fn parse_response(text: &str, normalizer: &TableNormalizer) -> ParsedResponse {
    let Extraction { table, prose } = extract_markdown_table(text);

    let parsed = table
        .as_deref()
        .map_or(Err(TableError::NoTable), |block| normalizer.normalize(block));

    match &parsed {
        Err(TableError::NoTable) => tracing::debug!("Response has no table"),
        Err(e) => tracing::warn!(error = %e, "Response table is not chartable"),
        Ok(_) => {}
    }

    ParsedResponse {
        prose,
        table_text: table,
        table: parsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnparseableReason;

    const ANSWER: &str = "Here is your plan.

| Name | Ticker | Weight | Country | Industry |
|------|--------|--------|---------|----------|
| Apple | AAPL | 40% | US | Tech |
| Samsung | 005930.KS | 35% | KR | - |

Risk notes follow.";

    #[test]
    fn test_parse_response_success() {
        let parsed = parse_response(ANSWER, &TableNormalizer::default());
        assert_eq!(parsed.prose, "Here is your plan.\n\nRisk notes follow.");

        let table = parsed.table.unwrap();
        assert_eq!(table.len(), 2);
        assert!((table.total_weight() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_response_distinguishes_failures() {
        let normalizer = TableNormalizer::default();

        let parsed = parse_response("No table today.", &normalizer);
        assert_eq!(parsed.table.unwrap_err(), TableError::NoTable);
        assert_eq!(parsed.prose, "No table today.");

        let parsed = parse_response("| Name | Ticker |\n| A | AAA |", &normalizer);
        assert_eq!(
            parsed.table.unwrap_err(),
            TableError::Unparseable(UnparseableReason::NoWeightColumn)
        );
        assert!(parsed.table_text.is_some());
    }

    #[test]
    fn test_portfolio_rows() {
        let table = parse_response(ANSWER, &TableNormalizer::default()).table.unwrap();
        let rows = table.portfolio_rows(&ColumnKeywords::default());

        assert_eq!(rows[0].name, "Apple");
        assert_eq!(rows[0].ticker.as_deref(), Some("AAPL"));
        assert_eq!(rows[0].industry.as_deref(), Some("Tech"));
        assert_eq!(rows[1].country.as_deref(), Some("KR"));
        assert_eq!(rows[1].industry, None);
    }

    #[test]
    fn test_keywords_deserialize_partially() {
        let keywords: ColumnKeywords = serde_json::from_str(r#"{"weight": ["gewicht"]}"#).unwrap();
        assert_eq!(keywords.weight, ["gewicht"]);
        assert_eq!(keywords.country[0], "country");
    }
}
