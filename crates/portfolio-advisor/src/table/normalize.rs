//! Table normalization
//!
//! Turns an extracted pipe-delimited block into a `NormalizedTable` whose
//! weight column is numeric. Rows with an unusable weight are dropped.

use std::collections::HashSet;

use super::{ColumnKeywords, NormalizedTable, SEPARATOR, TableRow};
use crate::error::{TableError, UnparseableReason};

/// Parses table blocks using an injectable set of column keywords
#[derive(Clone, Debug, Default)]
pub struct TableNormalizer {
    keywords: ColumnKeywords,
}

impl TableNormalizer {
    pub const fn new(keywords: ColumnKeywords) -> Self {
        Self { keywords }
    }

    pub const fn keywords(&self) -> &ColumnKeywords {
        &self.keywords
    }

    /// Normalize a table block.
    ///
    /// Fails with `Unparseable` when the block is empty, has no header,
    /// has no weight-like column, or no row carries a finite weight.
    pub fn normalize(&self, block: &str) -> Result<NormalizedTable, TableError> {
        if block.trim().is_empty() {
            return Err(UnparseableReason::EmptyBlock.into());
        }

        let mut lines = block
            .lines()
            .filter(|line| !line.trim().is_empty() && !is_separator_row(line));

        let header = lines.next().ok_or(UnparseableReason::NoHeader)?;
        let header_fields = split_fields(header);

        // Unnamed columns carry no chartable data.
        let kept: Vec<usize> = header_fields
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, _)| i)
            .collect();
        if kept.is_empty() {
            return Err(UnparseableReason::NoHeader.into());
        }

        let columns = dedupe_names(kept.iter().map(|&i| header_fields[i]));
        let weight_column = self
            .keywords
            .find_weight(&columns)
            .ok_or(UnparseableReason::NoWeightColumn)?;

        let mut rows = Vec::new();
        let mut dropped = 0usize;

        for line in lines {
            let fields = split_fields(line);

            if fields.len() > header_fields.len()
                && fields[header_fields.len()..].iter().any(|f| !f.is_empty())
            {
                tracing::debug!(line, "Dropping row with more cells than the header");
                dropped += 1;
                continue;
            }

            let cells: Vec<String> = kept
                .iter()
                .map(|&i| fields.get(i).copied().unwrap_or_default().to_string())
                .collect();

            let Some(weight) = parse_weight(&cells[weight_column]) else {
                tracing::debug!(cell = %cells[weight_column], "Dropping row with non-numeric weight");
                dropped += 1;
                continue;
            };

            rows.push(TableRow::new(cells, weight));
        }

        if rows.is_empty() {
            return Err(UnparseableReason::NoValidRows.into());
        }
        if dropped > 0 {
            tracing::debug!(kept = rows.len(), dropped, "Partial row loss during normalization");
        }

        Ok(NormalizedTable::new(columns, weight_column, rows))
    }
}

/// Normalize with the default keyword set
pub fn normalize_table(block: &str) -> Result<NormalizedTable, TableError> {
    TableNormalizer::default().normalize(block)
}

/// Header/data separator such as `|---|:---:|`
fn is_separator_row(line: &str) -> bool {
    line.chars()
        .filter(|c| *c != SEPARATOR && !c.is_whitespace())
        .all(|c| c == '-' || c == ':')
}

/// Cells of one line, without the empty cells produced by edge pipes
fn split_fields(line: &str) -> Vec<&str> {
    let line = line.trim();
    let line = line.strip_prefix(SEPARATOR).unwrap_or(line);
    let line = line.strip_suffix(SEPARATOR).unwrap_or(line);
    line.split(SEPARATOR).map(str::trim).collect()
}

/// `45%` → 45.0, `1,250.5` → 1250.5; anything non-finite is rejected
fn parse_weight(cell: &str) -> Option<f64> {
    let cleaned: String = cell.chars().filter(|c| *c != '%' && *c != ',').collect();
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite())
}

/// Repeated names get `.1`, `.2`, ... suffixes
fn dedupe_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for name in names {
        let mut candidate = name.to_string();
        let mut n = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{name}.{n}");
            n += 1;
        }
        columns.push(candidate);
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
| Name | Ticker | Weight | Country |
|------|--------|--------|---------|
| Apple | AAPL | 40% | US |
| Samsung | 005930.KS | 35% | KR |
| Cash | - | bad | - |";

    fn reason(result: Result<NormalizedTable, TableError>) -> UnparseableReason {
        match result {
            Err(TableError::Unparseable(reason)) => reason,
            other => panic!("expected unparseable, got {other:?}"),
        }
    }

    #[test]
    fn test_drops_bad_rows_and_edge_columns() {
        let table = normalize_table(TABLE).unwrap();

        assert_eq!(table.columns(), ["Name", "Ticker", "Weight", "Country"]);
        assert_eq!(table.weight_column_name(), "Weight");
        assert_eq!(table.len(), 2);
        assert_eq!(table.weights(), vec![40.0, 35.0]);
        assert_eq!(table.rows()[1].cell(1), "005930.KS");
    }

    #[test]
    fn test_clean_percentages_keep_row_count() {
        let block = "| Name | Weight |\n|---|---|\n| A | 45% |\n| B | 30% |\n| C | 25% |";
        let table = normalize_table(block).unwrap();
        assert_eq!(table.len(), 3);
        assert!((table.weights()[0] - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_weight_column() {
        let block = "| Name | Ticker | Allocation |\n|---|---|---|\n| A | AAA | 50% |";
        assert_eq!(reason(normalize_table(block)), UnparseableReason::NoWeightColumn);
    }

    #[test]
    fn test_weight_keywords_are_case_insensitive_and_localized() {
        let table = normalize_table("| 종목명 | 투자 비중 |\n| 삼성전자 | 30 |").unwrap();
        assert_eq!(table.weight_column_name(), "투자 비중");

        let table = normalize_table("| Asset | Target RATIO |\n| Bonds | 0.4 |").unwrap();
        assert!((table.weights()[0] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_first_matching_column_wins() {
        let table = normalize_table("| Name | Weight (%) | Ratio |\n| A | 10 | 99 |").unwrap();
        assert_eq!(table.weight_column_name(), "Weight (%)");
        assert_eq!(table.weights(), vec![10.0]);
    }

    #[test]
    fn test_one_bad_row_preserves_order() {
        let block = "| Name | Weight |\n|--|--|\n| A | 10% |\n| B | N/A |\n| C | 20% |\n| D | 30% |";
        let table = normalize_table(block).unwrap();
        let names: Vec<_> = table.rows().iter().map(|r| r.cell(0)).collect();
        assert_eq!(names, ["A", "C", "D"]);
    }

    #[test]
    fn test_thousands_separator_and_spaces() {
        let table = normalize_table("| Name | Weight |\n| A | 1,250.5 % |").unwrap();
        assert!((table.weights()[0] - 1250.5).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_weights_are_dropped() {
        let block = "| Name | Weight |\n| A | inf |\n| B | NaN |\n| C | 5 |";
        let table = normalize_table(block).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_failure_reasons() {
        assert_eq!(reason(normalize_table("   \n")), UnparseableReason::EmptyBlock);
        assert_eq!(reason(normalize_table("|---|---|\n| :-: |")), UnparseableReason::NoHeader);
        assert_eq!(
            reason(normalize_table("| | |\n| a | b |")),
            UnparseableReason::NoWeightColumn
        );
        assert_eq!(
            reason(normalize_table("| Name | Weight |\n|---|---|\n| A | n/a |")),
            UnparseableReason::NoValidRows
        );
        assert_eq!(
            reason(normalize_table("| Name | Weight |\n|---|---|")),
            UnparseableReason::NoValidRows
        );
    }

    #[test]
    fn test_alignment_row_is_stripped() {
        let table = normalize_table("| Name | Weight |\n|:---|---:|\n| A | 70% |").unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_short_rows_are_padded_and_long_rows_dropped() {
        let block = "| Name | Weight | Country |\n| A | 50 |\n| B | 20 | US | extra |\n| C | 30 | KR |";
        let table = normalize_table(block).unwrap();

        let names: Vec<_> = table.rows().iter().map(|r| r.cell(0)).collect();
        assert_eq!(names, ["A", "C"]);
        assert_eq!(table.rows()[0].cell(2), "");
    }

    #[test]
    fn test_duplicate_column_names_are_suffixed() {
        let table = normalize_table("| Name | Weight | Name |\n| A | 1 | a |").unwrap();
        assert_eq!(table.columns(), ["Name", "Weight", "Name.1"]);
    }

    #[test]
    fn test_renormalizing_serialized_table_is_stable() {
        let first = normalize_table(TABLE).unwrap();
        let second = normalize_table(&first.to_markdown()).unwrap();

        assert_eq!(first.columns(), second.columns());
        assert_eq!(first.len(), second.len());
        for (a, b) in first.weights().iter().zip(second.weights()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_custom_keywords() {
        let keywords = ColumnKeywords {
            weight: vec!["poids".into()],
            ..ColumnKeywords::default()
        };
        let normalizer = TableNormalizer::new(keywords);

        let table = normalizer.normalize("| Nom | Poids |\n| A | 12 % |").unwrap();
        assert_eq!(table.weights(), vec![12.0]);
        assert!(normalizer.normalize("| Name | Weight |\n| A | 1 |").is_err());
    }
}
