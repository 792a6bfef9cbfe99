//! Portfolio composition: weight per holding, per country, per industry.

use serde::Serialize;
use std::cmp::Ordering;

use crate::table::{ColumnKeywords, NormalizedTable};

/// Pie slice
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub weight: f64,
}

/// Bar of a grouped weight chart
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupWeight {
    pub group: String,
    pub weight: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct TreemapLeaf {
    pub industry: String,
    pub label: String,
    pub weight: f64,
}

/// Industry → holding hierarchy, coloured around the median weight
#[derive(Clone, Debug, Serialize)]
pub struct Treemap {
    pub leaves: Vec<TreemapLeaf>,
    pub color_midpoint: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Composition {
    /// Holdings sorted by weight, largest first
    pub slices: Vec<Slice>,

    pub by_country: Option<Vec<GroupWeight>>,
    pub by_industry: Option<Vec<GroupWeight>>,
    pub treemap: Option<Treemap>,
}

impl Composition {
    pub fn from_table(table: &NormalizedTable, keywords: &ColumnKeywords) -> Self {
        let mut slices: Vec<Slice> = table
            .rows()
            .iter()
            .map(|row| Slice {
                label: row.cell(0).to_string(),
                weight: row.weight(),
            })
            .collect();
        slices.sort_by(|a, b| descending(a.weight, b.weight));

        let by_country = keywords
            .find_country(table.columns())
            .map(|column| group_weights(table, column));

        let industry = keywords.find_industry(table.columns());
        let by_industry = industry.map(|column| group_weights(table, column));
        let treemap = industry.map(|column| Treemap {
            leaves: table
                .rows()
                .iter()
                .map(|row| TreemapLeaf {
                    industry: row.cell(column).to_string(),
                    label: row.cell(0).to_string(),
                    weight: row.weight(),
                })
                .collect(),
            color_midpoint: median(&table.weights()),
        });

        Self {
            slices,
            by_country,
            by_industry,
            treemap,
        }
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Sum weights per distinct value of `column`, largest first.
/// Rows with an empty or `-` group cell are left out.
pub(crate) fn group_weights(table: &NormalizedTable, column: usize) -> Vec<GroupWeight> {
    let mut groups: Vec<GroupWeight> = Vec::new();

    for row in table.rows() {
        let group = row.cell(column);
        if group.is_empty() || group == "-" {
            continue;
        }
        match groups.iter_mut().find(|g| g.group == group) {
            Some(existing) => existing.weight += row.weight(),
            None => groups.push(GroupWeight {
                group: group.to_string(),
                weight: row.weight(),
            }),
        }
    }

    groups.sort_by(|a, b| descending(a.weight, b.weight).then_with(|| a.group.cmp(&b.group)));
    groups
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::normalize_table;

    #[test]
    fn test_slices_sorted_and_groups_summed() {
        let table = normalize_table(
            "| Name | Weight | Country | Sector |\n\
             | A | 15 | US | Tech |\n\
             | B | 40 | KR | Tech |\n\
             | C | 30 | US | Energy |\n\
             | D | 20 |  | Energy |",
        )
        .unwrap();
        let composition = Composition::from_table(&table, &ColumnKeywords::default());

        let labels: Vec<_> = composition.slices.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["B", "C", "D", "A"]);

        let countries = composition.by_country.unwrap();
        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0].group, "US");
        assert!((countries[0].weight - 45.0).abs() < 1e-9);
        assert_eq!(countries[1].group, "KR");

        let industries = composition.by_industry.unwrap();
        assert_eq!(industries[0].group, "Tech");
        assert!((industries[0].weight - 55.0).abs() < 1e-9);
        assert_eq!(industries[1].group, "Energy");

        let treemap = composition.treemap.unwrap();
        assert_eq!(treemap.leaves.len(), 4);
        assert!((treemap.color_midpoint - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_optional_groupings_absent() {
        let table = normalize_table("| Name | Weight |\n| A | 60 |\n| B | 40 |").unwrap();
        let composition = Composition::from_table(&table, &ColumnKeywords::default());

        assert!(composition.by_country.is_none());
        assert!(composition.by_industry.is_none());
        assert!(composition.treemap.is_none());
    }

    #[test]
    fn test_median() {
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-9);
        assert!((median(&[4.0, 1.0, 2.0, 3.0]) - 2.5).abs() < 1e-9);
        assert!(median(&[]).abs() < 1e-9);
    }
}
