//! Country distribution for a choropleth map.

use serde::Serialize;

use super::composition::group_weights;
use crate::table::{ColumnKeywords, NormalizedTable};

/// Shown when the table has no country column
const SAMPLE_DISTRIBUTION: [(&str, f64); 8] = [
    ("United States", 45.0),
    ("South Korea", 20.0),
    ("China", 10.0),
    ("Japan", 5.0),
    ("Germany", 5.0),
    ("United Kingdom", 5.0),
    ("India", 5.0),
    ("Brazil", 5.0),
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountryWeight {
    /// English country name, as map libraries expect
    pub country: String,
    pub weight: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Geography {
    pub countries: Vec<CountryWeight>,

    /// True when `countries` is the illustrative sample, not the portfolio
    pub sample: bool,
}

impl Geography {
    pub fn from_table(table: &NormalizedTable, keywords: &ColumnKeywords) -> Self {
        let Some(column) = keywords.find_country(table.columns()) else {
            tracing::warn!("No country column; using sample geographic distribution");
            return Self::sample();
        };

        let mut countries: Vec<CountryWeight> = Vec::new();
        for group in group_weights(table, column) {
            let country = english_country_name(&group.group);
            match countries.iter_mut().find(|c| c.country == country) {
                Some(existing) => existing.weight += group.weight,
                None => countries.push(CountryWeight {
                    country: country.to_string(),
                    weight: group.weight,
                }),
            }
        }
        countries.sort_by(|a, b| b.weight.total_cmp(&a.weight));

        Self {
            countries,
            sample: false,
        }
    }

    pub fn sample() -> Self {
        Self {
            countries: SAMPLE_DISTRIBUTION
                .iter()
                .map(|(country, weight)| CountryWeight {
                    country: (*country).to_string(),
                    weight: *weight,
                })
                .collect(),
            sample: true,
        }
    }
}

/// Korean names and common codes mapped to English; anything else passes through
fn english_country_name(name: &str) -> &str {
    match name.trim() {
        "한국" | "대한민국" | "KR" | "Korea" => "South Korea",
        "미국" | "US" | "USA" => "United States",
        "중국" | "CN" => "China",
        "일본" | "JP" => "Japan",
        "영국" | "UK" | "GB" => "United Kingdom",
        "독일" | "DE" => "Germany",
        "프랑스" | "FR" => "France",
        "인도" | "IN" => "India",
        "브라질" | "BR" => "Brazil",
        "캐나다" | "CA" => "Canada",
        "호주" | "AU" => "Australia",
        "러시아" | "RU" => "Russia",
        other => other,
    }
}
