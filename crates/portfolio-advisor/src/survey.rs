//! Investor Survey
//!
//! The preference questionnaire a user fills in before asking for a
//! recommendation, and the prompt built from it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AdvisorError, Result};

/// Smallest accepted investment, in units of 10,000 KRW
pub const MIN_AMOUNT: u32 = 100;

/// Largest accepted investment, in units of 10,000 KRW
pub const MAX_AMOUNT: u32 = 10_000;

/// Self-declared appetite for volatility
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskAppetite {
    Stable,
    #[default]
    Neutral,
    Aggressive,
}

impl fmt::Display for RiskAppetite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Neutral => write!(f, "neutral"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Survey answers
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestorSurvey {
    /// Understanding of portfolio management (e.g. "none", "basic", "advanced")
    pub knowledge: String,

    /// Investment purpose (retirement, home purchase, ...)
    pub purpose: String,

    pub sectors: Vec<String>,

    pub risk: RiskAppetite,

    /// Expected holding horizon (e.g. "3-5 years")
    pub horizon: String,

    pub regions: Vec<String>,

    /// Asset classes already held
    pub asset_types: Vec<String>,

    pub rebalance: String,

    pub esg_interest: String,

    /// Appetite for gold, commodities, crypto
    pub alternatives: String,

    /// Comma separated tickers the user is interested in
    pub tickers: String,

    /// Total amount in units of 10,000 KRW
    pub amount: u32,
}

impl Default for InvestorSurvey {
    fn default() -> Self {
        Self {
            knowledge: "basic".into(),
            purpose: "wealth building".into(),
            sectors: vec!["IT/Tech".into()],
            risk: RiskAppetite::default(),
            horizon: "3-5 years".into(),
            regions: vec!["Korea".into(), "United States".into()],
            asset_types: vec!["Stocks".into()],
            rebalance: "6 months".into(),
            esg_interest: "neutral".into(),
            alternatives: "some".into(),
            tickers: String::new(),
            amount: 1_000,
        }
    }
}

impl InvestorSurvey {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&self.amount) {
            return Err(AdvisorError::InvalidSurvey(format!(
                "amount must be between {MIN_AMOUNT} and {MAX_AMOUNT} (x10,000 KRW), got {}",
                self.amount
            )));
        }
        Ok(())
    }

    /// Tickers split on commas, trimmed, empties removed
    pub fn parsed_tickers(&self) -> Vec<String> {
        self.tickers
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_uppercase)
            .collect()
    }

    /// Amount in KRW
    pub fn amount_krw(&self) -> u64 {
        u64::from(self.amount) * 10_000
    }

    /// One line per answer
    pub fn describe(&self) -> String {
        [
            format!("Portfolio knowledge: {}", self.knowledge),
            format!("Investment purpose: {}", self.purpose),
            format!("Preferred sectors: {}", self.sectors.join(", ")),
            format!("Risk appetite: {}", self.risk),
            format!("Investment horizon: {}", self.horizon),
            format!("Regions of interest: {}", self.regions.join(", ")),
            format!("Currently held asset classes: {}", self.asset_types.join(", ")),
            format!("Rebalancing cycle: {}", self.rebalance),
            format!("ESG interest: {}", self.esg_interest),
            format!("Alternative investment preference: {}", self.alternatives),
            format!("Tickers of interest: {}", self.tickers),
            format!("Total amount: {} x10,000 KRW", self.amount),
        ]
        .join("\n")
    }

    pub fn recommendation_prompt(&self) -> String {
        format!(
            "Below are the results of the user's portfolio survey.\n\
             {}\n\n\
             Recommend an optimal portfolio for these conditions (holdings, weights, countries, \
             industries, asset classes) and explain the rationale, risk factors, diversification \
             effect, sector outlook and asset class strategy.\n\
             Write the portfolio as a markdown table and the explanation in natural language.\n\n\
             The table MUST have the columns Name, Ticker, Weight, Country and Industry, \
             with Weight given in percent.",
            self.describe()
        )
    }
}
