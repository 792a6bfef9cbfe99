//! Error Types for the Portfolio Advisor

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("No market data for {0}")]
    NoMarketData(String),

    #[error("Market data provider error: {0}")]
    MarketData(String),

    #[error("Invalid survey: {0}")]
    InvalidSurvey(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(usize),

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Empty message")]
    EmptyMessage,

    #[error("Document error: {0}")]
    Document(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent error: {0}")]
    Agent(#[from] agent_core::AgentError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdvisorError {
    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Table(TableError::NoTable) => {
                "The recommendation did not contain a portfolio table.".into()
            }
            Self::Table(TableError::Unparseable(_)) => {
                "The portfolio table could not be parsed; showing the raw answer instead.".into()
            }
            Self::NoMarketData(ticker) => format!("No market data is available for '{ticker}'."),
            Self::InvalidSurvey(msg) => format!("Please check the survey: {msg}"),
            Self::UnknownPreset(index) => format!("There is no preset analysis #{index}."),
            Self::UnknownSession(_) => "That chat session does not exist or has expired.".into(),
            Self::EmptyMessage => "Please enter a message.".into(),
            Self::Agent(e) => e.user_message(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

/// Why a model response could not be turned into a table
///
/// `NoTable` is the normal "no structured data" outcome; `Unparseable`
/// means a table was present but cannot be charted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum TableError {
    #[error("no markdown table found")]
    NoTable,

    #[error("unparseable table ({0})")]
    Unparseable(UnparseableReason),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparseableReason {
    #[error("empty table block")]
    EmptyBlock,

    #[error("no header row")]
    NoHeader,

    #[error("no weight column")]
    NoWeightColumn,

    #[error("no row has a numeric weight")]
    NoValidRows,
}

impl From<UnparseableReason> for TableError {
    fn from(reason: UnparseableReason) -> Self {
        Self::Unparseable(reason)
    }
}
