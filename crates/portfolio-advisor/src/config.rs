//! Advisor configuration read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use agent_core::GenerationOptions;

use crate::error::{AdvisorError, Result};
use crate::table::ColumnKeywords;

/// Where price histories come from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MarketSource {
    #[default]
    Yahoo,
    Mock,
}

impl FromStr for MarketSource {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "mock" => Ok(Self::Mock),
            other => Err(AdvisorError::Config(format!("unknown market data source '{other}'"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AdvisorConfig {
    pub model: String,
    pub temperature: f32,
    pub documents_dir: PathBuf,
    pub market_source: MarketSource,
    pub market_timeout: Duration,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub keywords: ColumnKeywords,

    /// Embedding model for report search; `None` searches by terms only
    pub embedding_model: Option<String>,

    /// Chat sessions kept in memory before the least recently used is dropped
    pub session_capacity: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: 0.3,
            documents_dir: PathBuf::from("./documents"),
            market_source: MarketSource::default(),
            market_timeout: Duration::from_secs(15),
            cache_capacity: 32,
            cache_ttl: Duration::from_secs(3600),
            keywords: ColumnKeywords::default(),
            embedding_model: Some("nomic-embed-text".into()),
            session_capacity: 256,
        }
    }
}

/// Parsed variable, or `default` when unset
fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| AdvisorError::Config(format!("invalid value for {key}: '{value}'"))),
        _ => Ok(default),
    }
}

impl AdvisorConfig {
    /// Read `ADVISOR_*` and `MARKET_*` variables.
    ///
    /// `ADVISOR_COLUMN_KEYWORDS` takes a JSON object such as
    /// `{"weight": ["weight", "비중"]}`; missing lists keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let keywords = match std::env::var("ADVISOR_COLUMN_KEYWORDS") {
            Ok(json) if !json.trim().is_empty() => serde_json::from_str(&json).map_err(|e| {
                AdvisorError::Config(format!("invalid ADVISOR_COLUMN_KEYWORDS: {e}"))
            })?,
            _ => defaults.keywords,
        };

        let temperature: f32 = env_parse("ADVISOR_TEMPERATURE", defaults.temperature)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AdvisorError::Config(format!(
                "ADVISOR_TEMPERATURE must be within 0..=2, got {temperature}"
            )));
        }

        let embedding_model = match std::env::var("ADVISOR_EMBEDDING_MODEL") {
            Ok(model) => embedding_model(&model),
            Err(_) => defaults.embedding_model,
        };

        let session_capacity: usize =
            env_parse("ADVISOR_SESSION_CAPACITY", defaults.session_capacity)?;
        if session_capacity == 0 {
            return Err(AdvisorError::Config(
                "ADVISOR_SESSION_CAPACITY must be at least 1".into(),
            ));
        }

        Ok(Self {
            model: std::env::var("ADVISOR_MODEL").unwrap_or(defaults.model),
            temperature,
            documents_dir: std::env::var("ADVISOR_DOCUMENTS_DIR")
                .map_or(defaults.documents_dir, PathBuf::from),
            market_source: env_parse("MARKET_DATA_SOURCE", defaults.market_source)?,
            market_timeout: Duration::from_secs(env_parse(
                "MARKET_TIMEOUT_SECS",
                defaults.market_timeout.as_secs(),
            )?),
            cache_capacity: env_parse("MARKET_CACHE_CAPACITY", defaults.cache_capacity)?,
            cache_ttl: Duration::from_secs(env_parse(
                "MARKET_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            keywords,
            embedding_model,
            session_capacity,
        })
    }

    pub fn generation(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            ..GenerationOptions::default()
        }
    }
}

/// Blank or `none` disables embeddings
fn embedding_model(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && !value.eq_ignore_ascii_case("none")).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdvisorConfig::default();
        let generation = config.generation();

        assert_eq!(generation.model, "llama3.2");
        assert!((generation.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.cache_capacity, 32);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_embedding_model_can_be_disabled() {
        assert_eq!(AdvisorConfig::default().embedding_model.as_deref(), Some("nomic-embed-text"));
        assert_eq!(embedding_model(" mxbai-embed-large "), Some("mxbai-embed-large".into()));
        assert_eq!(embedding_model("None"), None);
        assert_eq!(embedding_model(""), None);
    }

    #[test]
    fn test_market_source_parse() {
        assert_eq!(" Mock ".parse::<MarketSource>().unwrap(), MarketSource::Mock);
        assert!("bloomberg".parse::<MarketSource>().is_err());
    }
}
