//! Portfolio Advisor
//!
//! Ties the recommendation pipeline, market data, report search and the
//! tool-using agent together. Each chat turn runs against the session's
//! conversation buffer, so follow-up questions see earlier answers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use agent_core::{
    Agent, AgentConfig, AgentError, GenerationOptions, LlmProvider, MemorySessionStore, Message,
    SessionId, SessionStore, ToolRegistry,
};

use crate::ADVISOR_PROMPT;
use crate::charts::{ChartAdapter, SimulationParams};
use crate::config::{AdvisorConfig, MarketSource};
use crate::documents::{DocumentStore, ReportAnswer, TextSplitter};
use crate::error::{AdvisorError, Result};
use crate::market::{
    CachedMarketData, MarketDataCache, MarketDataClient, MockMarketDataClient, Period,
    StockReport, SystemClock, YahooChartClient,
};
use crate::presets::{Preset, preset};
use crate::recommend::{Recommendation, Recommender};
use crate::survey::InvestorSurvey;
use crate::svckit::{PortfolioAnalysisTool, ReportSearchTool, StockChartTool};
use crate::table::TableNormalizer;

#[derive(Clone, Debug, Serialize)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub answer: String,

    /// Messages in the session after this turn
    pub message_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct PresetRun {
    pub preset: Preset,

    /// Chart data for the ticker the preset names, when it could be fetched
    pub stock_report: Option<StockReport>,

    pub reply: ChatReply,
}

/// Listing entry for a stored chat session
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub title: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

pub struct PortfolioAdvisor {
    provider: Arc<dyn LlmProvider>,
    generation: GenerationOptions,
    recommender: Arc<Recommender>,
    market: Arc<dyn MarketDataClient>,
    documents: Arc<DocumentStore>,
    sessions: Arc<dyn SessionStore>,
    surveys: RwLock<HashMap<SessionId, InvestorSurvey>>,
    survey_capacity: usize,
    agent_config: AgentConfig,
}

fn poisoned<T>(_: T) -> AdvisorError {
    AdvisorError::Agent(AgentError::Session("survey store lock poisoned".into()))
}

impl PortfolioAdvisor {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        market: Arc<dyn MarketDataClient>,
        documents: Arc<DocumentStore>,
        sessions: Arc<dyn SessionStore>,
        config: &AdvisorConfig,
    ) -> Self {
        let generation = config.generation();
        let recommender = Recommender::new(
            provider.clone(),
            generation.clone(),
            TableNormalizer::new(config.keywords.clone()),
            ChartAdapter::new(config.keywords.clone(), SimulationParams::default()),
        );

        let agent_config = AgentConfig {
            system_prompt: ADVISOR_PROMPT.into(),
            generation: generation.clone(),
            ..AgentConfig::default()
        };

        Self {
            provider,
            generation,
            recommender: Arc::new(recommender),
            market,
            documents,
            sessions,
            surveys: RwLock::new(HashMap::new()),
            survey_capacity: config.session_capacity.max(1),
            agent_config,
        }
    }

    /// Build the market client, cache and document store from configuration
    pub async fn from_config(provider: Arc<dyn LlmProvider>, config: &AdvisorConfig) -> Result<Self> {
        let source: Arc<dyn MarketDataClient> = match config.market_source {
            MarketSource::Yahoo => Arc::new(YahooChartClient::new(config.market_timeout)?),
            MarketSource::Mock => Arc::new(MockMarketDataClient::new()),
        };
        let cache = MarketDataCache::new(
            config.cache_capacity,
            config.cache_ttl,
            Arc::new(SystemClock::default()),
        );
        let market = Arc::new(CachedMarketData::new(source, cache));

        let mut documents =
            DocumentStore::load_dir(&config.documents_dir, &TextSplitter::default()).await?;
        if let Some(model) = &config.embedding_model {
            if let Err(e) = documents.embed(provider.as_ref(), model).await {
                tracing::warn!(model, error = %e, "Document embedding unavailable; using term search");
            }
        }

        tracing::info!(
            source = market.name(),
            documents = documents.document_count(),
            chunks = documents.chunk_count(),
            retrieval = documents.embedding_model().unwrap_or("terms"),
            model = %config.model,
            "Portfolio advisor ready"
        );

        Ok(Self::new(
            provider,
            market,
            Arc::new(documents),
            Arc::new(MemorySessionStore::with_capacity(config.session_capacity)),
            config,
        ))
    }

    /// Survey → recommendation with chart datasets
    pub async fn recommend(&self, survey: &InvestorSurvey) -> Result<Recommendation> {
        let recommendation = self.recommender.recommend(survey).await?;
        if let Some(failure) = &recommendation.failure {
            tracing::warn!(%failure, "Recommendation has no chartable table");
        }
        Ok(recommendation)
    }

    pub async fn stock_report(&self, ticker: &str, period: Period) -> Result<StockReport> {
        let history = self.market.history(ticker, period).await?;
        StockReport::from_history(&history)
    }

    pub async fn search_reports(&self, query: &str) -> Result<ReportAnswer> {
        self.documents
            .search(query, self.provider.as_ref(), &self.generation)
            .await
    }

    /// One agent turn in the given session, or a new session when `None`.
    ///
    /// A survey passed here is remembered for the session and used by the
    /// `portfolio_analysis` tool on later turns.
    pub async fn chat(
        &self,
        session_id: Option<SessionId>,
        message: &str,
        survey: Option<InvestorSurvey>,
    ) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AdvisorError::EmptyMessage);
        }

        let id = session_id.unwrap_or_default();
        let survey = match survey {
            Some(survey) => {
                survey.validate()?;
                self.remember_survey(&id, survey.clone())?;
                survey
            }
            None => self
                .surveys
                .read()
                .map_err(poisoned)?
                .get(&id)
                .cloned()
                .unwrap_or_default(),
        };

        let agent = Agent::new(
            self.provider.clone(),
            Arc::new(self.tool_registry(survey)),
            self.agent_config.clone(),
        );

        let mut session = self.sessions.load_or_create(&id)?;
        session.conversation.push(Message::user(message));
        let answer = agent.run(&mut session.conversation).await?;
        session.touch();
        self.sessions.save(&session)?;

        tracing::debug!(session = %id, messages = session.message_count(), "Chat turn complete");

        Ok(ChatReply {
            session_id: id,
            answer,
            message_count: session.message_count(),
        })
    }

    /// Stored sessions, most recently updated first
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        Ok(self
            .sessions
            .list(limit)?
            .into_iter()
            .map(|session| SessionSummary {
                title: session.title(),
                message_count: session.message_count(),
                updated_at: session.updated_at,
                session_id: session.id,
            })
            .collect())
    }

    /// Forget a session's conversation and remembered survey
    pub fn end_session(&self, id: &SessionId) -> Result<()> {
        let had_survey = self.surveys.write().map_err(poisoned)?.remove(id).is_some();
        if !self.sessions.contains(id)? {
            return if had_survey {
                Ok(())
            } else {
                Err(AdvisorError::UnknownSession(id.to_string()))
            };
        }

        self.sessions.delete(id)?;
        tracing::debug!(session = %id, "Session ended");
        Ok(())
    }

    /// When the map is full, surveys whose session the store has dropped
    /// are pruned before inserting.
    fn remember_survey(&self, id: &SessionId, survey: InvestorSurvey) -> Result<()> {
        let mut surveys = self.surveys.write().map_err(poisoned)?;

        if !surveys.contains_key(id) && surveys.len() >= self.survey_capacity {
            let mut stale = Vec::new();
            for key in surveys.keys() {
                if !self.sessions.contains(key)? {
                    stale.push(key.clone());
                }
            }
            for key in &stale {
                surveys.remove(key);
            }
            tracing::debug!(dropped = stale.len(), "Pruned surveys of expired sessions");
        }

        surveys.insert(id.clone(), survey);
        Ok(())
    }

    /// Run a preset prompt; a preset naming a ticker also gets its chart
    pub async fn run_preset(&self, index: usize, session_id: Option<SessionId>) -> Result<PresetRun> {
        let preset = *preset(index).ok_or(AdvisorError::UnknownPreset(index))?;

        let stock_report = match preset.ticker_hint() {
            Some(ticker) => match self.stock_report(ticker, Period::default()).await {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::warn!(ticker, error = %e, "Preset chart unavailable");
                    None
                }
            },
            None => None,
        };

        let reply = self.chat(session_id, preset.prompt, None).await?;

        Ok(PresetRun {
            preset,
            stock_report,
            reply,
        })
    }

    /// Tools for one agent turn; report search only when documents exist
    pub(crate) fn tool_registry(&self, survey: InvestorSurvey) -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(PortfolioAnalysisTool::new(self.recommender.clone(), survey));
        tools.register(StockChartTool::new(self.market.clone()));

        if !self.documents.is_empty() {
            tools.register(ReportSearchTool::new(
                self.documents.clone(),
                self.provider.clone(),
                self.generation.clone(),
            ));
        }

        tools
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MockMarketDataClient;
    use agent_core::{Completion, ModelInfo, ProviderInfo};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned answers and records how many messages each call saw
    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
        seen: Mutex<Vec<usize>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Self {
            let mut replies: Vec<String> = replies.iter().map(|r| (*r).to_string()).collect();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn info(&self) -> agent_core::Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "scripted".into(),
                models: vec![],
                supports_tools: false,
            })
        }

        async fn health_check(&self) -> agent_core::Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            messages: &[Message],
            _: &GenerationOptions,
        ) -> agent_core::Result<Completion> {
            self.seen.lock().unwrap().push(messages.len());
            let reply = self.replies.lock().unwrap().pop().unwrap_or_default();
            Ok(Completion::text(reply, "scripted"))
        }

        async fn list_models(&self) -> agent_core::Result<Vec<ModelInfo>> {
            Ok(vec![])
        }
    }

    fn advisor(provider: Arc<ScriptedProvider>, documents: DocumentStore) -> PortfolioAdvisor {
        PortfolioAdvisor::new(
            provider,
            Arc::new(MockMarketDataClient::new()),
            Arc::new(documents),
            Arc::new(MemorySessionStore::new()),
            &AdvisorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_chat_keeps_session_memory() {
        let provider = Arc::new(ScriptedProvider::new(&["First answer.", "Second answer."]));
        let advisor = advisor(provider.clone(), DocumentStore::empty());

        let first = advisor.chat(None, "What is an ETF?", None).await.unwrap();
        let second = advisor
            .chat(Some(first.session_id.clone()), "And a bond?", None)
            .await
            .unwrap();

        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.answer, "Second answer.");
        // system + user + assistant, then + user + assistant
        assert_eq!(first.message_count, 3);
        assert_eq!(second.message_count, 5);
        assert_eq!(*provider.seen.lock().unwrap(), [2, 4]);
    }

    #[tokio::test]
    async fn test_chat_runs_stock_chart_tool() {
        let provider = Arc::new(ScriptedProvider::new(&[
            "```tool\n{\"tool\": \"stock_chart\", \"arguments\": {\"ticker\": \"MSFT\"}}\n```",
            "Microsoft looks steady.",
        ]));
        let advisor = advisor(provider, DocumentStore::empty());

        let reply = advisor.chat(None, "How is MSFT doing?", None).await.unwrap();
        assert_eq!(reply.answer, "Microsoft looks steady.");

        let session = advisor
            .sessions()
            .load(&reply.session_id)
            .unwrap()
            .unwrap();
        let tool_output = &session.conversation.messages()[3].content;
        assert!(tool_output.starts_with("[Tool 'stock_chart' returned]"));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let advisor = advisor(Arc::new(ScriptedProvider::new(&[])), DocumentStore::empty());
        let result = advisor.chat(None, "   ", None).await;
        assert!(matches!(result, Err(AdvisorError::EmptyMessage)));
    }

    #[tokio::test]
    async fn test_preset_with_ticker_fetches_chart() {
        let provider = Arc::new(ScriptedProvider::new(&["Apple analysis.", "Allocation."]));
        let advisor = advisor(provider, DocumentStore::empty());

        let apple = advisor.run_preset(6, None).await.unwrap();
        assert_eq!(apple.stock_report.unwrap().ticker, "AAPL");
        assert_eq!(apple.reply.answer, "Apple analysis.");

        let allocation = advisor.run_preset(0, None).await.unwrap();
        assert!(allocation.stock_report.is_none());

        let missing = advisor.run_preset(42, None).await;
        assert!(matches!(missing, Err(AdvisorError::UnknownPreset(42))));
    }

    #[tokio::test]
    async fn test_report_search_registered_only_with_documents() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let bare = advisor(provider.clone(), DocumentStore::empty());
        assert_eq!(bare.tool_registry(InvestorSurvey::default()).len(), 2);

        let documents = DocumentStore::from_texts(
            [("outlook.md", "Semiconductor demand recovers in 2025.")],
            &TextSplitter::default(),
        );
        let with_docs = advisor(provider, documents);
        let registry = with_docs.tool_registry(InvestorSurvey::default());
        assert!(registry.get("market_report_search").is_some());
    }

    fn fixed_survey() -> InvestorSurvey {
        InvestorSurvey {
            amount: 500,
            ..InvestorSurvey::default()
        }
    }

    #[tokio::test]
    async fn test_end_session_forgets_conversation_and_survey() {
        let provider = Arc::new(ScriptedProvider::new(&["Noted.", "Fresh start."]));
        let advisor = advisor(provider.clone(), DocumentStore::empty());

        let reply = advisor
            .chat(None, "Plan for me", Some(fixed_survey()))
            .await
            .unwrap();
        let listed = advisor.list_sessions(10).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Plan for me");
        assert_eq!(listed[0].message_count, 3);

        advisor.end_session(&reply.session_id).unwrap();
        assert!(advisor.list_sessions(10).unwrap().is_empty());
        assert!(advisor.surveys.read().unwrap().is_empty());

        let again = advisor.end_session(&reply.session_id);
        assert!(matches!(again, Err(AdvisorError::UnknownSession(_))));

        // The same id starts over with an empty buffer
        let restarted = advisor
            .chat(Some(reply.session_id.clone()), "Hello", None)
            .await
            .unwrap();
        assert_eq!(restarted.message_count, 3);
    }

    #[tokio::test]
    async fn test_surveys_of_dropped_sessions_are_pruned() {
        let provider = Arc::new(ScriptedProvider::new(&["a", "b", "c", "d"]));
        let config = AdvisorConfig {
            session_capacity: 2,
            ..AdvisorConfig::default()
        };
        let advisor = PortfolioAdvisor::new(
            provider,
            Arc::new(MockMarketDataClient::new()),
            Arc::new(DocumentStore::empty()),
            Arc::new(MemorySessionStore::with_capacity(2)),
            &config,
        );

        for name in ["one", "two", "three"] {
            advisor
                .chat(Some(SessionId::from_string(name)), "Hi", Some(fixed_survey()))
                .await
                .unwrap();
        }

        // "one" left the session store when "three" was saved
        assert!(!advisor.sessions().contains(&SessionId::from_string("one")).unwrap());
        assert!(advisor.surveys.read().unwrap().len() <= 3);

        advisor
            .chat(Some(SessionId::from_string("four")), "Hi", Some(fixed_survey()))
            .await
            .unwrap();
        let surveys = advisor.surveys.read().unwrap();
        assert!(!surveys.contains_key(&SessionId::from_string("one")));
        assert!(surveys.contains_key(&SessionId::from_string("four")));
    }

    #[tokio::test]
    async fn test_search_reports_lists_sources_once() {
        let provider = Arc::new(ScriptedProvider::new(&["Demand is recovering."]));
        let documents = DocumentStore::from_texts(
            [
                ("chips.md", "Semiconductor demand recovers.\n\nSemiconductor prices rise."),
                ("food.md", "Grain prices fall."),
            ],
            &TextSplitter::new(40, 0),
        );
        let advisor = advisor(provider, documents);

        let answer = advisor.search_reports("semiconductor demand").await.unwrap();
        assert_eq!(answer.answer, "Demand is recovering.");
        assert_eq!(answer.sources, ["chips.md"]);
    }
}
