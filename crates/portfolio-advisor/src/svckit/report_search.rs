//! Market Report Search Tool
//!
//! Answers questions from the locally stored market reports.

use async_trait::async_trait;
use std::sync::Arc;

use agent_core::{
    GenerationOptions, LlmProvider, ParameterSchema, Result as CoreResult, Tool, ToolCall,
    ToolResult, ToolSchema,
};

use crate::documents::DocumentStore;

pub struct ReportSearchTool {
    documents: Arc<DocumentStore>,
    provider: Arc<dyn LlmProvider>,
    generation: GenerationOptions,
}

impl ReportSearchTool {
    pub fn new(
        documents: Arc<DocumentStore>,
        provider: Arc<dyn LlmProvider>,
        generation: GenerationOptions,
    ) -> Self {
        Self {
            documents,
            provider,
            generation,
        }
    }
}

#[async_trait]
impl Tool for ReportSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "market_report_search".into(),
            description: "Search the uploaded market analysis documents and answer from them.".into(),
            parameters: vec![ParameterSchema::required(
                "query",
                "string",
                "Question to answer from the market reports",
            )],
            category: Some("research".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let Some(query) = call.str_arg("query") else {
            return Ok(ToolResult::failure("market_report_search", "Missing query"));
        };

        match self
            .documents
            .search(query, self.provider.as_ref(), &self.generation)
            .await
        {
            Ok(result) => Ok(ToolResult::success("market_report_search", result.answer)
                .with_data(serde_json::json!({ "sources": result.sources }))),
            Err(e) => Ok(ToolResult::failure("market_report_search", e.user_message())),
        }
    }
}
