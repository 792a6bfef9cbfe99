//! Reasoning Loop
//!
//! ReAct-style loop: ask the model, run any tool it requests, feed the
//! result back, and stop at the first answer without a tool call.
//! The `Conversation` passed to `run` doubles as the agent's memory.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub system_prompt: String,

    /// Maximum reasoning iterations before giving up
    pub max_iterations: usize,

    pub generation: GenerationOptions,

    /// Append tool descriptions to the system prompt
    pub inject_tool_descriptions: bool,

    /// Deadline for a single provider call
    pub completion_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 6,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
            completion_timeout: Duration::from_secs(120),
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful AI assistant.

When you need to use a tool, respond with a JSON block in this exact format:
```tool
{"tool": "tool_name", "arguments": {"arg1": "value1"}}
```

After receiving tool results, synthesize them into a helpful response.
If you can answer directly without tools, do so."#;

const TOOL_FENCE: &str = "```tool";

pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Full system prompt including tool descriptions
    fn build_system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();

        if self.config.inject_tool_descriptions && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
        }

        prompt
    }

    /// Run the loop on a conversation whose last message is the user turn
    pub async fn run(&self, conversation: &mut Conversation) -> Result<String> {
        if !conversation.has_system_prompt() {
            conversation.set_system_prompt(self.build_system_prompt());
        }

        for iteration in 1..=self.config.max_iterations {
            conversation.truncate_to_fit();

            let completion = tokio::time::timeout(
                self.config.completion_timeout,
                self.provider
                    .complete(conversation.messages(), &self.config.generation),
            )
            .await
            .map_err(|_| AgentError::Timeout(self.config.completion_timeout.as_secs()))??;

            let content = completion.content;
            conversation.push(Message::assistant(&content));

            let Some(tool_call) = parse_tool_call(&content) else {
                return Ok(content);
            };

            tracing::debug!(tool = %tool_call.name, iteration, "Executing tool");
            let result = self.execute_tool(&tool_call).await;
            conversation.push(Message::tool(format_tool_result(&result), tool_call.id));
        }

        Err(AgentError::MaxIterations(self.config.max_iterations))
    }

    /// One-shot question with a fresh conversation
    pub async fn ask(&self, question: &str) -> Result<String> {
        let mut conversation = Conversation::with_system_prompt(self.build_system_prompt());
        conversation.push(Message::user(question));
        self.run(&mut conversation).await
    }

    /// Tool failures are reported to the model instead of aborting the loop
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        match self.tools.execute(call).await {
            Ok(mut result) => {
                result.id.clone_from(&call.id);
                result
            }
            Err(e) => {
                let mut result = ToolResult::failure(&call.name, format!("Error: {e}"));
                result.id.clone_from(&call.id);
                result
            }
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Parse a ```tool fenced block, falling back to an inline JSON object
/// carrying a "tool" key
fn parse_tool_call(content: &str) -> Option<ToolCall> {
    let fenced = content.find(TOOL_FENCE).and_then(|start| {
        let after = &content[start + TOOL_FENCE.len()..];
        let end = after.find("```")?;
        serde_json::from_str::<ToolCall>(after[..end].trim()).ok()
    });

    let mut call = fenced.or_else(|| parse_inline_tool_call(content))?;
    if call.id.is_none() {
        call.id = Some(uuid::Uuid::new_v4().to_string());
    }
    Some(call)
}

fn parse_inline_tool_call(content: &str) -> Option<ToolCall> {
    if !content.contains(r#""tool""#) {
        return None;
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }

    serde_json::from_str::<ToolCall>(&content[start..=end]).ok()
}

fn format_tool_result(result: &ToolResult) -> String {
    if result.success {
        format!("[Tool '{}' returned]\n{}", result.name, result.output)
    } else {
        format!("[Tool '{}' failed]\n{}", result.name, result.output)
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Option<Arc<ToolRegistry>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: None,
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.config.generation = options;
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn completion_timeout(mut self, timeout: Duration) -> Self {
        self.config.completion_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        Ok(Agent::new(
            provider,
            self.tools.unwrap_or_default(),
            self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::provider::{Completion, ModelInfo, ProviderInfo};
    use crate::tool::{ParameterSchema, Tool, ToolSchema};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned answers in order
    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Self {
            let mut replies: Vec<String> = replies.iter().map(|r| (*r).to_string()).collect();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn info(&self) -> Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "scripted".into(),
                models: Vec::new(),
                supports_tools: false,
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, _: &[Message], _: &GenerationOptions) -> Result<Completion> {
            let reply = self.replies.lock().unwrap().pop().unwrap_or_default();
            Ok(Completion::text(reply, "scripted"))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "upper".into(),
                description: "Uppercase text".into(),
                parameters: vec![ParameterSchema::required("text", "string", "Input")],
                category: None,
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            let text = call.str_arg("text").unwrap_or_default().to_uppercase();
            Ok(ToolResult::success("upper", text))
        }
    }

    fn agent_with(replies: &[&str]) -> Agent {
        let mut tools = ToolRegistry::new();
        tools.register(UpperTool);
        AgentBuilder::new()
            .provider(Arc::new(ScriptedProvider::new(replies)))
            .tools(Arc::new(tools))
            .max_iterations(3)
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_fenced_tool_call() {
        let content = "Let me check.\n```tool\n{\"tool\": \"upper\", \"arguments\": {\"text\": \"aapl\"}}\n```";
        let call = parse_tool_call(content).unwrap();
        assert_eq!(call.name, "upper");
        assert!(call.id.is_some());
    }

    #[test]
    fn test_plain_answer_is_not_a_tool_call() {
        assert!(parse_tool_call("| Name | Weight |\n|---|---|\n| A | 50% |").is_none());
    }

    #[tokio::test]
    async fn test_run_executes_tool_then_answers() {
        let agent = agent_with(&[
            "```tool\n{\"tool\": \"upper\", \"arguments\": {\"text\": \"aapl\"}}\n```",
            "The ticker is AAPL.",
        ]);

        let mut conversation = Conversation::new();
        conversation.push(Message::user("normalize aapl"));
        let answer = agent.run(&mut conversation).await.unwrap();

        assert_eq!(answer, "The ticker is AAPL.");
        let tool_msg = conversation
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(tool_msg.content.contains("AAPL"));
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let call = "```tool\n{\"tool\": \"upper\", \"arguments\": {\"text\": \"x\"}}\n```";
        let agent = agent_with(&[call, call, call, call]);

        let err = agent.ask("loop forever").await.unwrap_err();
        assert!(matches!(err, AgentError::MaxIterations(3)));
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(
            AgentBuilder::new().build(),
            Err(AgentError::Config(_))
        ));
    }
}
