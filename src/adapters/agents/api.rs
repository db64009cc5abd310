//! Agent runner backed by an OpenAI-compatible chat-completions API.
//!
//! One HTTP client serves all three roles; each role carries its own model,
//! temperature and token budget from configuration. Responses are expected
//! to contain a JSON object, optionally inside a fenced code block. A quality
//! gate response that cannot be parsed degrades to a failing fallback report
//! instead of erroring, so a flaky gate never merges garbage by accident.

use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::error::AgentError;
use crate::domain::models::{
    AgentModelConfig, AgentResponse, AgentUsage, DeveloperPatch, KeeperPlan, LoopContext,
    QaReport, TaskSpec,
};
use crate::domain::ports::AgentRunner;

/// Price per 1K tokens as (input, output), keyed by model name prefix.
const COST_PER_1K_TOKENS: &[(&str, f64, f64)] = &[
    ("gpt-3.5-turbo", 0.0005, 0.0015),
    ("gpt-4-turbo", 0.01, 0.03),
    ("gpt-4", 0.03, 0.06),
    ("claude-3-haiku", 0.000_25, 0.001_25),
    ("claude-3-sonnet", 0.003, 0.015),
    ("deepseek-chat", 0.000_14, 0.000_28),
    ("deepseek-coder", 0.000_14, 0.000_28),
];

/// Estimate the cost of one call. Unknown models cost zero rather than
/// failing the call; the budget guard still sees token counts in the logs.
fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    COST_PER_1K_TOKENS
        .iter()
        .find(|(prefix, _, _)| model.starts_with(prefix))
        .map_or(0.0, |(_, input, output)| {
            (input_tokens as f64 / 1000.0) * input + (output_tokens as f64 / 1000.0) * output
        })
}

/// Extract the first JSON object from an agent reply.
///
/// Accepts a fenced ```json block, a bare fence, or a naked object; returns
/// the slice between the outermost braces.
fn extract_json(text: &str) -> Option<&str> {
    let body = text
        .split_once("```json")
        .or_else(|| text.split_once("```"))
        .map_or(text, |(_, rest)| rest.split("```").next().unwrap_or(rest));

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&body[start..=end])
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

/// One agent role with its resolved credentials.
#[derive(Debug, Clone)]
struct Role {
    config: AgentModelConfig,
    api_key: String,
}

impl Role {
    fn resolve(config: &AgentModelConfig) -> Result<Self, AgentError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| AgentError::MissingApiKey(config.api_key_env.clone()))?;
        Ok(Self {
            config: config.clone(),
            api_key,
        })
    }
}

/// [`AgentRunner`] speaking the OpenAI chat-completions wire format.
pub struct ChatAgentRunner {
    client: Client,
    keeper: Role,
    developer: Role,
    qa: Role,
}

impl ChatAgentRunner {
    /// Build the runner, resolving API keys from the environment up front so
    /// a missing key fails at startup, not mid-run.
    pub fn new(
        keeper: &AgentModelConfig,
        developer: &AgentModelConfig,
        qa: &AgentModelConfig,
    ) -> Result<Self, AgentError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AgentError::Api(e.to_string()))?;
        Ok(Self {
            client,
            keeper: Role::resolve(keeper)?,
            developer: Role::resolve(developer)?,
            qa: Role::resolve(qa)?,
        })
    }

    /// One chat-completions call with exponential-backoff retry on transient
    /// failures. Returns the raw reply text and its usage accounting.
    async fn call_chat(
        &self,
        role: &Role,
        temperature: f64,
        prompt: String,
    ) -> Result<(String, AgentUsage), AgentError> {
        let request = ChatRequest {
            model: role.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens: role.config.max_tokens,
        };
        let url = format!("{}/chat/completions", role.config.base_url);
        let timeout = Duration::from_secs(role.config.timeout_secs);

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs(2))
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(Some(Duration::from_secs(60)))
            .build();

        let response: ChatResponse = backoff::future::retry(policy, || async {
            let result = self
                .client
                .post(&url)
                .bearer_auth(&role.api_key)
                .timeout(timeout)
                .json(&request)
                .send()
                .await;

            let response = match result {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    return Err(backoff::Error::permanent(AgentError::Timeout(
                        role.config.timeout_secs,
                    )));
                }
                Err(e) => {
                    warn!(error = %e, "agent request failed, retrying");
                    return Err(backoff::Error::transient(AgentError::Api(e.to_string())));
                }
            };

            let status = response.status();
            if status.is_server_error() || status.as_u16() == 429 {
                warn!(%status, "agent API transient failure, retrying");
                return Err(backoff::Error::transient(AgentError::Api(format!(
                    "status {status}"
                ))));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(AgentError::Api(format!(
                    "status {status}: {body}"
                ))));
            }

            response
                .json::<ChatResponse>()
                .await
                .map_err(|e| backoff::Error::permanent(AgentError::Api(e.to_string())))
        })
        .await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AgentError::MalformedResponse("empty choices".to_string()))?;

        let usage = AgentUsage {
            input_tokens: response.usage.prompt_tokens,
            output_tokens: response.usage.completion_tokens,
            cost_usd: estimate_cost(
                &role.config.model,
                response.usage.prompt_tokens,
                response.usage.completion_tokens,
            ),
        };
        info!(
            model = %role.config.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            cost_usd = usage.cost_usd,
            "agent call completed"
        );

        Ok((text, usage))
    }
}

fn parse_output<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, AgentError> {
    let json = extract_json(text)
        .ok_or_else(|| AgentError::MalformedResponse("no JSON object in reply".to_string()))?;
    serde_json::from_str(json).map_err(|e| AgentError::MalformedResponse(e.to_string()))
}

#[async_trait]
impl AgentRunner for ChatAgentRunner {
    async fn plan(&self, ctx: &LoopContext) -> Result<AgentResponse<KeeperPlan>, AgentError> {
        let completed = if ctx.completed_tasks.is_empty() {
            "none yet".to_string()
        } else {
            ctx.completed_tasks.join("\n- ")
        };
        let prompt = format!(
            "You are the project planner for an iterative build loop.\n\n\
             Project goal:\n{}\n\n\
             Current iteration: {}\n\n\
             Completed tasks:\n- {}\n\n\
             Break the remaining work into 3-5 concrete tasks, ordered by \
             execution priority. Reply with a JSON object:\n\
             {{\"tasks\": [{{\"id\": \"TASK-001\", \"title\": \"...\", \
             \"description\": \"...\", \"priority\": 8, \
             \"estimated_complexity\": \"low|medium|high\", \
             \"dependencies\": [], \"acceptance_criteria\": [\"...\"]}}]}}\n\
             If the goal is fully achieved, reply with {{\"tasks\": []}}.",
            ctx.setpoint, ctx.iteration, completed
        );

        let (text, usage) = self
            .call_chat(&self.keeper, self.keeper.config.temperature, prompt)
            .await?;
        let output: KeeperPlan = parse_output(&text)?;
        debug!(tasks = output.tasks.len(), "plan parsed");
        Ok(AgentResponse { output, usage })
    }

    async fn implement(
        &self,
        task: &TaskSpec,
        ctx: &LoopContext,
    ) -> Result<AgentResponse<DeveloperPatch>, AgentError> {
        let criteria = task.acceptance_criteria.join("\n- ");
        let prompt = format!(
            "You are the implementer in an iterative build loop.\n\n\
             Project goal:\n{}\n\n\
             Task: {}\n{}\n\n\
             Acceptance criteria:\n- {}\n\n\
             Produce complete file contents for every file you create or \
             modify under the project workspace. Reply with a JSON object:\n\
             {{\"summary\": \"...\", \"files\": [{{\"path\": \"relative/path\", \
             \"content\": \"full file contents\"}}], \
             \"files_modified\": [], \"files_created\": [], \"risks\": [], \
             \"implementation_notes\": \"...\", \"testing_suggestions\": []}}",
            ctx.setpoint, task.title, task.description, criteria
        );

        // Sampling temperature comes from the loop context: the strategy
        // controller adjusts it between iterations.
        let (text, usage) = self
            .call_chat(&self.developer, ctx.developer_temperature, prompt)
            .await?;
        let output: DeveloperPatch = parse_output(&text)?;
        debug!(files = output.files.len(), "patch parsed");
        Ok(AgentResponse { output, usage })
    }

    async fn review(
        &self,
        patch: &DeveloperPatch,
        ctx: &LoopContext,
    ) -> Result<AgentResponse<QaReport>, AgentError> {
        let changed: Vec<String> = patch
            .files
            .iter()
            .map(|f| format!("--- {}\n{}", f.path, f.content))
            .collect();
        let prompt = format!(
            "You are the quality gate in an iterative build loop.\n\n\
             Project goal:\n{}\n\n\
             Patch summary: {}\n\n\
             Changed files:\n{}\n\n\
             Review the patch for correctness, completeness and risk. Score \
             quality from 0 to 10. Reply with a JSON object:\n\
             {{\"verdict\": \"pass|fail\", \"quality_score\": 7.5, \
             \"issues\": [], \"test_cases\": [], \
             \"test_results\": {{\"total\": 0, \"passed\": 0, \"failed\": 0, \
             \"skipped\": 0}}, \"feedback\": \"...\"}}",
            ctx.setpoint,
            patch.summary,
            changed.join("\n\n")
        );

        let (text, usage) = self
            .call_chat(&self.qa, self.qa.config.temperature, prompt)
            .await?;
        let output = match parse_output::<QaReport>(&text) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "quality gate reply unparseable, using fallback");
                QaReport::fallback(format!("unparseable review: {e}"))
            }
        };
        Ok(AgentResponse { output, usage })
    }
}
