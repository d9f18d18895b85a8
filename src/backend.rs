//! Generation backend adapter.
//!
//! Two modes, chosen once by configuration. Dry mode synthesizes a
//! deterministic placeholder without touching the network, so the whole
//! pipeline stays runnable offline. Live mode sends the stage payload to a
//! chat-completions endpoint over a bounded synchronous call; any transport
//! failure, timeout, or malformed response aborts the run with no retries.
use crate::config::PipelineConfig;
use crate::stage::StageId;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Instant;

const SYSTEM_PROMPT: &str =
    "Ты формируешь текст stage-вывода строго по входному prompt и контексту.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Dry,
    Live,
}

/// Connection settings for the generation backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub mode: BackendMode,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: std::time::Duration,
}

/// Fixed constraints forwarded with every live request.
#[derive(Debug, Serialize)]
struct Constraints {
    evia_cost_45_days: String,
    missing_marker: String,
    no_external_data: bool,
}

#[derive(Serialize)]
struct StagePayload<'a> {
    stage: &'a str,
    prompt: &'a str,
    context: &'a Map<String, Value>,
    constraints: &'a Constraints,
}

pub struct GenerationBackend {
    config: BackendConfig,
    constraints: Constraints,
}

impl GenerationBackend {
    pub fn new(cfg: &PipelineConfig) -> Self {
        Self {
            config: cfg.backend.clone(),
            constraints: Constraints {
                evia_cost_45_days: cfg.cost_45_days.clone(),
                missing_marker: cfg.missing_marker.clone(),
                no_external_data: true,
            },
        }
    }

    pub fn is_dry(&self) -> bool {
        self.config.mode == BackendMode::Dry
    }

    /// Produce the generated text for one stage.
    pub fn generate(
        &self,
        stage: StageId,
        prompt_text: &str,
        context: &Map<String, Value>,
    ) -> Result<String> {
        match self.config.mode {
            BackendMode::Dry => Ok(self.dry_reply(stage, context)),
            BackendMode::Live => self.live_reply(stage, prompt_text, context),
        }
    }

    fn dry_reply(&self, stage: StageId, context: &Map<String, Value>) -> String {
        let mut keys: Vec<&str> = context.keys().map(String::as_str).collect();
        keys.sort_unstable();
        format!(
            "[DRY_RUN] Stage {stage}\n\
             Краткий результат без внешнего LLM.\n\
             Контекст содержит поля: {}.",
            keys.join(", ")
        )
    }

    fn live_reply(
        &self,
        stage: StageId,
        prompt_text: &str,
        context: &Map<String, Value>,
    ) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is required when DRY_RUN=false"))?;

        let payload = StagePayload {
            stage: stage.as_str(),
            prompt: prompt_text,
            context,
            constraints: &self.constraints,
        };
        let user_content =
            serde_json::to_string(&payload).context("serialize stage payload")?;
        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_content},
            ],
        });

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.config.timeout))
            .build()
            .into();

        let start = Instant::now();
        let mut response = agent
            .post(self.config.endpoint.as_str())
            .header("Authorization", &format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .send_json(&body)
            .with_context(|| format!("call generation backend for stage {stage}"))?;
        let reply: Value = response
            .body_mut()
            .read_json()
            .context("parse generation backend response")?;
        let elapsed_ms = start.elapsed().as_millis();

        tracing::info!(
            elapsed_ms,
            stage = stage.as_str(),
            model = %self.config.model,
            "llm call complete"
        );

        let text = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                anyhow!("generation backend response missing choices[0].message.content")
            })?;
        Ok(text.trim().to_string())
    }
}
