//! Stage identity, stage records, and the generic single-stage executor.
//!
//! The pipeline runs a fixed, totally ordered set of ten stages. Each executed
//! stage yields exactly one immutable record: a rendered markdown document plus
//! the structured metadata that the next stage sees as context.
use crate::backend::GenerationBackend;
use crate::prompts::PromptStore;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fmt;

/// One step of the fixed generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageId {
    S0,
    S1,
    S2,
    S3,
    S3x5,
    S3x6,
    S3x7,
    S4,
    S5,
    S6,
}

impl StageId {
    /// Execution order; significant and total.
    pub const ORDER: [StageId; 10] = [
        StageId::S0,
        StageId::S1,
        StageId::S2,
        StageId::S3,
        StageId::S3x5,
        StageId::S3x6,
        StageId::S3x7,
        StageId::S4,
        StageId::S5,
        StageId::S6,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageId::S0 => "0",
            StageId::S1 => "1",
            StageId::S2 => "2",
            StageId::S3 => "3",
            StageId::S3x5 => "3.5",
            StageId::S3x6 => "3.6",
            StageId::S3x7 => "3.7",
            StageId::S4 => "4",
            StageId::S5 => "5",
            StageId::S6 => "6",
        }
    }

    /// Filesystem-safe form: the dot in sub-stage tokens becomes an underscore.
    pub fn file_tag(self) -> &'static str {
        match self {
            StageId::S3x5 => "3_5",
            StageId::S3x6 => "3_6",
            StageId::S3x7 => "3_7",
            other => other.as_str(),
        }
    }

    /// Instruction file addressed by this stage in the prompt store.
    pub fn prompt_file(self) -> String {
        format!("prompt_{}.md", self.file_tag())
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable output of executing one stage.
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub stage: StageId,
    pub markdown: String,
    pub data: Map<String, Value>,
}

/// Render the stage document: instruction source, generated output, and the
/// structured metadata, as three labeled sections.
pub fn render_markdown(
    stage: StageId,
    prompt_text: &str,
    output: &str,
    data: &Map<String, Value>,
) -> Result<String> {
    let metadata = serde_json::to_string_pretty(data).context("serialize stage metadata")?;
    Ok(format!(
        "# S{stage}\n\n\
         ## Prompt source\n\n\
         ```md\n{prompt_text}\n```\n\n\
         ## LLM output\n\n\
         {output}\n\n\
         ## Metadata\n\n\
         ```json\n{metadata}\n```\n"
    ))
}

/// Run one stage: load its instructions, invoke the backend, assemble the
/// metadata (`stage`, the stage-specific extras, then the generated text),
/// and render the document. Persistence happens later, in the sink.
pub fn execute(
    stage: StageId,
    prompts: &PromptStore,
    backend: &GenerationBackend,
    context: &Map<String, Value>,
    extras: Map<String, Value>,
) -> Result<StageRecord> {
    let prompt_text = prompts.load(stage)?;
    let output = backend.generate(stage, &prompt_text, context)?;

    let mut data = Map::new();
    data.insert("stage".to_string(), Value::String(stage.as_str().to_string()));
    data.extend(extras);
    data.insert("llm_output".to_string(), Value::String(output.clone()));

    let markdown = render_markdown(stage, &prompt_text, &output, &data)?;
    Ok(StageRecord {
        stage,
        markdown,
        data,
    })
}
