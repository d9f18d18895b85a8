//! Instruction store for per-stage prompt blobs.
//!
//! Prompts are plain markdown files addressed by stage identifier. A missing
//! file is fatal: the pipeline refuses to run a stage it has no instructions
//! for. Contents are read-only, process-wide configuration.
use crate::stage::StageId;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PromptStore {
    root: PathBuf,
}

impl PromptStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Load the instruction text for one stage.
    pub fn load(&self, stage: StageId) -> Result<String> {
        let path = self.root.join(stage.prompt_file());
        fs::read_to_string(&path)
            .with_context(|| format!("read stage {stage} instructions at {}", path.display()))
    }
}
