//! Process-wide pipeline configuration.
//!
//! Everything a run needs to know up front lives in one immutable value that
//! is constructed once and passed by reference, so tests can substitute
//! alternate configurations without touching globals.
use crate::backend::{BackendConfig, BackendMode};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Cost quoted for the 45-day engagement. The decision engine compares the
/// configured cost against this literal.
pub const EXPECTED_COST: &str = "150 000 ₽";

/// Reserved string standing in for any missing, null, or blank input leaf.
pub const MISSING: &str = "MISSING/НЕ ПРЕДОСТАВЛЕНО";

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const BACKEND_TIMEOUT: Duration = Duration::from_secs(60);

/// Immutable configuration for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cost_45_days: String,
    pub missing_marker: String,
    pub prompts_dir: PathBuf,
    pub backend: BackendConfig,
}

impl PipelineConfig {
    /// Resolve configuration from CLI flags and the environment.
    ///
    /// Precedence follows explicit flag > environment variable > default.
    /// Dry mode holds only while `DRY_RUN` is unset or exactly `true`
    /// (case-insensitive); any other value selects the live backend.
    pub fn resolve(prompts_dir: PathBuf, live: bool, model: Option<&str>) -> Self {
        let env_live = env::var("DRY_RUN")
            .map(|value| value.to_lowercase() != "true")
            .unwrap_or(false);
        let mode = if live || env_live {
            BackendMode::Live
        } else {
            BackendMode::Dry
        };

        let model = model
            .map(str::to_string)
            .or_else(|| env::var("OPENAI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            cost_45_days: EXPECTED_COST.to_string(),
            missing_marker: MISSING.to_string(),
            prompts_dir,
            backend: BackendConfig {
                mode,
                api_key: env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty()),
                model,
                endpoint: DEFAULT_ENDPOINT.to_string(),
                timeout: BACKEND_TIMEOUT,
            },
        }
    }

    /// Configuration used by unit tests: dry backend, prompts in `prompts_dir`.
    #[cfg(test)]
    pub fn for_tests(prompts_dir: PathBuf) -> Self {
        Self {
            cost_45_days: EXPECTED_COST.to_string(),
            missing_marker: MISSING.to_string(),
            prompts_dir,
            backend: BackendConfig {
                mode: BackendMode::Dry,
                api_key: None,
                model: DEFAULT_MODEL.to_string(),
                endpoint: DEFAULT_ENDPOINT.to_string(),
                timeout: BACKEND_TIMEOUT,
            },
        }
    }
}
