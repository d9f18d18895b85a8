//! Shared test infrastructure for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const STAGE_TAGS: [&str; 10] = ["0", "1", "2", "3", "3_5", "3_6", "3_7", "4", "5", "6"];

/// Workspace for one CLI invocation: prompts, runs root, and an intake file.
pub struct TestWorkspace {
    pub root: TempDir,
}

impl TestWorkspace {
    pub fn setup() -> Self {
        let root = TempDir::new().expect("create temp workspace");
        let prompts = root.path().join("prompts");
        fs::create_dir(&prompts).expect("create prompts dir");
        for tag in STAGE_TAGS {
            fs::write(
                prompts.join(format!("prompt_{tag}.md")),
                format!("Инструкции стадии {tag}\n"),
            )
            .expect("write prompt file");
        }
        Self { root }
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.root.path().join("prompts")
    }

    pub fn runs_root(&self) -> PathBuf {
        self.root.path().join("runs")
    }

    pub fn write_intake(&self, content: &str) -> PathBuf {
        let path = self.root.path().join("intake.json");
        fs::write(&path, content).expect("write intake file");
        path
    }
}

/// Parse `run_id` and `archive` out of the CLI's stdout.
pub fn parse_run_output(stdout: &str) -> (String, PathBuf) {
    let mut run_id = None;
    let mut archive = None;
    for line in stdout.lines() {
        if let Some(value) = line.strip_prefix("run_id: ") {
            run_id = Some(value.trim().to_string());
        }
        if let Some(value) = line.strip_prefix("archive: ") {
            archive = Some(PathBuf::from(value.trim()));
        }
    }
    (
        run_id.expect("run_id line in output"),
        archive.expect("archive line in output"),
    )
}

/// Names of the regular files in a directory.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
