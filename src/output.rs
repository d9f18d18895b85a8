//! Run artifact persistence and archive packaging.
//!
//! Artifacts are written once, in stage-execution order, and never rewritten.
//! Packaging bundles whatever the run directory holds (minus the archive
//! itself) with deterministic lexicographic entry ordering and no directory
//! prefix, so two identical runs produce identically-shaped archives.
use crate::stage::StageRecord;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Persistence seam for one run's artifacts.
///
/// The orchestrator only ever appends named artifacts and finalizes to an
/// archive, so tests can substitute roots without touching the pipeline.
pub trait RunSink {
    /// Append one named artifact. Names never repeat within a run.
    fn write_artifact(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Bundle every artifact written so far into `<run_id>.zip` and return
    /// the archive location.
    fn finalize(&mut self, run_id: &str) -> Result<PathBuf>;
}

/// Filesystem-backed sink: one directory per run, named by run id.
pub struct FsRunSink {
    run_dir: PathBuf,
}

impl FsRunSink {
    pub fn create(runs_root: &Path, run_id: &str) -> Result<Self> {
        let run_dir = runs_root.join(run_id);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("create run directory {}", run_dir.display()))?;
        Ok(Self { run_dir })
    }
}

impl RunSink for FsRunSink {
    fn write_artifact(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.run_dir.join(name);
        fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))
    }

    fn finalize(&mut self, run_id: &str) -> Result<PathBuf> {
        let zip_path = self.run_dir.join(format!("{run_id}.zip"));
        let file = fs::File::create(&zip_path)
            .with_context(|| format!("create archive {}", zip_path.display()))?;
        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.run_dir)
            .with_context(|| format!("read run directory {}", self.run_dir.display()))?
        {
            let path = entry?.path();
            let is_archive = path.extension().map(|ext| ext == "zip").unwrap_or(false);
            if path.is_file() && !is_archive {
                entries.push(path);
            }
        }
        entries.sort();

        for path in entries {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("artifact name is not valid UTF-8"))?;
            zip.start_file(name, options)
                .with_context(|| format!("add {name} to archive"))?;
            let bytes =
                fs::read(&path).with_context(|| format!("read {}", path.display()))?;
            zip.write_all(&bytes)
                .with_context(|| format!("write {name} into archive"))?;
        }

        zip.finish().context("finalize archive")?;
        Ok(zip_path)
    }
}

/// Write every stage record's document and metadata, in execution order.
pub fn persist_records(sink: &mut impl RunSink, records: &[StageRecord]) -> Result<()> {
    for record in records {
        let tag = record.stage.file_tag();
        sink.write_artifact(&format!("S{tag}.md"), record.markdown.as_bytes())?;
        let metadata =
            serde_json::to_vec_pretty(&record.data).context("serialize stage metadata")?;
        sink.write_artifact(&format!("S{tag}.json"), &metadata)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageId;
    use serde_json::Map;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn record(stage: StageId) -> StageRecord {
        StageRecord {
            stage,
            markdown: format!("# S{stage}\n"),
            data: Map::new(),
        }
    }

    #[test]
    fn artifacts_are_named_by_sanitized_stage_tag() {
        let root = TempDir::new().unwrap();
        let mut sink = FsRunSink::create(root.path(), "runid0001").unwrap();
        persist_records(&mut sink, &[record(StageId::S3x5)]).unwrap();

        let run_dir = root.path().join("runid0001");
        assert!(run_dir.join("S3_5.md").is_file());
        assert!(run_dir.join("S3_5.json").is_file());
    }

    #[test]
    fn archive_entries_match_run_directory_minus_the_archive() {
        let root = TempDir::new().unwrap();
        let mut sink = FsRunSink::create(root.path(), "runid0002").unwrap();
        persist_records(&mut sink, &[record(StageId::S0), record(StageId::S1)]).unwrap();
        sink.write_artifact("S6_final.md", b"# final\n").unwrap();

        let zip_path = sink.finalize("runid0002").unwrap();
        let run_dir = root.path().join("runid0002");

        let on_disk: BTreeSet<String> = fs::read_dir(&run_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| !name.ends_with(".zip"))
            .collect();

        let file = fs::File::open(&zip_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let in_archive: BTreeSet<String> = (0..archive.len())
            .map(|index| archive.by_index(index).unwrap().name().to_string())
            .collect();

        assert_eq!(on_disk, in_archive);
        assert!(!in_archive.contains("runid0002.zip"));
        assert!(!in_archive.iter().any(|name| name.contains('/')));
    }

    #[test]
    fn archive_entry_order_is_lexicographic() {
        let root = TempDir::new().unwrap();
        let mut sink = FsRunSink::create(root.path(), "runid0003").unwrap();
        sink.write_artifact("b.md", b"b").unwrap();
        sink.write_artifact("a.md", b"a").unwrap();

        let zip_path = sink.finalize("runid0003").unwrap();
        let file = fs::File::open(&zip_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|index| archive.by_index(index).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["a.md".to_string(), "b.md".to_string()]);
    }
}
