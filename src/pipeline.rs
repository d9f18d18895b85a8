//! Run orchestration: one end-to-end pipeline execution.
//!
//! A run is strictly sequential (every stage's context carries the previous
//! stage's structured data) and writes only to its own output directory, so
//! concurrent runs isolate through run-id namespacing alone. There is no
//! cancellation: a run executes to completion or fails fatally.
use crate::backend::GenerationBackend;
use crate::cli::{GateArgs, RunArgs};
use crate::config::{self, PipelineConfig};
use crate::decision;
use crate::fixation;
use crate::gate::{self, GateStatus};
use crate::intake::{self, EvidenceItem};
use crate::output::{self, FsRunSink, RunSink};
use crate::prompts::PromptStore;
use crate::render;
use crate::stage::{self, StageId, StageRecord};
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// What one finished (or gate-stopped) run hands back to the caller.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: String,
    pub archive_path: std::path::PathBuf,
    pub gate_status: GateStatus,
}

/// Execute the full pipeline for one intake record.
pub fn generate_run(
    intake_raw: Map<String, Value>,
    evidence: Vec<EvidenceItem>,
    cfg: &PipelineConfig,
    runs_root: &Path,
) -> Result<RunOutcome> {
    let run_id = new_run_id();
    let mut sink = FsRunSink::create(runs_root, &run_id)?;

    let intake = intake::prepare_intake(intake_raw, &cfg.missing_marker);
    let prompts = PromptStore::new(cfg.prompts_dir.clone());
    let backend = GenerationBackend::new(cfg);
    let capability = render::probe();

    let evidence_json =
        serde_json::to_value(&evidence).context("serialize evidence items")?;
    let mut base_context = Map::new();
    base_context.insert("run_id".to_string(), Value::String(run_id.clone()));
    base_context.insert("intake".to_string(), Value::Object(intake.clone()));
    base_context.insert("evidence".to_string(), evidence_json.clone());

    let mut records: Vec<StageRecord> = Vec::new();

    // Stage "0": the readiness gate runs through the same executor as every
    // other stage, so a not-ready run still yields one complete record.
    let gate_outcome = gate::evaluate(&intake, &cfg.missing_marker);
    let questions_json = Value::Array(
        gate_outcome
            .questions
            .iter()
            .map(|question| Value::String(question.clone()))
            .collect(),
    );
    let mut s0_context = base_context.clone();
    s0_context.insert(
        "status".to_string(),
        Value::String(gate_outcome.status.as_str().to_string()),
    );
    s0_context.insert("questions".to_string(), questions_json.clone());

    let mut s0_extras = Map::new();
    s0_extras.insert(
        "status".to_string(),
        Value::String(gate_outcome.status.as_str().to_string()),
    );
    s0_extras.insert("questions".to_string(), questions_json);
    s0_extras.insert("intake".to_string(), Value::Object(intake.clone()));
    s0_extras.insert("evidence".to_string(), evidence_json);
    s0_extras.insert("auto_web".to_string(), Value::String("disabled".to_string()));
    s0_extras.insert("dry_run".to_string(), Value::Bool(backend.is_dry()));
    records.push(stage::execute(
        StageId::S0,
        &prompts,
        &backend,
        &s0_context,
        s0_extras,
    )?);

    if gate_outcome.status == GateStatus::NotReady {
        output::persist_records(&mut sink, &records)?;
        let archive_path = sink.finalize(&run_id)?;
        tracing::info!(
            run_id = %run_id,
            questions = gate_outcome.questions.len(),
            "run stopped at readiness gate"
        );
        return Ok(RunOutcome {
            run_id,
            archive_path,
            gate_status: GateStatus::NotReady,
        });
    }

    let decision_outcome = decision::evaluate(&cfg.cost_45_days);
    if let Some(reason) = &decision_outcome.failure_reason {
        base_context.insert("failure_reason".to_string(), Value::String(reason.clone()));
    }

    // Numbered stages "1" through "4", each seeing its predecessor's data.
    for &stage_id in &StageId::ORDER[1..8] {
        let previous = records
            .last()
            .map(|record| record.data.clone())
            .ok_or_else(|| anyhow!("stage {stage_id} has no predecessor record"))?;

        let mut context = base_context.clone();
        context.insert(
            "stage".to_string(),
            Value::String(stage_id.as_str().to_string()),
        );
        context.insert(
            "evia_cost_45_days".to_string(),
            Value::String(cfg.cost_45_days.clone()),
        );
        context.insert(
            "evia_decision".to_string(),
            Value::String(decision_outcome.decision.as_str().to_string()),
        );
        context.insert("previous_stage".to_string(), Value::Object(previous));

        let mut extras = Map::new();
        extras.insert("run_id".to_string(), Value::String(run_id.clone()));
        extras.insert(
            "evia_cost_45_days".to_string(),
            Value::String(cfg.cost_45_days.clone()),
        );
        extras.insert(
            "evia_decision".to_string(),
            Value::String(decision_outcome.decision.as_str().to_string()),
        );
        records.push(stage::execute(
            stage_id, &prompts, &backend, &context, extras,
        )?);
    }

    // Stage "5": freeze the fixation block and embed it verbatim.
    let block = fixation::build(
        &run_id,
        &cfg.cost_45_days,
        decision_outcome.decision,
        &intake,
        &cfg.missing_marker,
    );
    let block_map = fixation::to_map(&block)?;

    let mut s5_context = base_context.clone();
    s5_context.insert("fixation".to_string(), Value::Object(block_map.clone()));
    let mut s5_extras = Map::new();
    s5_extras.insert("run_id".to_string(), Value::String(run_id.clone()));
    s5_extras.insert(
        "evia_cost_45_days".to_string(),
        Value::String(cfg.cost_45_days.clone()),
    );
    s5_extras.insert(
        fixation::FIXATION_KEY.to_string(),
        Value::Object(block_map.clone()),
    );
    let mut s5 = stage::execute(StageId::S5, &prompts, &backend, &s5_context, s5_extras)?;
    s5.markdown.push_str(&format!(
        "\n{}\n{}",
        fixation::FIXATION_KEY,
        fixation::listing(&block_map)
    ));
    records.push(s5);

    // Stage "6": validate the block and copy it into the terminal report.
    let s6_prompt = prompts.load(StageId::S6)?;
    let s6 = fixation::terminal_record(&run_id, &block_map, &s6_prompt)?;
    let terminal_text = s6
        .data
        .get("llm_output")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    records.push(s6);

    output::persist_records(&mut sink, &records)?;

    let (doc_name, doc_bytes) = render::render_final(capability, "S6 Final", &terminal_text);
    sink.write_artifact(&doc_name, &doc_bytes)?;

    let archive_path = sink.finalize(&run_id)?;
    tracing::info!(
        run_id = %run_id,
        stages = records.len(),
        archive = %archive_path.display(),
        "run complete"
    );

    Ok(RunOutcome {
        run_id,
        archive_path,
        gate_status: GateStatus::Ready,
    })
}

/// Collision-resistant run identifier: 12 hex chars of a v4 UUID.
fn new_run_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..12].to_string()
}

/// `evia run`: execute the pipeline for an intake file and report the bundle.
pub fn run_run(args: &RunArgs) -> Result<()> {
    let raw = read_intake(&args.intake)?;
    let evidence = intake::collect_evidence(&raw, &args.evidence);
    let cfg = PipelineConfig::resolve(args.prompts.clone(), args.live, args.model.as_deref());

    let outcome = generate_run(raw, evidence, &cfg, &args.runs_root)?;

    println!("run_id: {}", outcome.run_id);
    println!("archive: {}", outcome.archive_path.display());
    if outcome.gate_status == GateStatus::NotReady {
        println!("status: {}", outcome.gate_status.as_str());
    }
    Ok(())
}

/// `evia gate`: report readiness without generating anything.
pub fn run_gate(args: &GateArgs) -> Result<()> {
    let raw = read_intake(&args.intake)?;
    let intake = intake::prepare_intake(raw, config::MISSING);
    let outcome = gate::evaluate(&intake, config::MISSING);

    println!("status: {}", outcome.status.as_str());
    for question in &outcome.questions {
        println!("- {question}");
    }
    Ok(())
}

fn read_intake(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("read intake {}", path.display()))?;
    let value: Value = serde_json::from_str(&content).context("parse intake JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("intake must be a JSON object")),
    }
}
