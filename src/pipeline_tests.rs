//! End-to-end pipeline tests in dry mode.
//!
//! These exercise the whole orchestration against a temporary prompt store
//! and runs root, checking the artifact layout the transport layer serves.
use crate::config::{EXPECTED_COST, MISSING, PipelineConfig};
use crate::gate::GateStatus;
use crate::intake::EvidenceItem;
use crate::pipeline::generate_run;
use crate::stage::StageId;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_prompts(dir: &Path) {
    for stage in StageId::ORDER {
        fs::write(
            dir.join(stage.prompt_file()),
            format!("Инструкции стадии {stage}\n"),
        )
        .unwrap();
    }
}

fn base_intake() -> Map<String, Value> {
    let Value::Object(map) = json!({
        "project_name": "EVIA Pilot",
        "company_name": "ACME",
        "goals": "Сделать MVP",
        "problem_statement": "Нет автоматизации",
        "target_audience": "B2B",
        "timeline": "45 дней"
    }) else {
        unreachable!()
    };
    map
}

struct TestRun {
    _root: TempDir,
    run_id: String,
    run_dir: PathBuf,
    archive_path: PathBuf,
    gate_status: GateStatus,
}

fn run_pipeline(intake: Map<String, Value>, evidence: Vec<EvidenceItem>) -> TestRun {
    let root = TempDir::new().unwrap();
    let prompts_dir = root.path().join("prompts");
    fs::create_dir(&prompts_dir).unwrap();
    write_prompts(&prompts_dir);

    let cfg = PipelineConfig::for_tests(prompts_dir);
    let runs_root = root.path().join("runs");
    let outcome = generate_run(intake, evidence, &cfg, &runs_root).unwrap();

    TestRun {
        run_dir: outcome.archive_path.parent().unwrap().to_path_buf(),
        run_id: outcome.run_id,
        archive_path: outcome.archive_path,
        gate_status: outcome.gate_status,
        _root: root,
    }
}

fn read_json(run_dir: &Path, name: &str) -> Value {
    let content = fs::read_to_string(run_dir.join(name)).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn ready_intake_produces_all_ten_stages_in_order() {
    let run = run_pipeline(base_intake(), Vec::new());
    assert_eq!(run.gate_status, GateStatus::Ready);

    for stage in StageId::ORDER {
        let tag = stage.file_tag();
        assert!(
            run.run_dir.join(format!("S{tag}.md")).is_file(),
            "missing S{tag}.md"
        );
        let data = read_json(&run.run_dir, &format!("S{tag}.json"));
        assert_eq!(data["stage"], json!(stage.as_str()));
    }
    assert!(run.archive_path.is_file());
}

#[test]
fn not_ready_intake_stops_after_the_gate() {
    let mut intake = base_intake();
    intake.insert("goals".to_string(), json!(""));
    let run = run_pipeline(intake, Vec::new());

    assert_eq!(run.gate_status, GateStatus::NotReady);

    let s0 = read_json(&run.run_dir, "S0.json");
    assert_eq!(s0["status"], json!("НЕ ГОТОВО"));
    assert_eq!(s0["intake"]["goals"], json!(MISSING));
    assert_eq!(
        s0["questions"],
        json!(["Уточните поле 'goals' для продолжения."])
    );

    // Exactly one stage record persisted, plus the archive.
    let names: BTreeSet<String> = fs::read_dir(&run.run_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    let expected: BTreeSet<String> = [
        "S0.md".to_string(),
        "S0.json".to_string(),
        format!("{}.zip", run.run_id),
    ]
    .into_iter()
    .collect();
    assert_eq!(names, expected);
}

#[test]
fn sanitized_leaves_never_surface_as_empty_strings() {
    let mut intake = base_intake();
    intake.insert("timeline".to_string(), Value::Null);
    intake.insert("contacts".to_string(), json!([]));
    let run = run_pipeline(intake, Vec::new());

    let s0 = read_json(&run.run_dir, "S0.json");
    assert_eq!(s0["intake"]["timeline"], json!(MISSING));
    assert_eq!(s0["intake"]["contacts"], json!([MISSING]));
}

#[test]
fn terminal_stage_copies_the_fixation_block_verbatim() {
    let run = run_pipeline(base_intake(), Vec::new());

    let s5 = read_json(&run.run_dir, "S5.json");
    let s6 = read_json(&run.run_dir, "S6.json");
    assert_eq!(s6["copied_from_fixation"], s5["(10) БЛОК ФИКСАЦИИ"]);
    assert_eq!(s6["status"], json!("OK"));

    let terminal = s6["llm_output"].as_str().unwrap();
    assert!(terminal.contains("Финальный результат EVIA R&D"));
    assert!(terminal.contains(&format!("run_id: {}", run.run_id)));
    assert!(terminal.contains("evia_decision: БЕРЁМ"));
    assert!(terminal.contains(&format!("evia_cost_45_days: {EXPECTED_COST}")));
}

#[test]
fn terminal_document_repackages_rather_than_echoes_the_placeholder() {
    let run = run_pipeline(base_intake(), Vec::new());

    // Intermediate stages carry the dry-mode placeholder...
    let s1 = read_json(&run.run_dir, "S1.json");
    assert!(s1["llm_output"]
        .as_str()
        .unwrap()
        .starts_with("[DRY_RUN] Stage 1"));

    // ...but the terminal report and its rendered document do not.
    let s6 = read_json(&run.run_dir, "S6.json");
    assert!(!s6["llm_output"].as_str().unwrap().contains("[DRY_RUN]"));

    let final_doc = fs::read_to_string(run.run_dir.join("S6_final.md")).unwrap();
    assert!(final_doc.starts_with("# S6 Final\n\n"));
    assert!(final_doc.contains("Финальный результат EVIA R&D"));
    assert!(!final_doc.contains("[DRY_RUN] Stage"));
    assert!(!final_doc.contains("\"stage\": \"6\""));
}

#[test]
fn stage_five_document_lists_every_fixation_field() {
    let run = run_pipeline(base_intake(), Vec::new());

    let s5_md = fs::read_to_string(run.run_dir.join("S5.md")).unwrap();
    assert!(s5_md.contains("(10) БЛОК ФИКСАЦИИ"));
    assert!(s5_md.contains(&format!("run_id: {}", run.run_id)));
    assert!(s5_md.contains("project_name: EVIA Pilot"));
    assert!(s5_md.contains(&format!("evia_cost_45_days: {EXPECTED_COST}")));
}

#[test]
fn archive_entries_are_set_equal_to_the_run_directory() {
    let run = run_pipeline(base_intake(), Vec::new());

    let on_disk: BTreeSet<String> = fs::read_dir(&run.run_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| !name.ends_with(".zip"))
        .collect();

    let file = fs::File::open(&run.archive_path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let in_archive: BTreeSet<String> = (0..archive.len())
        .map(|index| archive.by_index(index).unwrap().name().to_string())
        .collect();

    assert_eq!(on_disk, in_archive);
    // 10 documents + 10 metadata files + the terminal document.
    assert_eq!(in_archive.len(), 21);
}

#[test]
fn evidence_is_recorded_in_input_order() {
    let evidence = vec![
        EvidenceItem {
            kind: "file".to_string(),
            value: "runs/_uploads/brief.pdf".to_string(),
        },
        EvidenceItem {
            kind: "note".to_string(),
            value: "компания из Казани".to_string(),
        },
    ];
    let run = run_pipeline(base_intake(), evidence);

    let s0 = read_json(&run.run_dir, "S0.json");
    assert_eq!(
        s0["evidence"],
        json!([
            {"type": "file", "value": "runs/_uploads/brief.pdf"},
            {"type": "note", "value": "компания из Казани"}
        ])
    );
}

#[test]
fn numbered_stages_carry_the_decision_verbatim() {
    let run = run_pipeline(base_intake(), Vec::new());

    for stage in &StageId::ORDER[1..8] {
        let data = read_json(&run.run_dir, &format!("S{}.json", stage.file_tag()));
        assert_eq!(data["evia_decision"], json!("БЕРЁМ"), "stage {stage}");
        assert_eq!(data["evia_cost_45_days"], json!(EXPECTED_COST), "stage {stage}");
        assert_eq!(data["run_id"], json!(run.run_id), "stage {stage}");
    }
}
