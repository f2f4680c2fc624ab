use std::sync::Arc;
use std::time::Duration;

use asm_decompiler::compiler::MockCompiler;
use asm_decompiler::errors::{GenerationError, StageFailure};
use asm_decompiler::generator::{GeneratedSource, RemoteGenerator, TemplateGenerator};
use asm_decompiler::models::{ProgressStage, Stage};
use asm_decompiler::report::{export_history_json, render_report};
use asm_decompiler::verifier::HeuristicVerifier;
use asm_decompiler::{
    decompile_fragment, CodeGenerator, Config, Fragment, PipelineCoordinator, PipelineRun, ResultStore, RunStatus,
};
use async_trait::async_trait;
use tempfile::tempdir;

const MEMCPY: &str = "memcpy:\n    lwz r5, 0(r4)\n    stw r5, 0(r3)\n    blr\n";
const MEMSET: &str = "memset:\n    stw r4, 0(r3)\n    blr\n";

/// Emits source with an unclosed function body.
struct TruncatingGenerator;

#[async_trait]
impl CodeGenerator for TruncatingGenerator {
    fn name(&self) -> &str {
        "truncating"
    }

    async fn produce(&self, fragment: &Fragment) -> Result<GeneratedSource, GenerationError> {
        Ok(GeneratedSource::new(
            format!("#include <stdio.h>\nint {}(void) {{\n    return 0;\n", fragment.identifier()),
            0.4,
        ))
    }
}

fn mock_pipeline(generator: Arc<dyn CodeGenerator>) -> PipelineCoordinator {
    PipelineCoordinator::new(
        generator,
        Arc::new(MockCompiler::new()),
        Arc::new(HeuristicVerifier::new().with_score("memset", 100)),
        Arc::new(ResultStore::new()),
    )
}

#[tokio::test]
async fn test_decompile_fragment_with_report() {
    let dir = tempdir().unwrap();
    let report_path = dir.path().join("reports").join("memcpy.md");

    let run = decompile_fragment(&Config::default(), &Fragment::new(MEMCPY), Some(&report_path))
        .await
        .unwrap();

    assert_eq!(run.fragment_identifier(), "memcpy");
    assert_eq!(run.status(), RunStatus::Warning);
    assert_eq!(run.match_percentage(), Some(85));
    assert!(run.candidate_source().contains("int memcpy(void)"));

    let report = std::fs::read_to_string(&report_path).unwrap();
    assert!(report.contains("- Total functions: 1"));
    assert!(report.contains("### memcpy (warning)"));
}

#[tokio::test]
async fn test_end_to_end_history() {
    let coordinator = mock_pipeline(Arc::new(TemplateGenerator::new()));

    let partial = coordinator.run(&Fragment::new(MEMCPY)).await.unwrap();
    assert_eq!(partial.status(), RunStatus::Warning);
    assert!(!partial.discrepancies().unwrap().is_empty());

    let exact = coordinator.run(&Fragment::new(MEMSET)).await.unwrap();
    assert_eq!(exact.status(), RunStatus::Success);
    assert_eq!(exact.match_percentage(), Some(100));
    assert_eq!(exact.discrepancies().map(|d| d.len()), Some(0));

    let history = coordinator.history();
    assert_eq!(history, vec![exact, partial]);

    let report = render_report(&history);
    assert!(report.contains("- Success rate: 50.0%"));

    let dir = tempdir().unwrap();
    let path = dir.path().join("history.json");
    export_history_json(&history, &path).unwrap();
    let parsed: Vec<PipelineRun> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, history);

    coordinator.clear_history();
    assert!(coordinator.history().is_empty());
}

#[tokio::test]
async fn test_unreachable_generator_aborts_run() {
    let generator = RemoteGenerator::new("http://127.0.0.1:1", None, "openai", Duration::from_secs(2)).unwrap();
    let coordinator = mock_pipeline(Arc::new(generator));
    let mut progress = coordinator.subscribe();

    let err = coordinator.run(&Fragment::new(MEMCPY)).await.unwrap_err();

    assert_eq!(err.stage, Stage::Generate);
    assert!(matches!(
        err.cause,
        StageFailure::Generation(GenerationError::Unreachable(_)) | StageFailure::Generation(GenerationError::Timeout(_))
    ));
    assert!(err.to_string().contains("generate"));
    assert!(coordinator.history().is_empty());

    let mut last = None;
    while let Ok(event) = progress.try_recv() {
        last = Some(event.stage);
    }
    assert_eq!(last, Some(ProgressStage::Failed));
}

#[tokio::test]
async fn test_unbalanced_source_is_recorded_as_error() {
    let coordinator = mock_pipeline(Arc::new(TruncatingGenerator));

    let run = coordinator.run(&Fragment::new(MEMCPY)).await.unwrap();

    assert_eq!(run.status(), RunStatus::Error);
    assert_eq!(run.compile_errors(), &["invalid structure".to_string()]);
    assert_eq!(run.match_percentage(), Some(0));
    assert_eq!(run.discrepancies().unwrap(), &["compilation failed".to_string()]);
    assert_eq!(coordinator.history().len(), 1);
}

#[tokio::test]
async fn test_function_hint_and_origin() {
    let coordinator = mock_pipeline(Arc::new(TemplateGenerator::new()));
    let fragment = Fragment::with_identifier("    stw r4, 0(r3)\n    blr\n", "memset").with_origin("string.s");

    let run = coordinator.run(&fragment).await.unwrap();

    assert_eq!(run.fragment_identifier(), "memset");
    assert_eq!(run.source_fragment_ref(), Some("string.s"));
    assert_eq!(run.status(), RunStatus::Success);
}

#[tokio::test]
async fn test_config_file_drives_pipeline() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("decomp.json");
    std::fs::write(&config_path, r#"{"timeout_ms": 10000, "history_limit": 1}"#).unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let store = config.build_store();
    let coordinator = config.build_coordinator(Arc::clone(&store)).unwrap();

    coordinator.run(&Fragment::new(MEMCPY)).await.unwrap();
    coordinator.run(&Fragment::new(MEMSET)).await.unwrap();

    let history = store.list();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].fragment_identifier(), "memset");
}
