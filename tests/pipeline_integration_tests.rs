//! Integration tests for the reactive generator pipeline
//!
//! These tests verify the full data flow: edits debounce into the committed
//! configuration, the capacity guard runs before the encoder, faults are
//! isolated behind the fallback symbol, and export gating follows the
//! current generation.

use camino::Utf8PathBuf;
use qrstudio::models::{EccLevel, QrOptions};
use qrstudio::services::{
    EncoderFault, ExportError, ExportFormat, ExportService, GeneratorPipeline, RenderedSymbol,
    SymbolEncoder,
};
use qrstudio::{Generation, Metrics, OptionsStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Encoder double that always faults, counting its invocations.
struct FaultingEncoder {
    calls: AtomicUsize,
}

impl FaultingEncoder {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

impl SymbolEncoder for FaultingEncoder {
    fn encode(&self, _options: &QrOptions) -> Result<RenderedSymbol, EncoderFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EncoderFault::Rejected("synthetic failure".to_string()))
    }
}

fn fixture() -> (GeneratorPipeline, OptionsStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    let store = OptionsStore::with_commit_delay(
        tokio::runtime::Handle::current(),
        Duration::from_millis(50),
    );
    let exporter = ExportService::new(&dir).unwrap();
    let pipeline =
        GeneratorPipeline::new(store.clone(), exporter, Arc::new(Metrics::new()));
    (pipeline, store, temp_dir)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

#[tokio::test]
async fn test_edit_to_export_flow() {
    let (pipeline, store, dir) = fixture();
    let _loop_handle = pipeline.spawn_event_loop(&tokio::runtime::Handle::current());

    store.set_content("https://example.com");
    settle().await;

    assert!(pipeline.can_export(), "committed content should have rendered");

    let path = pipeline.export(ExportFormat::Svg).await.unwrap();
    assert!(path.as_str().ends_with("qrcode.svg"));
    assert!(dir.path().join("qrcode.svg").exists());

    let markup = std::fs::read_to_string(path.as_std_path()).unwrap();
    assert!(markup.contains("<svg"));
}

#[tokio::test]
async fn test_too_long_blocks_export_until_recovery() {
    let (pipeline, store, _dir) = fixture();
    let _loop_handle = pipeline.spawn_event_loop(&tokio::runtime::Handle::current());

    // 2000 characters: over capacity at H (1273), within it at L (2953).
    store.set_level(EccLevel::H);
    store.set_content(&"x".repeat(2000));
    settle().await;

    assert!(matches!(pipeline.current(), Generation::TooLong { .. }));
    let err = pipeline.export(ExportFormat::Png).await.unwrap_err();
    assert!(matches!(err, ExportError::CapacityExceeded { .. }));

    // Recoverable: lowering the requirement re-enables encoding.
    store.set_level(EccLevel::L);
    settle().await;

    assert!(pipeline.can_export());
    pipeline.export(ExportFormat::Png).await.unwrap();
}

#[tokio::test]
async fn test_guard_runs_before_encoder() {
    let temp_dir = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    let store = OptionsStore::with_commit_delay(
        tokio::runtime::Handle::current(),
        Duration::from_millis(50),
    );
    let encoder = Arc::new(FaultingEncoder::new());
    let pipeline = GeneratorPipeline::with_encoder(
        store.clone(),
        ExportService::new(&dir).unwrap(),
        Arc::new(Metrics::new()),
        encoder.clone(),
    );
    let _loop_handle = pipeline.spawn_event_loop(&tokio::runtime::Handle::current());

    store.set_level(EccLevel::H);
    store.set_content(&"x".repeat(3000));
    settle().await;

    assert!(matches!(pipeline.current(), Generation::TooLong { .. }));
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 0, "encoder must never see too-long input");
}

#[tokio::test]
async fn test_fault_yields_fallback_and_refuses_export() {
    let dir = TempDir::new().unwrap();
    let store = OptionsStore::with_commit_delay(
        tokio::runtime::Handle::current(),
        Duration::from_millis(50),
    );
    let exporter =
        ExportService::new(Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()).unwrap();
    let pipeline = GeneratorPipeline::with_encoder(
        store.clone(),
        exporter,
        Arc::new(Metrics::new()),
        Arc::new(FaultingEncoder::new()),
    );
    let _loop_handle = pipeline.spawn_event_loop(&tokio::runtime::Handle::current());

    store.set_content("this will fault");
    settle().await;

    match pipeline.current() {
        Generation::Fallback { symbol, fault } => {
            assert!(symbol.markup.contains("<svg"));
            assert_eq!(symbol.modules, 0);
            assert!(fault.contains("synthetic failure"));
        }
        other => panic!("expected Fallback, got {:?}", other),
    }

    let err = pipeline.export(ExportFormat::Svg).await.unwrap_err();
    assert!(matches!(err, ExportError::EncoderFault));

    assert!(!dir.path().join("qrcode.svg").exists(), "no artifact on the fault path");
}

#[tokio::test]
async fn test_new_commit_supersedes_generation() {
    let (pipeline, store, _dir) = fixture();
    let _loop_handle = pipeline.spawn_event_loop(&tokio::runtime::Handle::current());

    store.set_content("first content");
    settle().await;
    let first = pipeline.current();

    store.set_content("second content");
    settle().await;
    let second = pipeline.current();

    assert!(first.exportable() && second.exportable());
    assert_ne!(first, second, "a new commit must discard the superseded symbol");
}

#[tokio::test]
async fn test_config_change_affects_subsequent_exports_only() {
    let (pipeline, store, dir) = fixture();
    let _loop_handle = pipeline.spawn_event_loop(&tokio::runtime::Handle::current());

    store.set_content("stable content");
    settle().await;

    let svg_path = pipeline.export(ExportFormat::Svg).await.unwrap();
    let before = std::fs::read(svg_path.as_std_path()).unwrap();

    // Change the module size, then export again: only the new export sees it.
    store.set_module_size(128);
    settle().await;
    pipeline.export(ExportFormat::Png).await.unwrap();

    let png = std::fs::read(dir.path().join("qrcode.png")).unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!(decoded.width(), 128);

    // The earlier SVG artifact on disk is untouched by the later change.
    let after = std::fs::read(svg_path.as_std_path()).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_empty_content_disables_export() {
    let (pipeline, _store, _dir) = fixture();
    pipeline.refresh();

    assert_eq!(pipeline.current(), Generation::Idle);
    let err = pipeline.export(ExportFormat::Jpeg).await.unwrap_err();
    assert!(matches!(err, ExportError::EmptyContent));
}
