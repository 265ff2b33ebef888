use std::sync::{Arc, RwLock};
use std::time::Instant;

use camino::Utf8PathBuf;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::metrics::Metrics;
use crate::models::capacity;
use crate::services::encoder::{QrSymbolEncoder, RenderedSymbol, SymbolEncoder, fallback_symbol};
use crate::services::export::{ExportError, ExportFormat, ExportService};
use crate::state::OptionsStore;

/// Outcome of deriving a symbol from the committed configuration.
///
/// Exactly one generation is current at a time; it is replaced wholesale on
/// every committed change.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// No content yet; nothing to encode or export.
    Idle,

    /// The capacity guard rejected the content before the encoder ran.
    /// Recoverable: shorten the content or lower the level.
    TooLong { length: usize, capacity: usize },

    /// A successfully rendered symbol, ready for export.
    Symbol(RenderedSymbol),

    /// The encoder faulted after the guard passed; the fixed fallback
    /// symbol stands in and export is refused.
    Fallback { symbol: RenderedSymbol, fault: String },
}

impl Generation {
    /// Export is available only for a successfully rendered symbol.
    pub fn exportable(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }
}

/// The reactive generator pipeline
///
/// Ties the store, the capacity guard, the encoder and the exporter
/// together:
/// - Re-derives the current [`Generation`] whenever the committed
///   configuration changes
/// - Runs the capacity guard strictly before the encoder
/// - Catches encoder faults and substitutes the fallback symbol
/// - Gates export on a current, successfully rendered symbol
///
/// Cloning shares the store, encoder, and current generation.
pub struct GeneratorPipeline {
    store: OptionsStore,
    encoder: Arc<dyn SymbolEncoder>,
    exporter: ExportService,
    metrics: Arc<Metrics>,
    current: Arc<RwLock<Generation>>,
}

impl GeneratorPipeline {
    /// Create a pipeline with the production encoder.
    pub fn new(store: OptionsStore, exporter: ExportService, metrics: Arc<Metrics>) -> Self {
        Self::with_encoder(store, exporter, metrics, Arc::new(QrSymbolEncoder::new()))
    }

    /// Create a pipeline with an injected encoder (tests exercise the
    /// fault path this way).
    pub fn with_encoder(
        store: OptionsStore,
        exporter: ExportService,
        metrics: Arc<Metrics>,
        encoder: Arc<dyn SymbolEncoder>,
    ) -> Self {
        Self {
            store,
            encoder,
            exporter,
            metrics,
            current: Arc::new(RwLock::new(Generation::Idle)),
        }
    }

    /// The current generation.
    pub fn current(&self) -> Generation {
        self.current.read().unwrap().clone()
    }

    /// Whether an export call would be accepted right now.
    pub fn can_export(&self) -> bool {
        self.current.read().unwrap().exportable()
    }

    /// Re-derive the generation from the committed configuration.
    ///
    /// Guard first, encoder second: the too-long condition never reaches
    /// the encoder, and any other encoder failure becomes the fallback.
    pub fn refresh(&self) -> Generation {
        let options = self.store.committed();

        let generation = if !options.has_content() {
            Generation::Idle
        } else if capacity::is_too_long(&options.content, options.level) {
            let length = capacity::content_length(&options.content);
            let max = capacity::capacity_for(options.level);
            self.metrics.record_capacity_rejection();
            tracing::warn!(
                "Content exceeds capacity at level {}: {} > {}",
                options.level,
                length,
                max
            );
            Generation::TooLong { length, capacity: max }
        } else {
            match self.encoder.encode(&options) {
                Ok(symbol) => {
                    self.metrics.record_symbol_rendered();
                    Generation::Symbol(symbol)
                }
                Err(fault) => {
                    self.metrics.record_encoder_fault();
                    tracing::error!("Encoder fault, substituting fallback symbol: {fault}");
                    Generation::Fallback {
                        symbol: fallback_symbol(options.module_size),
                        fault: fault.to_string(),
                    }
                }
            }
        };

        *self.current.write().unwrap() = generation.clone();
        generation
    }

    /// Export the current symbol in the requested format.
    ///
    /// Refused unless a successfully rendered symbol is current; the error
    /// kind tells the caller which gate closed.
    pub async fn export(&self, format: ExportFormat) -> Result<Utf8PathBuf, ExportError> {
        let generation = self.current();

        let result = match generation {
            Generation::Idle => Err(ExportError::EmptyContent),
            Generation::TooLong { length, capacity } => {
                Err(ExportError::CapacityExceeded { length, capacity })
            }
            Generation::Fallback { .. } => Err(ExportError::EncoderFault),
            Generation::Symbol(symbol) => {
                let background = self.store.committed().background;
                let start = Instant::now();
                let outcome = self.exporter.export(&symbol, background, format).await;
                if outcome.is_ok() {
                    self.metrics.record_export_time(start.elapsed());
                }
                outcome
            }
        };

        match &result {
            Ok(path) => {
                self.metrics.record_export_completed();
                tracing::info!("Export {} complete: {}", format, path);
            }
            Err(error) => {
                self.metrics.record_export_failed();
                tracing::warn!("Export {} refused or failed: {}", format, error);
            }
        }

        result
    }

    /// Spawn the event loop that re-derives the generation on every
    /// committed change. Runs until the store (and its channel) is dropped.
    pub fn spawn_event_loop(&self, runtime: &tokio::runtime::Handle) -> JoinHandle<()> {
        let pipeline = self.clone();
        let mut rx = self.store.subscribe();

        runtime.spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        pipeline.metrics.record_state_event();
                        tracing::debug!("State change: {:?}", event);
                        pipeline.refresh();
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("Pipeline event loop lagged, missed {missed} event(s)");
                        pipeline.refresh();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Block-free access to the store backing this pipeline.
    pub fn store(&self) -> &OptionsStore {
        &self.store
    }
}

impl Clone for GeneratorPipeline {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            encoder: Arc::clone(&self.encoder),
            exporter: self.exporter.clone(),
            metrics: Arc::clone(&self.metrics),
            current: Arc::clone(&self.current),
        }
    }
}

impl std::fmt::Debug for GeneratorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorPipeline")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

// This event loop refreshes once per event; a commit that also flips the
// capacity verdict emits two events and refreshes twice. Refresh is
// idempotent, so the second pass is wasted work, not a correctness issue.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::encoder::{EncoderFault, MockSymbolEncoder};
    use camino::Utf8PathBuf;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fixture() -> (GeneratorPipeline, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let store = OptionsStore::with_commit_delay(
            tokio::runtime::Handle::current(),
            Duration::from_millis(50),
        );
        let exporter = ExportService::new(&dir).unwrap();
        let pipeline = GeneratorPipeline::new(store, exporter, Arc::new(Metrics::new()));
        (pipeline, temp_dir)
    }

    fn fixture_with_encoder(
        encoder: Arc<dyn SymbolEncoder>,
    ) -> (GeneratorPipeline, TempDir) {
        let (pipeline, temp_dir) = fixture();
        let replaced = GeneratorPipeline::with_encoder(
            pipeline.store.clone(),
            pipeline.exporter.clone(),
            Arc::clone(&pipeline.metrics),
            encoder,
        );
        (replaced, temp_dir)
    }

    #[tokio::test]
    async fn test_empty_content_is_idle() {
        let (pipeline, _dir) = fixture();
        assert_eq!(pipeline.refresh(), Generation::Idle);
        assert!(!pipeline.can_export());
    }

    #[tokio::test]
    async fn test_valid_content_renders_symbol() {
        let (pipeline, _dir) = fixture();
        pipeline.store().set_content("https://example.com");
        tokio::time::sleep(Duration::from_millis(120)).await;

        let generation = pipeline.refresh();
        assert!(matches!(generation, Generation::Symbol(_)));
        assert!(pipeline.can_export());
        assert_eq!(pipeline.metrics.symbols_rendered.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_too_long_content_never_reaches_encoder() {
        // A mock with no expectations panics if encode is ever called.
        let encoder = Arc::new(MockSymbolEncoder::new());
        let (pipeline, _dir) = fixture_with_encoder(encoder);

        pipeline.store().set_content(&"x".repeat(3000));
        pipeline.store().set_level(crate::models::EccLevel::H);
        tokio::time::sleep(Duration::from_millis(120)).await;

        let generation = pipeline.refresh();
        assert_eq!(generation, Generation::TooLong { length: 3000, capacity: 1273 });
        assert!(!pipeline.can_export());

        let err = pipeline.export(ExportFormat::Svg).await.unwrap_err();
        assert!(matches!(err, ExportError::CapacityExceeded { length: 3000, capacity: 1273 }));
        assert_eq!(pipeline.metrics.capacity_rejections.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_encoder_fault_substitutes_fallback() {
        let mut mock = MockSymbolEncoder::new();
        mock.expect_encode()
            .returning(|_| Err(EncoderFault::Rejected("synthetic fault".to_string())));
        let (pipeline, _dir) = fixture_with_encoder(Arc::new(mock));

        pipeline.store().set_content("anything");
        tokio::time::sleep(Duration::from_millis(120)).await;

        match pipeline.refresh() {
            Generation::Fallback { symbol, fault } => {
                assert_eq!(symbol, fallback_symbol(512));
                assert!(fault.contains("synthetic fault"));
            }
            other => panic!("expected Fallback, got {:?}", other),
        }

        let err = pipeline.export(ExportFormat::Png).await.unwrap_err();
        assert!(matches!(err, ExportError::EncoderFault));
        assert_eq!(pipeline.metrics.encoder_faults.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_idle_export_refused() {
        let (pipeline, _dir) = fixture();
        pipeline.refresh();
        let err = pipeline.export(ExportFormat::Png).await.unwrap_err();
        assert!(matches!(err, ExportError::EmptyContent));
        assert_eq!(pipeline.metrics.exports_failed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_event_loop_refreshes_on_commit() {
        let (pipeline, _dir) = fixture();
        let handle = pipeline.spawn_event_loop(&tokio::runtime::Handle::current());

        pipeline.store().set_content("https://example.com");
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(pipeline.can_export());
        handle.abort();
    }
}
