//! QR Studio - QR code generation with logo overlay and multi-format export
//!
//! Headless entry point.
//!
//! # Overview
//!
//! This binary wires the library components together and performs the
//! configured exports in one pass. It initializes:
//! - Logging infrastructure (file rotation + console output)
//! - Tokio async runtime (debounce timers, artifact delivery)
//! - Configuration loading ([`ConfigManager`])
//! - The configuration store ([`OptionsStore`])
//! - The reactive pipeline ([`GeneratorPipeline`])
//!
//! # Execution Flow
//!
//! 1. Initialize logging → logs/qrstudio_<date>.log
//! 2. Create the tokio runtime
//! 3. Load QrStudio Data/QrStudio.yaml (defaults when missing)
//! 4. Load settings into the store (committed directly, no debounce at
//!    startup) and derive the current generation
//! 5. Export every configured format into the output directory
//! 6. Save the configuration back, log the metrics summary, shut down
//!
//! # Configuration Files
//!
//! Expected in `QrStudio Data/`:
//! - `QrStudio.yaml`: Generator settings, export formats, output directory

use anyhow::Result;
use qrstudio::services::{ExportFormat, ExportService, GeneratorPipeline};
use qrstudio::{APP_NAME, ConfigManager, Generation, Metrics, OptionsStore, VERSION};
use std::sync::Arc;

/// Main entry point for the QR Studio headless run
///
/// # Errors
///
/// This function can fail if:
/// - Logging initialization fails (disk space, permissions)
/// - Tokio runtime creation fails (system resources)
/// - The configuration file is invalid YAML or carries invalid values
/// - The output directory cannot be created
fn main() -> Result<()> {
    let _guard = qrstudio::logging::setup_logging("logs", "qrstudio", false, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(4)
        .thread_name("qrstudio-worker")
        .build()?;

    let config_manager = ConfigManager::new("QrStudio Data")?;
    let config = config_manager.load()?;

    let store = OptionsStore::new(runtime.handle().clone());
    store.load_from_config(&config)?;
    tracing::info!("Settings loaded into the store");

    let metrics = Arc::new(Metrics::new());
    let exporter = ExportService::new(config.settings.output_dir.as_str())?;
    let pipeline = GeneratorPipeline::new(store, exporter, Arc::clone(&metrics));

    match pipeline.refresh() {
        Generation::Idle => {
            tracing::warn!("No content configured; nothing to export");
        }
        Generation::TooLong { length, capacity } => {
            tracing::error!(
                "Content exceeds capacity ({} > {}); exports are disabled",
                length,
                capacity
            );
        }
        Generation::Fallback { fault, .. } => {
            tracing::error!("Encoder fault ({}); exports are disabled", fault);
        }
        Generation::Symbol(symbol) => {
            tracing::info!(
                "Symbol ready: {}x{} modules at {}px",
                symbol.modules,
                symbol.modules,
                symbol.module_size
            );

            runtime.block_on(async {
                for name in &config.settings.formats {
                    let format: ExportFormat = match name.parse() {
                        Ok(format) => format,
                        Err(error) => {
                            tracing::warn!("Skipping configured format: {}", error);
                            continue;
                        }
                    };

                    match pipeline.export(format).await {
                        Ok(path) => tracing::info!("Exported {} -> {}", format, path),
                        Err(error) => tracing::error!("Export {} failed: {}", format, error),
                    }
                }
            });
        }
    }

    config_manager.save(&config)?;

    metrics.log_summary();
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    Ok(())
}
