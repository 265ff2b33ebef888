// QR Studio - QR code generation with logo overlay and multi-format export
//
// This is the library crate containing the configuration store, capacity
// guard, encoder seam and export pipeline. The binary crate (main.rs)
// provides the headless entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{Color, EccLevel, LogoSource, QrOptions, StudioConfig};
pub use services::{
    ExportError, ExportFormat, ExportService, Generation, GeneratorPipeline, RenderedSymbol,
};
pub use state::{OptionsStore, StateChange};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
