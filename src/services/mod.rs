//! Services module - Pure business logic for the QR generation pipeline.
//!
//! This module contains the core logic for turning a committed configuration
//! into a vector symbol and exported artifacts. The services are
//! **framework-agnostic** and have no dependencies on any UI layer, making
//! them testable and reusable.
//!
//! # Components
//!
//! - [`SymbolEncoder`] / [`QrSymbolEncoder`]: The seam to the external QR
//!   encoder. Produces [`RenderedSymbol`] SVG markup from a configuration,
//!   applying the styling, logo overlay, and module excavation. Faults are
//!   reported as [`EncoderFault`] and never propagate past the pipeline.
//!
//! - [`ExportService`]: Converts a rendered symbol into artifact bytes and
//!   delivers them to disk:
//!   - SVG: committed markup verbatim, lossless and deterministic
//!   - PNG: rasterized at exactly the configured module size; background
//!     pre-fill only when the configured color has any opacity
//!   - JPEG: same raster chain with a mandatory background fill (opaque
//!     white when the configured color is transparent)
//!
//! - [`GeneratorPipeline`]: The reactive orchestrator. Re-derives the
//!   current [`Generation`] on every committed change, running the capacity
//!   guard strictly before the encoder and gating export on the result.
//!
//! # Design Philosophy
//!
//! The services layer is designed to be:
//! - **Pure**: No side effects beyond artifact delivery
//! - **Isolated**: Encoder faults become the fallback symbol, never a crash
//! - **Re-entrant**: Each export call owns its vector tree and pixel surface
//! - **Framework-agnostic**: No UI code, only pipeline logic

pub mod encoder;
pub mod export;
pub mod pipeline;

pub use encoder::{
    EncoderFault, QUIET_ZONE_MODULES, QrSymbolEncoder, RenderedSymbol, SymbolEncoder,
    fallback_symbol,
};
pub use export::{ExportArtifact, ExportError, ExportFormat, ExportService};
pub use pipeline::{Generation, GeneratorPipeline};
