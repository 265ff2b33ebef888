//! Data models for the QR Studio application.
//!
//! This module contains the core data structures used throughout the
//! application:
//! - [`QrOptions`]: One complete generator configuration (content, size, colors, level, logo)
//! - [`Color`]: RGBA color parsed from hex strings with optional alpha
//! - [`LogoSource`]: Tagged union over the uploaded-file / remote-URL logo sources
//! - [`StudioConfig`]: Persisted user settings loaded from `QrStudio.yaml`
//! - [`capacity`]: The fixed per-level capacity table and the too-long guard
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: Config structs derive `Serialize`/`Deserialize` for YAML persistence
//! - **Cloneable**: [`QrOptions`] snapshots are cloned out of [`OptionsStore`](crate::state::OptionsStore)
//! - **Immutable**: Mutations go through the store's setter operations, never in place

pub mod capacity;
pub mod color;
pub mod config;
pub mod logo;
pub mod options;

pub use color::{Color, ColorParseError};
pub use config::{StudioConfig, StudioSettings};
pub use logo::{LOGO_RELATIVE_SIZE, LogoError, LogoSource};
pub use options::{
    EccLevel, MAX_MODULE_SIZE, MIN_MODULE_SIZE, MODULE_SIZE_STEP, QrOptions, clamp_module_size,
};
