use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::color::Color;
use crate::models::logo::LogoSource;

/// Module size bounds in pixels. The raster surface is allocated at exactly
/// this edge length, so the upper bound also caps export memory.
pub const MIN_MODULE_SIZE: u32 = 64;
pub const MAX_MODULE_SIZE: u32 = 2048;
pub const MODULE_SIZE_STEP: u32 = 8;

/// QR error-correction level: redundancy traded against data capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EccLevel {
    L,
    M,
    Q,
    H,
}

impl EccLevel {
    pub const ALL: [Self; 4] = [Self::L, Self::M, Self::Q, Self::H];
}

impl Default for EccLevel {
    fn default() -> Self {
        Self::M
    }
}

impl fmt::Display for EccLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(letter)
    }
}

impl FromStr for EccLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(Self::L),
            "M" => Ok(Self::M),
            "Q" => Ok(Self::Q),
            "H" => Ok(Self::H),
            other => Err(format!("unknown error-correction level: {other:?}")),
        }
    }
}

/// Snap a requested module size to the step grid and clamp it into range.
///
/// Mirrors the resolution slider: any input resolves to a valid size rather
/// than an error.
pub fn clamp_module_size(requested: u32) -> u32 {
    let snapped =
        requested.saturating_add(MODULE_SIZE_STEP / 2) / MODULE_SIZE_STEP * MODULE_SIZE_STEP;
    snapped.clamp(MIN_MODULE_SIZE, MAX_MODULE_SIZE)
}

/// One complete QR generator configuration.
///
/// Owned by [`crate::state::OptionsStore`]; consumers receive cloned
/// snapshots and mutate only through the store's setter operations.
#[derive(Debug, Clone, PartialEq)]
pub struct QrOptions {
    pub content: String,
    pub module_size: u32,
    pub foreground: Color,
    pub background: Color,
    pub level: EccLevel,
    pub logo: LogoSource,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            content: String::new(),
            module_size: 512,
            foreground: Color::BLACK,
            background: Color::WHITE,
            level: EccLevel::M,
            logo: LogoSource::None,
        }
    }
}

impl QrOptions {
    /// Export is meaningless without content; the empty state renders
    /// nothing and disables delivery.
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}
