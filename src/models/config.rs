use serde::{Deserialize, Serialize};

/// User configuration from QrStudio.yaml
///
/// Holds the persisted generator settings and export preferences. Every
/// field defaults individually so a partial or missing file still loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    #[serde(rename = "QrStudio_Settings")]
    pub settings: StudioSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioSettings {
    #[serde(rename = "Content", default = "default_content")]
    pub content: String,

    #[serde(rename = "Module Size", default = "default_module_size")]
    pub module_size: u32,

    /// Hex color strings; parsed into typed colors when loaded into state.
    #[serde(rename = "Foreground", default = "default_foreground")]
    pub foreground: String,

    #[serde(rename = "Background", default = "default_background")]
    pub background: String,

    #[serde(rename = "Error Correction", default = "default_level")]
    pub level: String,

    #[serde(rename = "Logo URL", default)]
    pub logo_url: String,

    #[serde(rename = "Output Directory", default = "default_output_dir")]
    pub output_dir: String,

    #[serde(rename = "Export Formats", default = "default_formats")]
    pub formats: Vec<String>,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            content: default_content(),
            module_size: default_module_size(),
            foreground: default_foreground(),
            background: default_background(),
            level: default_level(),
            logo_url: String::new(),
            output_dir: default_output_dir(),
            formats: default_formats(),
            debug_mode: false,
        }
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self { settings: StudioSettings::default() }
    }
}

fn default_content() -> String {
    "https://example.com".to_string()
}

fn default_module_size() -> u32 {
    512
}

fn default_foreground() -> String {
    "#000000".to_string()
}

fn default_background() -> String {
    "#ffffff".to_string()
}

fn default_level() -> String {
    "M".to_string()
}

fn default_output_dir() -> String {
    "exports".to_string()
}

fn default_formats() -> Vec<String> {
    vec!["png".to_string(), "jpeg".to_string(), "svg".to_string()]
}
