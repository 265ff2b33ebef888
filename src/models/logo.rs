use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;

/// Overlay size relative to the module size. Fixed by design together with
/// excavation: a larger overlay, or one painted over live modules, breaks
/// scannability.
pub const LOGO_RELATIVE_SIZE: f64 = 0.20;

/// Errors from resolving an uploaded logo file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogoError {
    #[error("uploaded logo is empty")]
    Empty,

    #[error("unsupported logo type: {0} (png, jpeg and svg are accepted)")]
    UnsupportedType(String),
}

/// The active logo source.
///
/// A single tagged union rather than two optional fields: setting one
/// variant structurally clears the other, so the mutual-exclusivity
/// invariant cannot be violated by a missed write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogoSource {
    #[default]
    None,

    /// An uploaded file, held as a `data:` URI ready for SVG embedding.
    Uploaded { data_uri: String },

    /// A remote URL, embedded as-is. Fetching it is the rendering layer's
    /// concern; the export pipeline never performs network I/O.
    Remote { url: String },
}

impl LogoSource {
    /// Resolve uploaded bytes into a data URI source.
    ///
    /// The MIME type is sniffed from the bytes; png, jpeg and svg are
    /// accepted, everything else is rejected before it can reach a renderer.
    pub fn from_upload(bytes: &[u8]) -> Result<Self, LogoError> {
        if bytes.is_empty() {
            return Err(LogoError::Empty);
        }

        let mime = match infer::get(bytes) {
            Some(kind) if matches!(kind.mime_type(), "image/png" | "image/jpeg") => {
                kind.mime_type().to_string()
            }
            Some(kind) => return Err(LogoError::UnsupportedType(kind.mime_type().to_string())),
            None if looks_like_svg(bytes) => "image/svg+xml".to_string(),
            None => return Err(LogoError::UnsupportedType("unknown".to_string())),
        };

        let data_uri = format!("data:{};base64,{}", mime, BASE64.encode(bytes));
        Ok(Self::Uploaded { data_uri })
    }

    /// Resolve a remote URL source. An empty or blank URL resolves to `None`.
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            Self::None
        } else {
            Self::Remote { url: trimmed.to_string() }
        }
    }

    /// The embeddable `href` value, if a source is active.
    pub fn href(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Uploaded { data_uri } => Some(data_uri),
            Self::Remote { url } => Some(url),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_active(&self) -> bool {
        !self.is_none()
    }
}

/// SVG files carry no magic number; recognize them by their markup.
fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    match std::str::from_utf8(head) {
        Ok(text) => {
            let text = text.trim_start();
            text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
        }
        Err(_) => false,
    }
}
