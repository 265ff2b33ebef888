use std::io::Cursor;
use std::str::FromStr;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use resvg::{tiny_skia, usvg};
use thiserror::Error;

use crate::models::Color;
use crate::services::encoder::RenderedSymbol;

/// The three supported artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
    Svg,
}

impl ExportFormat {
    pub const ALL: [Self; 3] = [Self::Png, Self::Jpeg, Self::Svg];

    /// Delivery filenames are fixed.
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Png => "qrcode.png",
            Self::Jpeg => "qrcode.jpeg",
            Self::Svg => "qrcode.svg",
        }
    }

    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Svg)
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "svg" => Ok(Self::Svg),
            other => Err(format!("unknown export format: {other:?}")),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Svg => "svg",
        };
        f.write_str(name)
    }
}

/// Errors from a single export invocation.
///
/// The first three variants gate export before any work starts; the rest
/// abort the parse/render/encode/deliver chain. No variant leaves a partial
/// file behind - delivery only happens after a fully successful encode.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("content exceeds capacity: {length} > {capacity}")]
    CapacityExceeded { length: usize, capacity: usize },

    #[error("nothing to export: content is empty")]
    EmptyContent,

    #[error("symbol failed to render; export is unavailable")]
    EncoderFault,

    #[error("vector markup could not be parsed: {0}")]
    InvalidMarkup(String),

    #[error("pixel surface allocation failed ({0}x{0})")]
    SurfaceAllocation(u32),

    #[error("bitmap encoding failed: {0}")]
    Encoding(String),

    #[error("artifact delivery failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One finished export artifact, created per request and discarded after
/// delivery.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub filename: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns a rendered symbol into artifact bytes and delivers them to disk.
///
/// Every export call is self-contained: it parses its own vector tree and
/// allocates its own pixel surface, so overlapping calls cannot corrupt one
/// another, and both resources are dropped on every exit path.
#[derive(Debug, Clone)]
pub struct ExportService {
    output_dir: Utf8PathBuf,
}

impl ExportService {
    /// Create an export service delivering into `output_dir`, creating the
    /// directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if !output_dir.exists() {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create output directory: {output_dir}"))?;
        }
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    /// Produce artifact bytes for a symbol without touching the filesystem.
    ///
    /// SVG is the committed markup verbatim; PNG and JPEG share the
    /// rasterization chain and differ only in the background rule and the
    /// alpha channel.
    pub fn render_artifact(
        &self,
        symbol: &RenderedSymbol,
        background: Color,
        format: ExportFormat,
    ) -> Result<ExportArtifact, ExportError> {
        let bytes = match format {
            ExportFormat::Svg => symbol.markup.clone().into_bytes(),
            ExportFormat::Png | ExportFormat::Jpeg => rasterize(symbol, background, format)?,
        };

        Ok(ExportArtifact { format, filename: format.filename(), bytes })
    }

    /// Render and deliver one artifact; returns the delivered path.
    pub async fn export(
        &self,
        symbol: &RenderedSymbol,
        background: Color,
        format: ExportFormat,
    ) -> Result<Utf8PathBuf, ExportError> {
        let artifact = self.render_artifact(symbol, background, format)?;
        let path = self.output_dir.join(artifact.filename);

        tokio::fs::write(&path, &artifact.bytes).await?;

        tracing::info!(
            "Delivered {} ({} bytes) to {}",
            artifact.filename,
            artifact.bytes.len(),
            path
        );
        Ok(path)
    }
}

/// The shared raster chain: parse the markup into a vector tree, pre-fill
/// the surface per the format's background rule, render, and encode.
///
/// The parsed tree and the pixmap are owned by this call alone and dropped
/// on every path out of it.
fn rasterize(
    symbol: &RenderedSymbol,
    background: Color,
    format: ExportFormat,
) -> Result<Vec<u8>, ExportError> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(&symbol.markup, &options)
        .map_err(|e| ExportError::InvalidMarkup(e.to_string()))?;

    let size = symbol.module_size;
    let mut pixmap =
        tiny_skia::Pixmap::new(size, size).ok_or(ExportError::SurfaceAllocation(size))?;

    match format {
        // JPEG has no alpha channel: an unset or transparent background
        // must become opaque white, never an undefined black fill.
        ExportFormat::Jpeg => {
            let fill = if background.is_transparent() { Color::WHITE } else { background };
            pixmap.fill(to_skia_color(fill));
        }
        ExportFormat::Png => {
            if !background.is_transparent() {
                pixmap.fill(to_skia_color(background));
            }
        }
        ExportFormat::Svg => unreachable!("svg export never rasterizes"),
    }

    let tree_width = tree.size().width();
    let scale = if tree_width > 0.0 { size as f32 / tree_width } else { 1.0 };
    resvg::render(&tree, tiny_skia::Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    encode_bitmap(&pixmap, size, format)
}

/// Encode the rendered surface into PNG or JPEG bytes via the `image`
/// crate, demultiplying the alpha the renderer premultiplied.
fn encode_bitmap(
    pixmap: &tiny_skia::Pixmap,
    size: u32,
    format: ExportFormat,
) -> Result<Vec<u8>, ExportError> {
    let mut rgba = image::RgbaImage::new(size, size);
    for (target, source) in rgba.pixels_mut().zip(pixmap.pixels().iter()) {
        let color = source.demultiply();
        *target = image::Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }

    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    let result = match format {
        ExportFormat::Png => {
            image::DynamicImage::ImageRgba8(rgba).write_to(&mut cursor, image::ImageFormat::Png)
        }
        ExportFormat::Jpeg => {
            // Alpha is dropped only after compositing onto the mandatory
            // background fill.
            let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();
            image::DynamicImage::ImageRgb8(rgb).write_to(&mut cursor, image::ImageFormat::Jpeg)
        }
        ExportFormat::Svg => unreachable!("svg export never rasterizes"),
    };
    result.map_err(|e| ExportError::Encoding(e.to_string()))?;

    Ok(bytes)
}

fn to_skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}
