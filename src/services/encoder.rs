use qrcode::{EcLevel, QrCode};
use thiserror::Error;

use crate::models::{EccLevel, LOGO_RELATIVE_SIZE, QrOptions};

/// Quiet zone width in modules around the symbol, per the QR standard.
pub const QUIET_ZONE_MODULES: u32 = 4;

/// The vector representation of an encoded symbol.
///
/// Recomputed whenever the committed configuration changes and discarded
/// when superseded; every export derives from this markup, never from any
/// display surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSymbol {
    /// Complete SVG markup, byte-deterministic for a given configuration.
    pub markup: String,

    /// Edge length in pixels of the rendered/rasterized output.
    pub module_size: u32,

    /// Matrix width in modules including the quiet zone; 0 for the
    /// non-scannable fallback symbol.
    pub modules: u32,
}

/// Unanticipated failure from the symbol encoder.
///
/// The capacity guard runs before the encoder, so anything surfacing here
/// is unexpected; callers substitute the fallback symbol instead of
/// propagating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncoderFault {
    #[error("encoder rejected the content: {0}")]
    Rejected(String),

    #[error("symbol matrix was malformed: {0}")]
    Malformed(String),
}

/// The seam to the external vector symbol encoder.
///
/// Kept as a trait so the reactive pipeline can be exercised with an
/// injected failing encoder; the production implementation wraps the
/// `qrcode` crate.
#[cfg_attr(test, mockall::automock)]
pub trait SymbolEncoder: Send + Sync {
    /// Encode a configuration that already passed the capacity guard.
    fn encode(&self, options: &QrOptions) -> Result<RenderedSymbol, EncoderFault>;
}

/// Production encoder backed by the `qrcode` crate.
///
/// The matrix-placement and error-correction algorithms live entirely in
/// the external crate; this type turns the resulting module matrix into
/// styled SVG markup with the logo overlay and excavation applied.
#[derive(Debug, Default)]
pub struct QrSymbolEncoder;

impl QrSymbolEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolEncoder for QrSymbolEncoder {
    fn encode(&self, options: &QrOptions) -> Result<RenderedSymbol, EncoderFault> {
        let level = match options.level {
            EccLevel::L => EcLevel::L,
            EccLevel::M => EcLevel::M,
            EccLevel::Q => EcLevel::Q,
            EccLevel::H => EcLevel::H,
        };

        let code = QrCode::with_error_correction_level(options.content.as_bytes(), level)
            .map_err(|e| EncoderFault::Rejected(e.to_string()))?;

        let width = code.width();
        let colors = code.to_colors();
        if colors.len() != width * width {
            return Err(EncoderFault::Malformed(format!(
                "matrix length {} does not match width {}",
                colors.len(),
                width
            )));
        }

        let markup = build_svg(options, width, &colors);
        let modules = width as u32 + 2 * QUIET_ZONE_MODULES;

        tracing::debug!(
            "Encoded {} chars at level {} into {}x{} modules",
            options.content.chars().count(),
            options.level,
            modules,
            modules
        );

        Ok(RenderedSymbol { markup, module_size: options.module_size, modules })
    }
}

/// The excavated cell range beneath the logo footprint, in view-box
/// coordinates (quiet zone included).
///
/// Whole cells intersecting the centered overlay rectangle are cleared so
/// the overlay never paints over a live module edge.
fn excavated_range(dimension: u32) -> (f64, f64, i64, i64) {
    let span = f64::from(dimension) * LOGO_RELATIVE_SIZE;
    let origin = (f64::from(dimension) - span) / 2.0;
    let first = origin.floor() as i64;
    let last = (origin + span).ceil() as i64;
    (origin, span, first, last)
}

/// Build the SVG markup for an encoded matrix.
///
/// One path element carries every dark module; the background rectangle is
/// emitted only when the background has any opacity, so a transparent
/// configuration yields transparent markup.
fn build_svg(options: &QrOptions, width: usize, colors: &[qrcode::Color]) -> String {
    let border = QUIET_ZONE_MODULES as i64;
    let dimension = width as u32 + 2 * QUIET_ZONE_MODULES;
    let (origin, span, first, last) = excavated_range(dimension);
    let excavate = options.logo.is_active();

    let mut markup = String::new();
    markup += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    markup += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" \
         viewBox=\"0 0 {dim} {dim}\" stroke=\"none\">\n",
        size = options.module_size,
        dim = dimension
    );

    if !options.background.is_transparent() {
        markup += &format!(
            "\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"{}/>\n",
            options.background.svg_fill(),
            opacity_attr(options.background.svg_opacity())
        );
    }

    markup += "\t<path d=\"";
    let mut first_module = true;
    for (y, row) in colors.chunks(width).enumerate() {
        for (x, module) in row.iter().enumerate() {
            if *module != qrcode::Color::Dark {
                continue;
            }
            let cx = x as i64 + border;
            let cy = y as i64 + border;
            if excavate && cx >= first && cx < last && cy >= first && cy < last {
                continue;
            }
            if !first_module {
                markup += " ";
            }
            first_module = false;
            markup += &format!("M{cx},{cy}h1v1h-1z");
        }
    }
    markup += &format!(
        "\" fill=\"{}\"{}/>\n",
        options.foreground.svg_fill(),
        opacity_attr(options.foreground.svg_opacity())
    );

    if let Some(href) = options.logo.href() {
        markup += &format!(
            "\t<image x=\"{origin}\" y=\"{origin}\" width=\"{span}\" height=\"{span}\" \
             href=\"{href}\"/>\n",
            origin = trim_float(origin),
            span = trim_float(span),
            href = xml_escape(href)
        );
    }

    markup += "</svg>\n";
    markup
}

/// The fixed "unable to render" symbol substituted on encoder faults.
///
/// Deliberately static: a framed cross with no dependence on the failing
/// configuration beyond the output size.
pub fn fallback_symbol(module_size: u32) -> RenderedSymbol {
    let mut markup = String::new();
    markup += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    markup += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" \
         viewBox=\"0 0 64 64\" stroke=\"none\">\n",
        size = module_size
    );
    markup += "\t<rect width=\"100%\" height=\"100%\" fill=\"#f4f4f5\"/>\n";
    markup += "\t<rect x=\"4\" y=\"4\" width=\"56\" height=\"56\" fill=\"none\" \
               stroke=\"#71717a\" stroke-width=\"2\"/>\n";
    markup += "\t<path d=\"M22,22 L42,42 M42,22 L22,42\" fill=\"none\" stroke=\"#71717a\" \
               stroke-width=\"4\" stroke-linecap=\"round\"/>\n";
    markup += "</svg>\n";

    RenderedSymbol { markup, module_size, modules: 0 }
}

fn opacity_attr(opacity: Option<f32>) -> String {
    match opacity {
        Some(value) => format!(" fill-opacity=\"{value:.4}\""),
        None => String::new(),
    }
}

/// Format a coordinate without a trailing `.0` for whole values.
fn trim_float(value: f64) -> String {
    if (value - value.round()).abs() < f64::EPSILON {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.2}")
    }
}

/// Minimal escaping for attribute values (URLs may carry ampersands).
fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
