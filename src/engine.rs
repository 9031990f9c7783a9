//! The symbol engine seam.
//!
//! QR encoding is not done by this crate. A [`SymbolEngine`] turns text into a module
//! matrix, and [`SymbolEngine::render`] paints that matrix into one of the two rendering
//! primitives the pipeline knows how to read back: a raw pixel surface or an encoded image.
//! The stock engine is [`QrcodeEngine`], backed by the `qrcode` crate.

use crate::config::{Color, CorrectLevel, Primitive};
use crate::helper;
use image::RgbaImage;
use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode};
use thiserror::Error;

/// Errors returned by a symbol engine while encoding text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("text too long for the chosen error correction level")]
    DataTooLong,

    #[error("failed to encode image: {0}")]
    Image(String),

    #[error("{0}")]
    Other(String),
}

impl From<QrError> for EncodeError {
    fn from(err: QrError) -> Self {
        match err {
            QrError::DataTooLong => EncodeError::DataTooLong,
            other => EncodeError::Other(other.to_string()),
        }
    }
}

/// Options recognised by an engine, one per render.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolOptions {
    pub text: String,
    pub width: u32,
    pub height: u32,
    pub color_dark: Color,
    pub color_light: Color,
    pub correct_level: CorrectLevel,
}

/// A square grid of dark (`true`) and light modules, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMatrix {
    width: usize,
    modules: Vec<bool>,
}

impl SymbolMatrix {
    /// Builds a matrix from row-major modules.
    ///
    /// Returns `None` unless `modules` is `width * width` long.
    pub fn new(width: usize, modules: Vec<bool>) -> Option<Self> {
        (width > 0 && modules.len() == width * width).then_some(Self { width, modules })
    }

    /// Number of modules along one edge.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the module at (x, y). Coordinates outside the symbol are light.
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.width as i64 {
            return false;
        }
        self.modules[y as usize * self.width + x as usize]
    }
}

/// An encoded PNG, as an `img` element would hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// What an engine leaves behind in its target container.
#[derive(Debug, Clone)]
pub enum Rendered {
    Surface(RgbaImage),
    Element(EncodedImage),
}

impl Rendered {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Rendered::Surface(img) => img.dimensions(),
            Rendered::Element(img) => (img.width, img.height),
        }
    }

    /// Decodes the primitive back into RGBA pixels.
    pub fn to_rgba(&self) -> Result<RgbaImage, image::ImageError> {
        match self {
            Rendered::Surface(img) => Ok(img.clone()),
            Rendered::Element(img) => Ok(image::load_from_memory(&img.png)?.to_rgba8()),
        }
    }

    /// Returns the PNG bytes of the primitive, encoding a surface on demand.
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        match self {
            Rendered::Surface(img) => helper::encode_png(img),
            Rendered::Element(img) => Ok(img.png.clone()),
        }
    }
}

/// A loaded QR rendering capability.
pub trait SymbolEngine: Send + Sync {
    /// Short human readable name used in logs.
    fn name(&self) -> &str;

    /// Encodes `text` into a module matrix.
    fn encode(&self, text: &str, level: CorrectLevel) -> Result<SymbolMatrix, EncodeError>;

    /// Encodes and paints a symbol into the requested primitive.
    fn render(
        &self,
        options: &SymbolOptions,
        primitive: Primitive,
    ) -> Result<Rendered, EncodeError> {
        let matrix = self.encode(&options.text, options.correct_level)?;
        let surface = helper::draw_symbol(&matrix, options);
        match primitive {
            Primitive::Surface => Ok(Rendered::Surface(surface)),
            Primitive::Element => {
                let png = helper::encode_png(&surface)
                    .map_err(|e| EncodeError::Image(e.to_string()))?;
                Ok(Rendered::Element(EncodedImage {
                    width: surface.width(),
                    height: surface.height(),
                    png,
                }))
            }
        }
    }
}

/// Engine backed by the `qrcode` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrcodeEngine;

impl SymbolEngine for QrcodeEngine {
    fn name(&self) -> &str {
        "qrcode"
    }

    fn encode(&self, text: &str, level: CorrectLevel) -> Result<SymbolMatrix, EncodeError> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), ec_level(level))?;
        let modules = code
            .to_colors()
            .into_iter()
            .map(|color| color == qrcode::Color::Dark)
            .collect();
        SymbolMatrix::new(code.width(), modules)
            .ok_or_else(|| EncodeError::Other("engine returned a malformed matrix".to_string()))
    }
}

fn ec_level(level: CorrectLevel) -> EcLevel {
    match level {
        CorrectLevel::Low => EcLevel::L,
        CorrectLevel::Medium => EcLevel::M,
        CorrectLevel::Quartile => EcLevel::Q,
        CorrectLevel::High => EcLevel::H,
    }
}
