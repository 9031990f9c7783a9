use crate::config::Color;
use crate::engine::{SymbolMatrix, SymbolOptions};

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

/*---- Utilities ----*/

/// Paints a symbol matrix onto a new RGBA surface of `options.width` x `options.height` pixels.
///
/// Each pixel takes the color of the module it falls into, so the symbol always fills the
/// whole surface regardless of how many modules it has. No quiet zone is added.
///
/// # Arguments
///
/// * `matrix` - The encoded symbol.
/// * `options` - Target size and the dark/light colors.
///
/// # Example
///
/// ```rust
/// use qirust_preview::config::WidgetConfig;
/// use qirust_preview::engine::{QrcodeEngine, SymbolEngine, SymbolOptions};
/// use qirust_preview::helper::draw_symbol;
///
/// let config = WidgetConfig::default();
/// let matrix = QrcodeEngine.encode("Hello, World!", config.correct_level).unwrap();
/// let options = SymbolOptions {
///     text: "Hello, World!".to_string(),
///     width: 200,
///     height: 200,
///     color_dark: config.color_dark,
///     color_light: config.color_light,
///     correct_level: config.correct_level,
/// };
/// let img = draw_symbol(&matrix, &options);
/// assert_eq!(img.dimensions(), (200, 200));
/// ```
pub fn draw_symbol(matrix: &SymbolMatrix, options: &SymbolOptions) -> RgbaImage {
    let count = matrix.width() as u64;
    let (width, height) = (options.width.max(1), options.height.max(1));
    let mut img = RgbaImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let qr_x = (x as u64 * count / width as u64) as i64;
        let qr_y = (y as u64 * count / height as u64) as i64;
        *pixel = if matrix.get(qr_x, qr_y) {
            Rgba(options.color_dark.rgba())
        } else {
            Rgba(options.color_light.rgba())
        };
    }

    img
}

/// Encodes an RGBA surface as PNG. Alpha is kept.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Encodes an opaque RGB image as JPEG with the given quality (1-100).
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    img.write_with_encoder(encoder)?;
    Ok(bytes)
}

/// Composites `img` over a solid `background` and drops the alpha channel.
///
/// Used before JPEG encoding, which has no transparency: translucent pixels are blended
/// with the background instead of keeping whatever color sits under a zero alpha.
pub fn flatten_onto(img: &RgbaImage, background: Color) -> RgbImage {
    let [br, bg, bb, _] = background.rgba();
    let mut out = RgbImage::new(img.width(), img.height());

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
        let alpha = a as u32;
        let blend = |fore: u8, back: u8| -> u8 {
            ((fore as u32 * alpha + back as u32 * (255 - alpha) + 127) / 255) as u8
        };
        *pixel = Rgb([blend(r, br), blend(g, bg), blend(b, bb)]);
    }

    out
}

/// Returns the symbol as terminal block art, two characters per module.
///
/// # Arguments
///
/// * `matrix` - The encoded symbol.
/// * `border` - Quiet zone width in modules.
pub fn to_block_string(matrix: &SymbolMatrix, border: i64) -> String {
	let size = matrix.width() as i64;
	let mut result = String::new();
	for y in -border .. size + border {
		for x in -border .. size + border {
			let c: char = if matrix.get(x, y) { '█' } else { ' ' };
			result.push(c);
			result.push(c);
		}
		result.push('\n');
	}
	result
}
