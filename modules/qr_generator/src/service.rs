use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

const MIN_MODULE_SIZE: u32 = 1;
const MAX_MODULE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("invalid color '{0}': expected #rrggbb")]
    InvalidColor(String),
    #[error("invalid module size {0}: must be between {MIN_MODULE_SIZE} and {MAX_MODULE_SIZE}")]
    InvalidSize(u32),
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("watermark image error: {0}")]
    Watermark(#[from] image::ImageError),
    #[error("PNG encoding failed: {0}")]
    Png(std::io::Error),
}

#[derive(Debug, Clone)]
pub struct QrRequest {
    pub data: String,
    /// `#rrggbb`; white when unset.
    pub background_color: Option<String>,
    /// `#rrggbb`; black when unset.
    pub fill_color: Option<String>,
    /// Pixels per QR module.
    pub size: u32,
}

/// Renders QR codes as PNG, with an optional centered watermark.
pub struct QrService {
    watermark: Option<RgbaImage>,
}

impl QrService {
    pub fn new(watermark_path: Option<&Path>) -> Result<Self, QrError> {
        let watermark = match watermark_path {
            Some(path) => Some(image::open(path)?.to_rgba8()),
            None => None,
        };
        Ok(Self { watermark })
    }

    pub fn render_png(&self, req: &QrRequest) -> Result<Vec<u8>, QrError> {
        let image = self.render(req)?;
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| match e {
                image::ImageError::IoError(io) => QrError::Png(io),
                other => QrError::Watermark(other),
            })?;
        Ok(buf.into_inner())
    }

    fn render(&self, req: &QrRequest) -> Result<RgbaImage, QrError> {
        if !(MIN_MODULE_SIZE..=MAX_MODULE_SIZE).contains(&req.size) {
            return Err(QrError::InvalidSize(req.size));
        }
        let background = parse_color(req.background_color.as_deref(), [0xff, 0xff, 0xff])?;
        let fill = parse_color(req.fill_color.as_deref(), [0x00, 0x00, 0x00])?;

        // Highest error-correction level so the centered watermark cannot
        // make the code unreadable.
        let code = QrCode::with_error_correction_level(req.data.as_bytes(), EcLevel::H)?;
        let modules = code.to_colors();
        let width = code.width() as u32;
        let border = req.size.div_ceil(5);

        let dim = (width + 2 * border) * req.size;
        let mut image = RgbaImage::from_pixel(dim, dim, background);
        for (i, module) in modules.iter().enumerate() {
            if *module != Color::Dark {
                continue;
            }
            let mx = (i as u32 % width + border) * req.size;
            let my = (i as u32 / width + border) * req.size;
            for y in my..my + req.size {
                for x in mx..mx + req.size {
                    image.put_pixel(x, y, fill);
                }
            }
        }

        if let Some(watermark) = &self.watermark {
            composite_watermark(&mut image, watermark);
        }
        Ok(image)
    }
}

/// Scale the watermark to a quarter of the code, clear a white box behind
/// it and alpha-blend it centered.
fn composite_watermark(image: &mut RgbaImage, watermark: &RgbaImage) {
    let (w, h) = (image.width() / 4, image.height() / 4);
    if w == 0 || h == 0 {
        return;
    }
    let scaled = imageops::resize(watermark, w, h, FilterType::Lanczos3);
    let x = (image.width() - w) / 2;
    let y = (image.height() - h) / 2;

    let white = RgbaImage::from_pixel(w, h, Rgba([0xff, 0xff, 0xff, 0xff]));
    imageops::replace(image, &white, x as i64, y as i64);
    imageops::overlay(image, &scaled, x as i64, y as i64);
}

fn parse_color(raw: Option<&str>, default: [u8; 3]) -> Result<Rgba<u8>, QrError> {
    let Some(raw) = raw else {
        return Ok(Rgba([default[0], default[1], default[2], 0xff]));
    };
    let hex = raw
        .strip_prefix('#')
        .ok_or_else(|| QrError::InvalidColor(raw.to_string()))?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(QrError::InvalidColor(raw.to_string()));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    match (channel(0), channel(2), channel(4)) {
        (Ok(r), Ok(g), Ok(b)) => Ok(Rgba([r, g, b, 0xff])),
        _ => Err(QrError::InvalidColor(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(data: &str) -> QrRequest {
        QrRequest {
            data: data.to_string(),
            background_color: None,
            fill_color: None,
            size: 10,
        }
    }

    #[test]
    fn output_is_a_decodable_png() {
        let service = QrService::new(None).unwrap();
        let png = service.render_png(&request("https://example.com")).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap();
        assert!(decoded.width() > 0);
        assert_eq!(decoded.width(), decoded.height());
    }

    #[test]
    fn custom_colors_are_applied() {
        let service = QrService::new(None).unwrap();
        let req = QrRequest {
            background_color: Some("#ff0000".into()),
            fill_color: Some("#0000ff".into()),
            ..request("colors")
        };
        let png = service.render_png(&req).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        // Corner is border, so it carries the background color.
        assert_eq!(*decoded.get_pixel(0, 0), Rgba([0xff, 0, 0, 0xff]));
    }

    #[test]
    fn malformed_color_is_rejected() {
        let service = QrService::new(None).unwrap();
        for raw in ["red", "#12345", "#gggggg", "123456"] {
            let req = QrRequest {
                fill_color: Some(raw.into()),
                ..request("x")
            };
            assert!(
                matches!(service.render_png(&req), Err(QrError::InvalidColor(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn out_of_range_size_is_rejected() {
        let service = QrService::new(None).unwrap();
        for size in [0, 51, 1000] {
            let req = QrRequest {
                size,
                ..request("x")
            };
            assert!(matches!(service.render_png(&req), Err(QrError::InvalidSize(_))));
        }
    }

    #[test]
    fn watermark_is_composited_at_the_center() {
        // A solid green 8x8 watermark.
        let tmp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        let wm = RgbaImage::from_pixel(8, 8, Rgba([0, 0xff, 0, 0xff]));
        wm.save_with_format(tmp.path(), ImageFormat::Png).unwrap();

        let service = QrService::new(Some(tmp.path())).unwrap();
        let png = service.render_png(&request("watermarked")).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        let center = *decoded.get_pixel(decoded.width() / 2, decoded.height() / 2);
        assert_eq!(center, Rgba([0, 0xff, 0, 0xff]));
    }

    #[test]
    fn missing_watermark_file_fails_construction() {
        assert!(QrService::new(Some(Path::new("/nonexistent/logo.png"))).is_err());
    }
}
