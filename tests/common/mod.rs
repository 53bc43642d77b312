//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use filmframe::compositor::embedded_logo;
use filmframe::{FontSource, Pipeline, Result, TextExtent, TextRenderer, WatermarkError, WatermarkStyle};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Family name the fixture font source refuses to resolve
pub const MISSING_FAMILY: &str = "No Such Font";

/// Draws each string as a solid box, half the font size wide per character
pub struct BlockRenderer;

impl TextRenderer for BlockRenderer {
    fn measure(&self, text: &str, size: f32) -> TextExtent {
        TextExtent {
            width: (text.chars().count() as f32 * size * 0.5).round(),
            height: size.round(),
        }
    }

    fn draw(&self, canvas: &mut RgbaImage, text: &str, size: f32, x: i32, y: i32, color: Rgba<u8>) {
        let extent = self.measure(text, size);
        if extent.width >= 1.0 && extent.height >= 1.0 {
            draw_filled_rect_mut(
                canvas,
                Rect::at(x, y).of_size(extent.width as u32, extent.height as u32),
                color,
            );
        }
    }
}

/// Resolves every family to [`BlockRenderer`] except [`MISSING_FAMILY`]
pub struct BlockFonts;

impl FontSource for BlockFonts {
    fn resolve(&self, family: &str) -> Result<Arc<dyn TextRenderer>> {
        if family == MISSING_FAMILY {
            return Err(WatermarkError::MissingFont {
                family: family.to_string(),
            });
        }
        Ok(Arc::new(BlockRenderer))
    }
}

pub fn pipeline() -> Pipeline {
    Pipeline::new(Arc::new(BlockFonts), embedded_logo().unwrap(), WatermarkStyle::default()).unwrap()
}

pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8]))
}

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn rational(tag: Tag, num: u32, denom: u32) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![Rational { num, denom }]),
    }
}

/// TIFF-encoded EXIF block: 35mm, f/1.8, 1/200s, ISO 400
pub fn sample_exif() -> Vec<u8> {
    let fields = vec![
        ascii(Tag::Make, "NIKON CORPORATION"),
        ascii(Tag::Model, "NIKON Z5_2"),
        ascii(Tag::LensModel, "NIKKOR Z 35mm f/1.8 S"),
        rational(Tag::FocalLength, 35, 1),
        rational(Tag::FNumber, 18, 10),
        rational(Tag::ExposureTime, 1, 200),
        Field {
            tag: Tag::PhotographicSensitivity,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![400]),
        },
        ascii(Tag::DateTimeOriginal, "2024:05:03 14:22:11"),
    ];
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).unwrap();
    buf.into_inner()
}

/// Encodes a JPEG and splices an APP1 EXIF segment right after SOI
pub fn jpeg_with_exif(image: &RgbImage, tiff: &[u8]) -> Vec<u8> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 95)
        .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .unwrap();

    let payload_len = 2 + 6 + tiff.len();
    let mut out = Vec::with_capacity(jpeg.len() + payload_len + 2);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&(payload_len as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

pub fn write_jpeg_with_exif(path: &Path, image: &RgbImage) {
    std::fs::write(path, jpeg_with_exif(image, &sample_exif())).unwrap();
}

pub fn write_png(path: &Path, image: &RgbImage) {
    image.save(path).unwrap();
}
