// ============================================================================
// COMPOSITOR
// ============================================================================

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, Rgba, RgbImage, RgbaImage};
use log::debug;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, WatermarkError};
use crate::format::{format_exif_summary, normalize_model};
use crate::layout::LayoutGeometry;
use crate::metadata::PhotoMetadata;
use crate::text::{TextExtent, TextRenderer};

/// Brand mark embedded in the binary
const EMBEDDED_LOGO: &[u8] = include_bytes!("../assets/logo.png");

/// Vertical distance from the model line to the lens line, in model heights
const LENS_LINE_OFFSET: f32 = 1.6;
/// Vertical distance from the summary line to the date line, in summary heights
const DATE_LINE_OFFSET: f32 = 1.5;
/// Gap between the logo and the summary text, as a fraction of the logo width
const LOGO_GAP: f32 = 0.2;

/// Colors used when drawing a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePalette {
    pub background: Rgba<u8>,
    /// Model and summary lines
    pub primary: Rgba<u8>,
    /// Lens and date lines
    pub secondary: Rgba<u8>,
}

impl Default for FramePalette {
    fn default() -> Self {
        FramePalette {
            background: Rgba([255, 255, 255, 255]),
            primary: Rgba([0, 0, 0, 255]),
            secondary: Rgba([128, 128, 128, 255]),
        }
    }
}

/// The four strings drawn in the bottom band
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkText {
    pub model: String,
    pub lens: String,
    pub summary: String,
    /// Omitted from the frame when `None`
    pub date: Option<String>,
}

impl WatermarkText {
    /// Formats the display strings of a photo
    ///
    /// # Arguments
    /// * `metadata` - Extracted capture metadata
    /// * `date_format` - chrono strftime pattern for the capture date
    pub fn from_metadata(metadata: &PhotoMetadata, date_format: &str) -> Self {
        WatermarkText {
            model: normalize_model(&metadata.model),
            lens: metadata.lens_model.clone(),
            summary: format_exif_summary(metadata),
            date: metadata
                .capture_date
                .map(|date| date.format(date_format).to_string()),
        }
    }
}

/// Top-left position of a measured text line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedText {
    pub x: i32,
    pub y: i32,
    pub extent: TextExtent,
    pub size: f32,
}

/// Where the logo lands once resized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedLogo {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Positions of every element of the bottom band
///
/// Produced by measuring first; drawing only happens once the plan exists
/// because right alignment and vertical centering both need the measured boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub model: Option<PlacedText>,
    pub lens: Option<PlacedText>,
    pub summary: Option<PlacedText>,
    pub date: Option<PlacedText>,
    pub logo: Option<PlacedLogo>,
}

/// The finished raster, owned by whoever asked for the render
pub struct RenderedWatermark {
    image: RgbImage,
}

impl RenderedWatermark {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Serializes the frame as a baseline JPEG
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let (width, height) = self.image.dimensions();
        JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
            .encode(self.image.as_raw(), width, height, ColorType::Rgb8)
            .map_err(WatermarkError::Encode)?;
        Ok(buf)
    }
}

/// Decodes the brand mark compiled into the binary
pub fn embedded_logo() -> Result<RgbaImage> {
    let logo = image::load_from_memory(EMBEDDED_LOGO)
        .map_err(|e| WatermarkError::decode("<embedded logo>", e))?;
    Ok(logo.to_rgba8())
}

/// Loads a replacement logo from disk
pub fn load_logo(path: &Path) -> Result<RgbaImage> {
    let data = std::fs::read(path).map_err(|e| WatermarkError::io(path, e))?;
    let logo = image::load_from_memory(&data).map_err(|e| WatermarkError::decode(path, e))?;
    Ok(logo.to_rgba8())
}

/// Draws the frame around a photograph
///
/// Holds only read-only assets, so one compositor can serve concurrent renders.
pub struct Compositor {
    renderer: Arc<dyn TextRenderer>,
    logo: Arc<RgbaImage>,
    palette: FramePalette,
}

impl Compositor {
    pub fn new(renderer: Arc<dyn TextRenderer>, logo: Arc<RgbaImage>, palette: FramePalette) -> Self {
        Compositor {
            renderer,
            logo,
            palette,
        }
    }

    /// Measures every element and computes where it goes
    pub fn plan(&self, text: &WatermarkText, geometry: &LayoutGeometry) -> FramePlan {
        let band_center = geometry.bottom_band_center();

        let model = self.measure(&text.model, geometry.primary_font_size);
        let summary = self.measure(&text.summary, geometry.primary_font_size);

        // The summary shares the model line; fall back to its own height
        // when the model string is empty.
        let line_height = model
            .or(summary)
            .map(|e| e.height)
            .unwrap_or(geometry.primary_font_size);
        let first_line_center = band_center - line_height / 1.5;

        let model = model.map(|extent| {
            place_left(geometry.padding_left as f32, first_line_center, extent, geometry.primary_font_size)
        });

        let lens = self
            .measure(&text.lens, geometry.secondary_font_size)
            .map(|extent| {
                place_left(
                    geometry.padding_left as f32,
                    first_line_center + line_height * LENS_LINE_OFFSET,
                    extent,
                    geometry.secondary_font_size,
                )
            });

        let summary_left = summary
            .map(|e| geometry.text_right_edge() - e.width)
            .unwrap_or_else(|| geometry.text_right_edge());
        let summary_height = summary.map(|e| e.height).unwrap_or(line_height);
        let summary = summary.map(|extent| {
            place_left(summary_left, first_line_center, extent, geometry.primary_font_size)
        });

        let date = text
            .date
            .as_deref()
            .and_then(|date| self.measure(date, geometry.date_font_size))
            .map(|extent| {
                place_left(
                    summary_left,
                    first_line_center + summary_height * DATE_LINE_OFFSET,
                    extent,
                    geometry.date_font_size,
                )
            });

        let logo = self.place_logo(geometry, summary_left, band_center);

        FramePlan {
            model,
            lens,
            summary,
            date,
            logo,
        }
    }

    /// Renders the complete frame
    ///
    /// # Processing Steps
    /// 1. Fill a canvas of `geometry.canvas_size()` with the background
    /// 2. Copy the original, unscaled, at `(padding_left, padding_top)`
    /// 3. Measure and place the text lines and the logo
    /// 4. Draw them into the bottom band
    pub fn render(
        &self,
        original: &DynamicImage,
        text: &WatermarkText,
        geometry: &LayoutGeometry,
    ) -> RenderedWatermark {
        let (width, height) = geometry.canvas_size();
        let mut canvas = RgbaImage::from_pixel(width, height, self.palette.background);

        let (x, y) = geometry.image_origin();
        if original.color().has_alpha() {
            imageops::overlay(&mut canvas, &original.to_rgba8(), x as i64, y as i64);
        } else {
            imageops::replace(&mut canvas, &original.to_rgba8(), x as i64, y as i64);
        }

        let plan = self.plan(text, geometry);
        debug!("Frame plan for {}x{}: {:?}", width, height, plan);

        let lines = [
            (&plan.model, Some(text.model.as_str()), self.palette.primary),
            (&plan.lens, Some(text.lens.as_str()), self.palette.secondary),
            (&plan.summary, Some(text.summary.as_str()), self.palette.primary),
            (&plan.date, text.date.as_deref(), self.palette.secondary),
        ];
        for (placed, content, color) in lines {
            if let (Some(placed), Some(content)) = (placed, content) {
                self.renderer
                    .draw(&mut canvas, content, placed.size, placed.x, placed.y, color);
            }
        }

        if let Some(logo) = plan.logo {
            let resized = imageops::resize(&*self.logo, logo.width, logo.height, FilterType::Lanczos3);
            imageops::overlay(&mut canvas, &resized, logo.x, logo.y);
        }

        RenderedWatermark {
            image: DynamicImage::ImageRgba8(canvas).to_rgb8(),
        }
    }

    fn measure(&self, text: &str, size: f32) -> Option<TextExtent> {
        if text.is_empty() || size < 1.0 {
            return None;
        }
        Some(self.renderer.measure(text, size))
    }

    /// Logo scaled so its longer edge is two thirds of the bottom band,
    /// sitting left of the summary and centered on the band
    fn place_logo(&self, geometry: &LayoutGeometry, summary_left: f32, band_center: f32) -> Option<PlacedLogo> {
        let edge = geometry.logo_edge();
        let (logo_w, logo_h) = self.logo.dimensions();
        if edge == 0 || logo_w == 0 || logo_h == 0 {
            return None;
        }

        let longest = logo_w.max(logo_h) as f32;
        let width = ((logo_w as f32 * edge as f32 / longest).round() as u32).max(1);
        let height = ((logo_h as f32 * edge as f32 / longest).round() as u32).max(1);

        let x = summary_left - width as f32 * (1.0 + LOGO_GAP);
        let y = band_center - height as f32 / 2.0;

        Some(PlacedLogo {
            x: x.round() as i64,
            y: y.round() as i64,
            width,
            height,
        })
    }
}

/// Top-left corner of a line whose box is vertically centered on `center_y`
fn place_left(left: f32, center_y: f32, extent: TextExtent, size: f32) -> PlacedText {
    PlacedText {
        x: left.round() as i32,
        y: (center_y - extent.height / 2.0).round() as i32,
        extent,
        size,
    }
}
