//! Adaptive border geometry.
//!
//! Every margin is a fraction of the source *height*, left and right
//! included, so portrait and landscape frames get the same visual weight.
//! The bottom band is larger because it hosts two text lines and the logo.

/// Side and top margins, as a fraction of the image height
pub const SIDE_PADDING_RATIO: f64 = 0.015;
/// Bottom band, as a fraction of the image height
pub const BOTTOM_PADDING_RATIO: f64 = 0.08;
/// Image height divided by this gives the primary font size in pixels
pub const FONT_SIZE_DIVISOR: u32 = 56;
/// Lens line font size relative to the primary size
pub const SECONDARY_FONT_SCALE: f32 = 0.8;
/// Date line font size relative to the primary size
pub const DATE_FONT_SCALE: f32 = 0.75;

/// Geometry of one watermarked frame
///
/// Pure function of the source dimensions: identical inputs always give
/// identical geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutGeometry {
    pub image_width: u32,
    pub image_height: u32,
    pub padding_left: u32,
    pub padding_right: u32,
    pub padding_top: u32,
    pub padding_bottom: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Model and summary lines
    pub primary_font_size: f32,
    /// Lens line
    pub secondary_font_size: f32,
    /// Capture date line
    pub date_font_size: f32,
}

impl LayoutGeometry {
    /// Ratio between the bottom band and the side margins before rounding
    pub const BOTTOM_TO_SIDE_RATIO: f64 = BOTTOM_PADDING_RATIO / SIDE_PADDING_RATIO;

    /// Computes the frame geometry for a source of the given size
    ///
    /// # Arguments
    /// * `image_width` - Source width in pixels
    /// * `image_height` - Source height in pixels
    ///
    /// # Calculation Logic
    /// - Left, right, top: `round(height * 0.015)`
    /// - Bottom: `round(height * 0.08)`
    /// - Primary font: `height / 56` (integer division)
    pub fn compute(image_width: u32, image_height: u32) -> Self {
        let side = scaled_padding(image_height, SIDE_PADDING_RATIO);
        let bottom = scaled_padding(image_height, BOTTOM_PADDING_RATIO);

        let primary_font_size = (image_height / FONT_SIZE_DIVISOR) as f32;

        LayoutGeometry {
            image_width,
            image_height,
            padding_left: side,
            padding_right: side,
            padding_top: side,
            padding_bottom: bottom,
            canvas_width: image_width + side * 2,
            canvas_height: image_height + side + bottom,
            primary_font_size,
            secondary_font_size: primary_font_size * SECONDARY_FONT_SCALE,
            date_font_size: primary_font_size * DATE_FONT_SCALE,
        }
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    /// Top-left corner of the source image inside the canvas
    pub fn image_origin(&self) -> (u32, u32) {
        (self.padding_left, self.padding_top)
    }

    /// Vertical middle of the bottom band
    pub fn bottom_band_center(&self) -> f32 {
        self.canvas_height as f32 - self.padding_bottom as f32 / 2.0
    }

    /// Edge length of the logo, two thirds of the bottom band
    ///
    /// Halves round up, like the paddings.
    pub fn logo_edge(&self) -> u32 {
        (self.padding_bottom as f32 / 1.5).round() as u32
    }

    /// Right edge of the text area, where the summary line ends
    pub fn text_right_edge(&self) -> f32 {
        (self.canvas_width - self.padding_right) as f32
    }
}

/// `round(height * ratio)` with halves rounded up, computed in integers so
/// exact halves such as `1500 * 0.015` do not depend on float representation
fn scaled_padding(image_height: u32, ratio: f64) -> u32 {
    let per_mille = (ratio * 1000.0).round() as u64;
    ((image_height as u64 * per_mille + 500) / 1000) as u32
}
