//! Frame style configuration and the persisted font preference.

use chrono::format::{Item, StrftimeItems};
use image::Rgba;
use log::debug;
use palette::Srgb;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::compositor::FramePalette;
use crate::error::{Result, WatermarkError};

/// Default JPEG quality of saved frames
pub const DEFAULT_QUALITY: u8 = 98;
/// Default width previews are downscaled to before framing
pub const DEFAULT_PREVIEW_WIDTH: u32 = 800;
/// Font family used when nothing was ever selected
pub const DEFAULT_FONT_FAMILY: &str = "Arial Unicode MS";
/// File holding the last selected font family
pub const FONT_PREFERENCE_FILE: &str = "font.txt";

/// Look of a rendered frame
///
/// Loaded from a JSON file; every field is optional in the file.
///
/// ```json
/// { "secondary_color": "#707070", "jpeg_quality": 95 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkStyle {
    /// Border fill, `#rrggbb`
    pub background_color: String,
    /// Model and summary lines, `#rrggbb`
    pub primary_color: String,
    /// Lens and date lines, `#rrggbb`
    pub secondary_color: String,
    /// JPEG quality, 1..=100
    pub jpeg_quality: u8,
    /// chrono strftime pattern for the capture date
    pub date_format: String,
    /// Replacement for the embedded logo
    pub logo: Option<PathBuf>,
    pub preview_width: u32,
    /// Directories searched for font families
    pub font_dirs: Vec<PathBuf>,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        WatermarkStyle {
            background_color: "#ffffff".into(),
            primary_color: "#000000".into(),
            secondary_color: "#808080".into(),
            jpeg_quality: DEFAULT_QUALITY,
            date_format: "%Y-%m-%d %H:%M:%S".into(),
            logo: None,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            font_dirs: Vec::new(),
        }
    }
}

impl WatermarkStyle {
    /// Loads a style file, or the defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path).map_err(|e| WatermarkError::io(path, e))?;
        let style: WatermarkStyle = serde_json::from_str(&content)
            .map_err(|e| WatermarkError::config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded style from {}", path.display());
        style.validated()
    }

    /// Checks colors and the date pattern, clamps the quality into range
    pub fn validated(mut self) -> Result<Self> {
        self.palette()?;
        check_date_format(&self.date_format)?;
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if self.preview_width == 0 {
            return Err(WatermarkError::config("preview_width must be positive"));
        }
        Ok(self)
    }

    pub fn palette(&self) -> Result<FramePalette> {
        Ok(FramePalette {
            background: parse_color("background_color", &self.background_color)?,
            primary: parse_color("primary_color", &self.primary_color)?,
            secondary: parse_color("secondary_color", &self.secondary_color)?,
        })
    }
}

/// Rejects strftime patterns chrono cannot render
fn check_date_format(pattern: &str) -> Result<()> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(WatermarkError::config(format!("date_format {:?} is not a valid strftime pattern", pattern)));
    }
    Ok(())
}

fn parse_color(field: &str, value: &str) -> Result<Rgba<u8>> {
    let color: Srgb<u8> = value
        .trim()
        .parse()
        .map_err(|e| WatermarkError::config(format!("{} {:?}: {}", field, value, e)))?;
    Ok(Rgba([color.red, color.green, color.blue, 255]))
}

/// Last selected font family, kept as one line of text
///
/// Owned by the front-end: the pipeline only ever sees the resolved font.
#[derive(Debug, Clone)]
pub struct FontPreference {
    path: PathBuf,
}

impl FontPreference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FontPreference { path: path.into() }
    }

    /// Reads the stored family, falling back to [`DEFAULT_FONT_FAMILY`]
    pub fn load(&self) -> String {
        match fs::read_to_string(&self.path) {
            Ok(content) if !content.trim().is_empty() => content.trim().to_string(),
            Ok(_) => DEFAULT_FONT_FAMILY.to_string(),
            Err(e) => {
                debug!("No font preference at {}: {}", self.path.display(), e);
                DEFAULT_FONT_FAMILY.to_string()
            }
        }
    }

    pub fn save(&self, family: &str) -> Result<()> {
        fs::write(&self.path, family.trim()).map_err(|e| WatermarkError::io(&self.path, e))
    }
}

impl Default for FontPreference {
    fn default() -> Self {
        Self::new(FONT_PREFERENCE_FILE)
    }
}
