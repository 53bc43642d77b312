//! Font handles and text drawing.
//!
//! The compositor measures and draws through [`TextRenderer`] so layout can
//! be exercised without a font file. [`RustTypeFace`] is the real renderer;
//! [`FontCatalog`] turns a family name into one.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use log::debug;
use rusttype::{Font, Scale};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, WatermarkError};

/// Font file extensions the catalog considers
const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

/// Pixel extent of a rendered string
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

/// Measures and draws a single line of text
///
/// `draw` places the top-left corner of the line box at `(x, y)`; the box
/// has the size reported by `measure` for the same text and size.
pub trait TextRenderer: Send + Sync {
    fn measure(&self, text: &str, size: f32) -> TextExtent;

    fn draw(&self, canvas: &mut RgbaImage, text: &str, size: f32, x: i32, y: i32, color: Rgba<u8>);
}

/// Resolves a font family name to a renderer
pub trait FontSource: Send + Sync {
    fn resolve(&self, family: &str) -> Result<Arc<dyn TextRenderer>>;
}

/// A parsed TrueType/OpenType face
pub struct RustTypeFace {
    font: Font<'static>,
}

impl RustTypeFace {
    /// Parses font data already loaded in memory
    pub fn from_bytes(data: Vec<u8>, origin: &Path) -> Result<Self> {
        let font = Font::try_from_vec(data).ok_or_else(|| WatermarkError::InvalidFont {
            path: origin.to_path_buf(),
        })?;
        Ok(RustTypeFace { font })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| WatermarkError::io(path, e))?;
        Self::from_bytes(data, path)
    }
}

impl TextRenderer for RustTypeFace {
    fn measure(&self, text: &str, size: f32) -> TextExtent {
        let (width, height) = text_size(Scale::uniform(size), &self.font, text);
        TextExtent {
            width: width.max(0) as f32,
            height: height.max(0) as f32,
        }
    }

    fn draw(&self, canvas: &mut RgbaImage, text: &str, size: f32, x: i32, y: i32, color: Rgba<u8>) {
        draw_text_mut(canvas, color, x, y, Scale::uniform(size), &self.font, text);
    }
}

/// Caller-supplied set of font files
///
/// The OS font collection is never enumerated: a family is looked up among
/// the files given explicitly and the fonts found directly inside the given
/// directories. A pinned file is used whatever family is asked for.
#[derive(Debug, Clone, Default)]
pub struct FontCatalog {
    pinned: Option<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl FontCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always render with this font file
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pinned = Some(path.into());
        self
    }

    /// Look families up among the fonts of this directory
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    /// Finds the file providing `family`
    ///
    /// # Returns
    /// * `Ok(path)` of the pinned file, or the first font (sorted by path)
    ///   whose file stem matches the family, ignoring case, spaces, `-` and `_`
    /// * `Err(WatermarkError::MissingFont)` when nothing matches
    pub fn locate(&self, family: &str) -> Result<PathBuf> {
        if let Some(path) = &self.pinned {
            return Ok(path.clone());
        }

        let wanted = family_key(family);
        for dir in &self.dirs {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!("Skipping font directory {}: {}", dir.display(), e);
                    continue;
                }
            };
            let mut candidates: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| is_font_file(path))
                .collect();
            candidates.sort();

            if let Some(found) = candidates.into_iter().find(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| family_key(stem) == wanted)
            }) {
                return Ok(found);
            }
        }

        Err(WatermarkError::MissingFont {
            family: family.to_string(),
        })
    }
}

impl FontSource for FontCatalog {
    fn resolve(&self, family: &str) -> Result<Arc<dyn TextRenderer>> {
        let path = self.locate(family)?;
        debug!("Font family '{}' resolved to {}", family, path.display());
        Ok(Arc::new(RustTypeFace::from_file(&path)?))
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| FONT_EXTENSIONS.iter().any(|f| f.eq_ignore_ascii_case(ext)))
}

fn family_key(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_family_key() {
        assert_eq!(family_key("Arial Unicode MS"), "arialunicodems");
        assert_eq!(family_key("arial-unicode_ms"), "arialunicodems");
    }

    #[test]
    fn test_locate_by_stem() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Noto-Sans.ttf"), b"x").unwrap();
        fs::write(dir.path().join("Inter.otf"), b"x").unwrap();
        fs::write(dir.path().join("Inter.txt"), b"x").unwrap();

        let catalog = FontCatalog::new().with_dir(dir.path());
        assert_eq!(catalog.locate("noto sans").unwrap(), dir.path().join("Noto-Sans.ttf"));
        assert_eq!(catalog.locate("INTER").unwrap(), dir.path().join("Inter.otf"));
    }

    #[test]
    fn test_missing_family() {
        let dir = TempDir::new().unwrap();
        let catalog = FontCatalog::new()
            .with_dir(dir.path())
            .with_dir(dir.path().join("does-not-exist"));
        match catalog.resolve("Helvetica") {
            Err(WatermarkError::MissingFont { family }) => assert_eq!(family, "Helvetica"),
            other => panic!("expected MissingFont, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_pinned_file_wins() {
        let catalog = FontCatalog::new()
            .with_file("/fonts/custom.ttf")
            .with_dir("/fonts");
        assert_eq!(catalog.locate("anything").unwrap(), PathBuf::from("/fonts/custom.ttf"));
    }

    /// A real font for the rusttype tests: `FILMFRAME_TEST_FONT`, else a
    /// common system font. Tests using it are skipped when neither exists.
    fn system_font() -> Option<RustTypeFace> {
        let candidates = std::env::var_os("FILMFRAME_TEST_FONT")
            .map(PathBuf::from)
            .into_iter()
            .chain([
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
                PathBuf::from("/usr/share/fonts/TTF/DejaVuSans.ttf"),
                PathBuf::from("/Library/Fonts/Arial Unicode.ttf"),
                PathBuf::from("C:\\Windows\\Fonts\\arial.ttf"),
            ]);
        for path in candidates {
            if path.is_file() {
                return RustTypeFace::from_file(&path).ok();
            }
        }
        eprintln!("no font file available, skipping");
        None
    }

    #[test]
    fn test_rusttype_measure() {
        let Some(face) = system_font() else { return };

        let short = face.measure("f/1.8", 20.0);
        let long = face.measure("35mm  f/1.8  1/200s  ISO400", 20.0);
        assert!(short.width > 0.0 && short.height > 0.0);
        assert!(long.width > short.width);
        assert!(face.measure("ISO400", 40.0).width > face.measure("ISO400", 20.0).width);
        assert_eq!(face.measure("", 20.0).width, 0.0);
    }

    #[test]
    fn test_rusttype_draw_stays_near_measured_box() {
        let Some(face) = system_font() else { return };

        let white = Rgba([255, 255, 255, 255]);
        let mut canvas = RgbaImage::from_pixel(400, 120, white);
        let extent = face.measure("NIKON Z 5", 32.0);
        face.draw(&mut canvas, "NIKON Z 5", 32.0, 20, 30, Rgba([0, 0, 0, 255]));

        let inked: Vec<(u32, u32)> = canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| **p != white)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!inked.is_empty());

        // glyph overhang may stick out a couple of pixels
        let right = 20.0 + extent.width + 3.0;
        let bottom = 30.0 + extent.height + 3.0;
        for (x, y) in inked {
            assert!(x + 3 >= 20 && (x as f32) <= right, "x {} outside box", x);
            assert!(y + 3 >= 30 && (y as f32) <= bottom, "y {} outside box", y);
        }
    }

    #[test]
    fn test_garbage_font_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Broken.ttf");
        fs::write(&path, b"not a font").unwrap();
        let catalog = FontCatalog::new().with_dir(dir.path());
        assert!(matches!(
            catalog.resolve("Broken"),
            Err(WatermarkError::InvalidFont { .. })
        ));
    }
}
