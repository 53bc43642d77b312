// ============================================================================
// PIPELINE
// ============================================================================

use image::{DynamicImage, GenericImageView, RgbaImage};
use log::{debug, info, warn};
use std::fs;
use std::io::{self, Write};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Semaphore;

use crate::compositor::{Compositor, RenderedWatermark, WatermarkText};
use crate::config::WatermarkStyle;
use crate::error::{Result, WatermarkError};
use crate::layout::LayoutGeometry;
use crate::metadata::PhotoMetadata;
use crate::text::FontSource;

/// Extensions picked up when a directory is given as input
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// Suffix appended to the source directory name
const OUTPUT_DIR_SUFFIX: &str = "_watermark";

/// Result of one batch item
#[derive(Debug)]
pub struct RenderOutcome {
    pub input: PathBuf,
    /// Path of the written frame, or why this item failed
    pub result: Result<PathBuf>,
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// A decoded source together with its capture metadata
pub struct SourcePhoto {
    pub image: DynamicImage,
    pub metadata: PhotoMetadata,
}

impl SourcePhoto {
    /// Reads and decodes a photo
    ///
    /// # Returns
    /// * `Err(WatermarkError::Io)` when the file cannot be read
    /// * `Err(WatermarkError::Decode)` when the pixels cannot be decoded
    ///
    /// A missing or broken EXIF block never fails the load.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| WatermarkError::io(path, e))?;
        let image = image::load_from_memory(&data).map_err(|e| WatermarkError::decode(path, e))?;
        let metadata = PhotoMetadata::from_bytes(&data);
        debug!("Loaded {} ({}x{}): {:?}", path.display(), image.width(), image.height(), metadata);
        Ok(SourcePhoto { image, metadata })
    }
}

/// Frames one decoded photo: format, lay out, composite
pub fn render_photo(compositor: &Compositor, photo: &SourcePhoto, style: &WatermarkStyle) -> RenderedWatermark {
    let (width, height) = photo.image.dimensions();
    let geometry = LayoutGeometry::compute(width, height);
    debug!("Geometry for {}x{}: {:?}", width, height, geometry);
    let text = WatermarkText::from_metadata(&photo.metadata, &style.date_format);
    compositor.render(&photo.image, &text, &geometry)
}

/// Derives where the frame of `input` is written
///
/// `<dir>/<name>.<ext>` becomes `<dir>_watermark/<name>.watermark.<ext>`.
/// Output is always JPEG: the source extension is kept for `jpg`/`jpeg`,
/// anything else gets `jpg`. `.` and `..` components are resolved first, so
/// `shoot/raw/../a.jpg` lands in `shoot_watermark`.
///
/// # Examples
/// ```
/// # use filmframe::pipeline::output_path;
/// # use std::path::Path;
/// let out = output_path(Path::new("/photos/trip/DSC_0042.JPG")).unwrap();
/// assert_eq!(out, Path::new("/photos/trip_watermark/DSC_0042.watermark.JPG"));
///
/// let out = output_path(Path::new("/photos/trip/scan.png")).unwrap();
/// assert_eq!(out, Path::new("/photos/trip_watermark/scan.watermark.jpg"));
/// ```
pub fn output_path(input: &Path) -> Result<PathBuf> {
    let normalized = normalize_path(input);
    let input = normalized.as_path();
    let invalid = |msg: &str| WatermarkError::io(input, io::Error::new(io::ErrorKind::InvalidInput, msg.to_string()));

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| invalid("invalid file name"))?;

    let extension = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => ext,
        _ => "jpg",
    };

    let parent = input.parent().ok_or_else(|| invalid("no parent directory"))?;
    let dir_name = parent
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| invalid("parent directory has no usable name"))?;

    let output_dir = parent.with_file_name(format!("{}{}", dir_name, OUTPUT_DIR_SUFFIX));
    Ok(output_dir.join(format!("{}.watermark.{}", stem, extension)))
}

/// Resolves `.` and `..` components without touching the filesystem
///
/// A `..` that would climb above the start of a relative path is kept;
/// one above the root is dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Writes `data` next to `target` and renames it into place
///
/// A failed write leaves no partial file at `target`.
pub fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| WatermarkError::io(target, io::Error::new(io::ErrorKind::InvalidInput, "no parent directory")))?;
    fs::create_dir_all(dir).map_err(|e| WatermarkError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| WatermarkError::io(dir, e))?;
    tmp.write_all(data).map_err(|e| WatermarkError::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| WatermarkError::io(tmp.path(), e))?;
    tmp.persist(target).map_err(|e| WatermarkError::io(target, e.error))?;
    Ok(())
}

/// Expands directories into the image files they directly contain
///
/// Files are passed through untouched; directory contents are filtered by
/// [`IMAGE_EXTENSIONS`] and sorted.
pub fn collect_inputs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if !path.is_dir() {
            inputs.push(path.to_path_buf());
            continue;
        }

        let entries = fs::read_dir(path).map_err(|e| WatermarkError::io(path, e))?;
        let mut found: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_image_extension(p))
            .collect();
        found.sort();
        debug!("{} image(s) in {}", found.len(), path.display());
        inputs.extend(found);
    }
    Ok(inputs)
}

/// Output paths claimed by more than one input, with the inputs claiming them
///
/// `a.png` and `a.jpg` in one folder both become `a.watermark.jpg`; inputs
/// whose output cannot be derived are left to fail on their own.
pub fn colliding_outputs(inputs: &[PathBuf]) -> Vec<(PathBuf, Vec<PathBuf>)> {
    let mut claims: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
    let mut order = Vec::new();
    for input in inputs {
        let Ok(output) = output_path(input) else {
            continue;
        };
        let claimants = claims.entry(output.clone()).or_default();
        if claimants.is_empty() {
            order.push(output);
        }
        claimants.push(input.clone());
    }

    order
        .into_iter()
        .filter_map(|output| {
            let claimants = claims.remove(&output)?;
            (claimants.len() > 1).then_some((output, claimants))
        })
        .collect()
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

/// Decode, frame, encode and save a single photo
fn process_file(compositor: &Compositor, style: &WatermarkStyle, input: &Path) -> Result<PathBuf> {
    let photo = SourcePhoto::open(input)?;
    let rendered = render_photo(compositor, &photo, style);
    let encoded = rendered.encode_jpeg(style.jpeg_quality)?;
    drop(rendered);

    let output = output_path(input)?;
    write_atomic(&output, &encoded)?;
    info!("Saved watermarked image to: {}", output.display());
    Ok(output)
}

/// Entry point for framing photos on disk
///
/// Holds the font source, the logo and the style; the font family is chosen
/// per call and resolved once before any photo is touched.
pub struct Pipeline {
    fonts: Arc<dyn FontSource>,
    logo: Arc<RgbaImage>,
    style: Arc<WatermarkStyle>,
    max_parallel: usize,
}

impl Pipeline {
    pub fn new(fonts: Arc<dyn FontSource>, logo: RgbaImage, style: WatermarkStyle) -> Result<Self> {
        let style = style.validated()?;
        let max_parallel = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Ok(Pipeline {
            fonts,
            logo: Arc::new(logo),
            style: Arc::new(style),
            max_parallel,
        })
    }

    /// Caps how many photos are processed at the same time
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn style(&self) -> &WatermarkStyle {
        &self.style
    }

    /// Builds a compositor for a font family
    ///
    /// # Returns
    /// * `Err(WatermarkError::MissingFont)` when the family cannot be resolved
    pub fn compositor(&self, family: &str) -> Result<Compositor> {
        let renderer = self.fonts.resolve(family)?;
        Ok(Compositor::new(renderer, self.logo.clone(), self.style.palette()?))
    }

    /// Frames one photo and writes it to its derived output path
    pub fn render_one(&self, input: &Path, family: &str) -> Result<PathBuf> {
        let compositor = self.compositor(family)?;
        process_file(&compositor, &self.style, input)
    }

    /// Frames every photo independently, in parallel
    ///
    /// # Returns
    /// * `Err` only when the font family cannot be resolved; nothing is processed then
    /// * `Ok(outcomes)` otherwise, one per input in submission order, each
    ///   carrying its own success or failure
    pub async fn render_batch(&self, inputs: Vec<PathBuf>, family: &str) -> Result<Vec<RenderOutcome>> {
        let compositor = Arc::new(self.compositor(family)?);
        let permits = Arc::new(Semaphore::new(self.max_parallel));
        info!("Processing {} image(s)...", inputs.len());
        for (output, claimants) in colliding_outputs(&inputs) {
            let names: Vec<_> = claimants.iter().map(|p| p.display().to_string()).collect();
            warn!("{} inputs write {}, only one will survive: {}", names.len(), output.display(), names.join(", "));
        }

        let handles: Vec<_> = inputs
            .iter()
            .cloned()
            .map(|input| {
                let compositor = compositor.clone();
                let style = self.style.clone();
                let permits = permits.clone();
                tokio::spawn(async move {
                    let _permit = match permits.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => return Err(WatermarkError::Task(e.to_string())),
                    };
                    match tokio::task::spawn_blocking(move || process_file(&compositor, &style, &input)).await {
                        Ok(result) => result,
                        Err(e) => Err(WatermarkError::Task(e.to_string())),
                    }
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (input, handle) in inputs.into_iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(WatermarkError::Task(e.to_string())),
            };
            if let Err(e) = &result {
                warn!("Error processing {}: {}", input.display(), e);
            }
            outcomes.push(RenderOutcome { input, result });
        }

        Ok(outcomes)
    }
}
