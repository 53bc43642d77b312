//! Preview rendering for an interactive front-end.
//!
//! Every request takes a new generation number. A render only reaches the
//! watch channel if no newer request was made while it ran, so a slow
//! render for an old selection can never replace the preview of a newer one.

use image::imageops::FilterType;
use image::GenericImageView;
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Result, WatermarkError};
use crate::pipeline::{render_photo, Pipeline, SourcePhoto};

/// An encoded preview frame
#[derive(Debug, Clone)]
pub struct Preview {
    pub generation: u64,
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
    /// JPEG bytes
    pub jpeg: Vec<u8>,
}

/// What happened to a preview request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStatus {
    /// The preview was published on the channel
    Published(u64),
    /// A newer request arrived first; the result was dropped
    Superseded(u64),
}

/// Renders a downscaled frame in memory
///
/// The source is shrunk to at most `max_width` pixels wide, keeping its
/// aspect ratio, before the frame is laid out.
pub fn render_preview(pipeline: &Pipeline, input: &Path, family: &str, max_width: u32) -> Result<(u32, u32, Vec<u8>)> {
    let compositor = pipeline.compositor(family)?;
    let mut photo = SourcePhoto::open(input)?;

    let (width, height) = photo.image.dimensions();
    if width > max_width {
        let scaled_height = ((height as u64 * max_width as u64) / width as u64).max(1) as u32;
        photo.image = photo.image.resize_exact(max_width, scaled_height, FilterType::Triangle);
    }

    let rendered = render_photo(&compositor, &photo, pipeline.style());
    let (w, h) = rendered.dimensions();
    let jpeg = rendered.encode_jpeg(pipeline.style().jpeg_quality)?;
    Ok((w, h, jpeg))
}

/// Generation-keyed preview scheduler
pub struct PreviewRenderer {
    pipeline: Arc<Pipeline>,
    latest: Arc<AtomicU64>,
    sender: Arc<watch::Sender<Option<Arc<Preview>>>>,
}

impl PreviewRenderer {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let (sender, _) = watch::channel(None);
        PreviewRenderer {
            pipeline,
            latest: Arc::new(AtomicU64::new(0)),
            sender: Arc::new(sender),
        }
    }

    /// Channel carrying the most recent non-stale preview
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Preview>>> {
        self.sender.subscribe()
    }

    /// Generation of the most recent request
    pub fn current_generation(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Invalidates every in-flight request without starting a new one
    pub fn cancel(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Starts rendering a preview for a newly selected photo
    ///
    /// The generation is taken before this returns, so any request made
    /// earlier is already stale once this one exists.
    pub fn request(&self, input: impl Into<PathBuf>, family: impl Into<String>) -> JoinHandle<Result<PreviewStatus>> {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let input = input.into();
        let family = family.into();
        let pipeline = self.pipeline.clone();
        let latest = self.latest.clone();
        let sender = self.sender.clone();

        tokio::spawn(render_and_publish(pipeline, input, family, generation, latest, sender))
    }
}

/// Renders one preview request and publishes it unless it went stale
async fn render_and_publish(
    pipeline: Arc<Pipeline>,
    input: PathBuf,
    family: String,
    generation: u64,
    latest: Arc<AtomicU64>,
    sender: Arc<watch::Sender<Option<Arc<Preview>>>>,
) -> Result<PreviewStatus> {
    if latest.load(Ordering::SeqCst) != generation {
        debug!("Preview {} superseded before start", generation);
        return Ok(PreviewStatus::Superseded(generation));
    }

    let max_width = pipeline.style().preview_width;
    let source = input.clone();
    let (width, height, jpeg) =
        tokio::task::spawn_blocking(move || render_preview(&pipeline, &source, &family, max_width))
            .await
            .map_err(|e| WatermarkError::Task(e.to_string()))??;

    let preview = Arc::new(Preview {
        generation,
        source: input,
        width,
        height,
        jpeg,
    });

    // Checked under the channel lock so an older render can never
    // overwrite a newer one that finished first.
    let published = sender.send_if_modified(|slot| {
        let newer_shown = slot.as_ref().is_some_and(|p| p.generation >= generation);
        if newer_shown || latest.load(Ordering::SeqCst) != generation {
            return false;
        }
        *slot = Some(preview);
        true
    });

    if published {
        Ok(PreviewStatus::Published(generation))
    } else {
        debug!("Preview {} superseded, discarding", generation);
        Ok(PreviewStatus::Superseded(generation))
    }
}
