/*!
 * FilmFrame - Camera Metadata Frames for Photographs
 *
 * Expands a photo with a white border and writes its capture data into the
 * bottom band: camera model and lens on the left, focal length, aperture,
 * shutter speed and ISO on the right next to a brand logo, date underneath.
 *
 * Data flow:
 * - `metadata`: EXIF block -> `PhotoMetadata`
 * - `format`: `PhotoMetadata` -> display strings
 * - `layout`: source dimensions -> `LayoutGeometry`
 * - `compositor`: pixels + strings + geometry + logo -> `RenderedWatermark`
 * - `pipeline`: files on disk, output naming, batch processing
 * - `preview`: cancellable in-memory previews for interactive front-ends
 */

pub mod compositor;
pub mod config;
pub mod error;
pub mod format;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod preview;
pub mod text;

pub use compositor::{Compositor, FramePalette, RenderedWatermark, WatermarkText};
pub use config::{FontPreference, WatermarkStyle};
pub use error::{Result, WatermarkError};
pub use layout::LayoutGeometry;
pub use metadata::PhotoMetadata;
pub use pipeline::{output_path, Pipeline, RenderOutcome};
pub use preview::{PreviewRenderer, PreviewStatus};
pub use text::{FontCatalog, FontSource, TextExtent, TextRenderer};
