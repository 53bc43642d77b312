// ============================================================================
// CAPTURE METADATA
// ============================================================================

use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use log::{debug, warn};
use std::io::Cursor;

use crate::format::normalize_model;

/// Text pattern of the `DateTimeOriginal` tag
pub const CAPTURE_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Placeholder used when the camera or lens model is missing
pub const UNKNOWN: &str = "Unknown";

/// Canonical capture metadata of one photograph
///
/// Built once per image and never modified afterwards. Every field has a
/// default, so a photo without any EXIF block still yields a usable record.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoMetadata {
    /// Camera manufacturer, empty when absent
    pub make: String,
    /// Camera model after normalization
    pub model: String,
    /// Lens model
    pub lens_model: String,
    /// Focal length in millimeters
    pub focal_length_mm: f64,
    /// Aperture (f-number)
    pub f_number: f64,
    /// Exposure time in seconds, `0.0` when absent
    pub exposure_time_seconds: f64,
    /// ISO sensitivity, first value of `ISOSpeedRatings`
    pub iso_speed: u16,
    /// Date taken; never synthesized when the tag is missing or malformed
    pub capture_date: Option<NaiveDateTime>,
}

impl Default for PhotoMetadata {
    fn default() -> Self {
        PhotoMetadata {
            make: String::new(),
            model: UNKNOWN.to_string(),
            lens_model: UNKNOWN.to_string(),
            focal_length_mm: 0.0,
            f_number: 0.0,
            exposure_time_seconds: 0.0,
            iso_speed: 0,
            capture_date: None,
        }
    }
}

impl PhotoMetadata {
    /// Reads the EXIF container embedded in encoded image bytes
    ///
    /// A missing or unreadable EXIF block is not an error: the defaults are
    /// returned instead. Only the pixel decode can fail a render.
    pub fn from_bytes(data: &[u8]) -> Self {
        match Reader::new().read_from_container(&mut Cursor::new(data)) {
            Ok(exif) => Self::from_exif(Some(&exif)),
            Err(e) => {
                debug!("No usable EXIF block: {}", e);
                Self::from_exif(None)
            }
        }
    }

    /// Extracts the capture fields from a parsed EXIF block
    ///
    /// Each tag is looked up independently; a missing or mistyped tag keeps
    /// its default without affecting the others.
    pub fn from_exif(exif: Option<&Exif>) -> Self {
        let mut metadata = PhotoMetadata::default();
        let Some(exif) = exif else {
            return metadata;
        };

        if let Some(make) = ascii_field(exif, Tag::Make) {
            metadata.make = make;
        }
        if let Some(model) = ascii_field(exif, Tag::Model) {
            metadata.model = normalize_model(&model);
        }
        if let Some(lens) = ascii_field(exif, Tag::LensModel) {
            metadata.lens_model = lens;
        }
        if let Some(focal) = rational_field(exif, Tag::FocalLength) {
            metadata.focal_length_mm = focal;
        }
        if let Some(aperture) = rational_field(exif, Tag::FNumber) {
            metadata.f_number = aperture;
        }
        if let Some(exposure) = rational_field(exif, Tag::ExposureTime) {
            if exposure > 0.0 {
                metadata.exposure_time_seconds = exposure;
            }
        }
        // ISOSpeedRatings was renamed PhotographicSensitivity in Exif 2.3
        if let Some(iso) = exif
            .get_field(Tag::PhotographicSensitivity, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
        {
            metadata.iso_speed = iso.min(u16::MAX as u32) as u16;
        }
        if let Some(raw) = ascii_field(exif, Tag::DateTimeOriginal) {
            metadata.capture_date = parse_capture_date(&raw);
        }

        metadata
    }

    pub fn has_exposure_time(&self) -> bool {
        self.exposure_time_seconds > 0.0
    }
}

/// Parses `yyyy:MM:dd HH:mm:ss`; anything else leaves the date unset
pub fn parse_capture_date(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0' || c == '"');
    match NaiveDateTime::parse_from_str(trimmed, CAPTURE_DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!("Ignoring malformed capture date {:?}: {}", raw, e);
            None
        }
    }
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(values) => values.first().and_then(|bytes| {
            let text = String::from_utf8_lossy(bytes);
            let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
            if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            }
        }),
        _ => None,
    }
}

fn rational_field(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let value = match &field.value {
        Value::Rational(values) => values.first().map(|r| r.to_f64()),
        Value::SRational(values) => values.first().map(|r| r.to_f64()),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}
