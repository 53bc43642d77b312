//! Display formatting for capture values.
//!
//! Everything here is a pure function of its inputs; the compositor only
//! ever sees the strings produced by this module.

use crate::metadata::PhotoMetadata;

/// Separator between the fields of the EXIF summary line
pub const SUMMARY_SEPARATOR: &str = "  ";

/// Stylized display forms for camera model codes.
///
/// Each entry is an exact substring substitution. No replacement may
/// contain its own pattern, which keeps [`normalize_model`] idempotent.
const MODEL_SUBSTITUTIONS: &[(&str, &str)] = &[("Z5_2", "ℤ5Ⅱ")];

/// Renders a number with at most `digits` fractional digits, trailing zeros trimmed
///
/// `2.0 -> "2"`, `1.333 -> "1.33"`, `1.8 -> "1.8"`
pub fn trim_decimal(value: f64, digits: usize) -> String {
    let text = format!("{:.*}", digits, value);
    if !text.contains('.') {
        return text;
    }
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Formats an exposure time given in seconds
///
/// # Arguments
/// * `seconds` - Exposure time, strictly positive
///
/// # Returns
/// * `"2"`, `"1.33"` for exposures of one second or longer
/// * `"1/125"` for shorter exposures, the denominator rounded to the nearest
///   integer with halves away from zero (`0.4s` gives `"1/3"`)
///
/// Callers must not pass `0.0`: an absent exposure time is skipped, not formatted.
pub fn format_exposure_time(seconds: f64) -> String {
    debug_assert!(seconds > 0.0, "exposure time must be positive");

    if seconds >= 1.0 {
        trim_decimal(seconds, 2)
    } else {
        let denominator = (1.0 / seconds).round();
        format!("1/{}", denominator as u64)
    }
}

/// Builds the right-hand summary line: focal length, aperture, shutter, ISO
///
/// The order and the unit suffixes are fixed. The shutter segment is left
/// out when the exposure time is absent.
pub fn format_exif_summary(metadata: &PhotoMetadata) -> String {
    let mut segments = Vec::with_capacity(4);

    segments.push(format!("{}mm", trim_decimal(metadata.focal_length_mm, 2)));
    segments.push(format!("f/{}", trim_decimal(metadata.f_number, 2)));
    if metadata.has_exposure_time() {
        segments.push(format!(
            "{}s",
            format_exposure_time(metadata.exposure_time_seconds)
        ));
    }
    segments.push(format!("ISO{}", metadata.iso_speed));

    segments.join(SUMMARY_SEPARATOR)
}

/// Maps raw EXIF model strings to their display form
///
/// Trims surrounding whitespace and NUL padding, then applies the fixed
/// substitution table. Applying it twice gives the same result as once.
pub fn normalize_model(raw: &str) -> String {
    let mut model = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0').to_string();
    for (code, display) in MODEL_SUBSTITUTIONS {
        if model.contains(code) {
            model = model.replace(code, display);
        }
    }
    model
}
