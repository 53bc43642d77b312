mod common;

use common::{gradient, pipeline, write_jpeg_with_exif, write_png, BlockFonts, MISSING_FAMILY};
use filmframe::pipeline::{render_photo, SourcePhoto};
use filmframe::compositor::embedded_logo;
use filmframe::{LayoutGeometry, PhotoMetadata, Pipeline, WatermarkError, WatermarkStyle};
use image::{DynamicImage, GenericImageView};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_metadata_read_from_jpeg_container() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("DSC_0001.jpg");
    write_jpeg_with_exif(&path, &gradient(64, 48));

    let photo = SourcePhoto::open(&path).unwrap();
    assert_eq!(photo.image.dimensions(), (64, 48));
    assert_eq!(photo.metadata.model, "NIKON ℤ5Ⅱ");
    assert_eq!(photo.metadata.iso_speed, 400);
    assert_eq!(photo.metadata.focal_length_mm, 35.0);
    assert!(photo.metadata.capture_date.is_some());
}

#[test]
fn test_photo_without_exif_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plain.png");
    write_png(&path, &gradient(32, 32));

    let photo = SourcePhoto::open(&path).unwrap();
    assert_eq!(photo.metadata.model, "Unknown");
    assert_eq!(photo.metadata.lens_model, "Unknown");
    assert_eq!(photo.metadata.iso_speed, 0);
    assert!(photo.metadata.capture_date.is_none());
}

#[test]
fn test_end_to_end_frame_keeps_source_pixels() {
    let source = gradient(1000, 1500);
    let photo = SourcePhoto {
        image: DynamicImage::ImageRgb8(source.clone()),
        metadata: PhotoMetadata {
            focal_length_mm: 35.0,
            f_number: 1.8,
            exposure_time_seconds: 1.0 / 200.0,
            iso_speed: 400,
            ..PhotoMetadata::default()
        },
    };

    let pipeline = pipeline();
    let compositor = pipeline.compositor("Any Family").unwrap();
    let rendered = render_photo(&compositor, &photo, pipeline.style());

    let geometry = LayoutGeometry::compute(1000, 1500);
    // side margins round(22.5) = 23, bottom band 120
    assert_eq!(geometry.image_origin(), (23, 23));
    assert_eq!(rendered.dimensions(), (1046, 1643));

    let frame = rendered.image();
    for y in 0..1500 {
        for x in 0..1000 {
            assert_eq!(frame.get_pixel(x + 23, y + 23), source.get_pixel(x, y), "pixel {},{}", x, y);
        }
    }
}

#[test]
fn test_render_one_writes_sibling_directory() {
    let dir = TempDir::new().unwrap();
    let shoot = dir.path().join("shoot");
    fs::create_dir(&shoot).unwrap();
    let input = shoot.join("DSC_0042.JPG");
    write_jpeg_with_exif(&input, &gradient(400, 300));

    let output = pipeline().render_one(&input, "Any Family").unwrap();
    assert_eq!(output, dir.path().join("shoot_watermark").join("DSC_0042.watermark.JPG"));

    let written = image::open(&output).unwrap();
    assert_eq!(written.dimensions(), LayoutGeometry::compute(400, 300).canvas_size());
}

#[test]
fn test_render_one_reports_decode_error() {
    let dir = TempDir::new().unwrap();
    let shoot = dir.path().join("shoot");
    fs::create_dir(&shoot).unwrap();
    let input = shoot.join("broken.jpg");
    fs::write(&input, b"definitely not a jpeg").unwrap();

    let err = pipeline().render_one(&input, "Any Family").unwrap_err();
    assert!(matches!(err, WatermarkError::Decode { .. }), "got {:?}", err);
    assert!(!dir.path().join("shoot_watermark").join("broken.watermark.jpg").exists());
}

#[test]
fn test_render_one_missing_file_is_io() {
    let dir = TempDir::new().unwrap();
    let err = pipeline()
        .render_one(&dir.path().join("gone.jpg"), "Any Family")
        .unwrap_err();
    assert_eq!(err.kind(), "io");
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let dir = TempDir::new().unwrap();
    let shoot = dir.path().join("shoot");
    fs::create_dir(&shoot).unwrap();

    let first = shoot.join("a.jpg");
    let corrupt = shoot.join("b.jpg");
    let third = shoot.join("c.png");
    write_jpeg_with_exif(&first, &gradient(300, 200));
    fs::write(&corrupt, b"\xFF\xD8 truncated").unwrap();
    write_png(&third, &gradient(200, 300));

    let outcomes = pipeline()
        .with_max_parallel(2)
        .render_batch(vec![first.clone(), corrupt.clone(), third.clone()], "Any Family")
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].input, first);
    assert_eq!(outcomes[1].input, corrupt);
    assert_eq!(outcomes[2].input, third);

    assert!(outcomes[0].is_success());
    assert!(matches!(outcomes[1].result, Err(WatermarkError::Decode { .. })));
    assert!(outcomes[2].is_success());

    let out_dir = dir.path().join("shoot_watermark");
    let a = image::open(out_dir.join("a.watermark.jpg")).unwrap();
    assert_eq!(a.dimensions(), LayoutGeometry::compute(300, 200).canvas_size());
    let c = image::open(out_dir.join("c.watermark.jpg")).unwrap();
    assert_eq!(c.dimensions(), LayoutGeometry::compute(200, 300).canvas_size());
    assert!(!out_dir.join("b.watermark.jpg").exists());
    assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 2);
}

#[tokio::test]
async fn test_batch_missing_font_aborts_everything() {
    let dir = TempDir::new().unwrap();
    let shoot = dir.path().join("shoot");
    fs::create_dir(&shoot).unwrap();
    let input = shoot.join("a.jpg");
    write_jpeg_with_exif(&input, &gradient(100, 100));

    let err = pipeline()
        .render_batch(vec![input], MISSING_FAMILY)
        .await
        .unwrap_err();
    assert!(matches!(err, WatermarkError::MissingFont { .. }));
    assert!(!dir.path().join("shoot_watermark").exists());
}

#[test]
fn test_unrenderable_date_format_rejected_before_rendering() {
    let style = WatermarkStyle {
        date_format: "%Y %Q".into(),
        ..WatermarkStyle::default()
    };
    let err = Pipeline::new(Arc::new(BlockFonts), embedded_logo().unwrap(), style)
        .err()
        .expect("bad date format accepted");
    assert_eq!(err.kind(), "config");
}

#[test]
fn test_render_one_resolves_parent_components() {
    let dir = TempDir::new().unwrap();
    let shoot = dir.path().join("shoot");
    fs::create_dir_all(shoot.join("raw")).unwrap();
    let input = shoot.join("DSC_0007.jpg");
    write_jpeg_with_exif(&input, &gradient(120, 80));

    let output = pipeline()
        .render_one(&shoot.join("raw").join("..").join("DSC_0007.jpg"), "Any Family")
        .unwrap();
    assert_eq!(output, dir.path().join("shoot_watermark").join("DSC_0007.watermark.jpg"));
    assert!(output.exists());
}
