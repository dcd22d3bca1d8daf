//! Receipt photo normalization and thumbnails.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

use crate::error::MediaResult;

const ORIENTED_JPEG_QUALITY: u8 = 85;
const THUMBNAIL_JPEG_QUALITY: u8 = 75;

/// Default maximum thumbnail width in pixels.
pub const THUMBNAIL_MAX_WIDTH: u32 = 1200;

/// Read the EXIF orientation tag, 1 (upright) when absent or unreadable.
///
/// Phone uploads routinely carry rotated sensor data plus an orientation tag;
/// report generation downstream ignores EXIF, so the pixels must be fixed up
/// front.
fn exif_orientation(path: &Path) -> u32 {
    let Ok(file) = File::open(path) else {
        return 1;
    };
    let mut reader = BufReader::new(file);
    exif::Reader::new()
        .read_from_container(&mut reader)
        .ok()
        .and_then(|data| {
            data.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .unwrap_or(1)
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn save_jpeg(img: &DynamicImage, path: &Path, quality: u8) -> MediaResult<()> {
    let out = File::create(path)?;
    let writer = BufWriter::new(out);
    let encoder = JpegEncoder::new_with_quality(writer, quality);
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
    Ok(())
}

/// Apply the EXIF orientation to the pixel data and overwrite the file.
///
/// A missing or unreadable orientation tag is a no-op, not an error; decode
/// or encode failures propagate. Returns whether the file was rewritten.
pub fn normalize_orientation(path: &Path) -> MediaResult<bool> {
    let orientation = exif_orientation(path);
    if orientation <= 1 || orientation > 8 {
        return Ok(false);
    }
    let img = image::open(path)?;
    let fixed = apply_orientation(img, orientation);
    save_jpeg(&fixed, path, ORIENTED_JPEG_QUALITY)?;
    debug!(path = %path.display(), orientation, "normalized image orientation");
    Ok(true)
}

/// Write a web-optimized thumbnail of `src` to `dest`, downscaling to at most
/// `max_width` pixels wide while preserving aspect ratio.
pub fn write_thumbnail(src: &Path, dest: &Path, max_width: u32) -> MediaResult<()> {
    let img = image::open(src)?;
    let img = if img.width() > max_width {
        img.resize(max_width, u32::MAX, FilterType::Lanczos3)
    } else {
        img
    };
    save_jpeg(&img, dest, THUMBNAIL_JPEG_QUALITY)?;
    Ok(())
}
