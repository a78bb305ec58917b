//! Image decoding, RGB normalization, and EXIF-orientation correction.
//!
//! Scanned material is frequently photographed with tablets or phones, so
//! the raw JPEG often carries an EXIF orientation tag instead of upright
//! pixels. The polygon coordinates in the layout XML refer to the upright
//! image, so orientation must be applied before any cropping.

use image::RgbImage;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, warn};

/// Decode image bytes to an upright RGB image.
///
/// Non-RGB inputs (grayscale, palette, RGBA) are converted. EXIF orientation
/// is corrected counter-clockwise: tag 3 → 180°, tag 6 → 270°, tag 8 → 90°;
/// all other tags (and images without EXIF) are left as decoded.
pub fn load_rgb(bytes: &[u8]) -> Result<RgbImage, String> {
    let decoded = image::load_from_memory(bytes).map_err(|e| e.to_string())?;

    let upright = match read_orientation(bytes) {
        Some(3) => decoded.rotate180(),
        // image's rotations are clockwise; 270° CCW == rotate90, 90° CCW == rotate270.
        Some(6) => decoded.rotate90(),
        Some(8) => decoded.rotate270(),
        _ => decoded,
    };

    Ok(upright.to_rgb8())
}

/// The EXIF orientation tag value, when the image carries one.
fn read_orientation(bytes: &[u8]) -> Option<u32> {
    use exif::{In, Reader, Tag};

    let mut cursor = Cursor::new(bytes);
    let exif = Reader::new().read_from_container(&mut cursor).ok()?;
    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

/// Fetch a remote image with a fixed timeout.
///
/// The only network operation in the pipeline. Timeouts and request
/// failures both mean "no image found" for the page — logged, never fatal.
pub fn fetch_remote(url: &str, timeout: Duration) -> Option<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| warn!("could not build HTTP client: {e}"))
        .ok()?;

    match client.get(url).send().and_then(|r| r.error_for_status()) {
        Ok(response) => {
            let bytes = response
                .bytes()
                .map_err(|e| warn!("image download from {url} failed: {e}"))
                .ok()?;
            debug!("downloaded {} bytes from {url}", bytes.len());
            Some(bytes.to_vec())
        }
        Err(e) if e.is_timeout() => {
            warn!("image download of {url} timed out");
            None
        }
        Err(e) => {
            warn!("image download from {url} failed: {e}");
            None
        }
    }
}
