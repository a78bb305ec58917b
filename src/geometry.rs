//! Polygon geometry: bounding boxes, clamped crops, and polygon masks.
//!
//! Everything here works on integer pixel coordinates straight from the
//! layout XML. Polygons may reach outside the image (annotation tools allow
//! it), so every crop clamps to image bounds first and reports a
//! [`SkipReason`] instead of panicking when the result is unusable.

use crate::error::SkipReason;
use crate::model::Polygon;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// White fill used outside the mask polygon.
const MASK_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Crop the axis-aligned bounding box of `coords` out of `image`.
///
/// The box is clamped to the image bounds. Failure modes are all skip-level:
/// an empty polygon, a degenerate (zero or negative extent) box after
/// clamping, or a box narrower than `min_width`.
///
/// With `mask` set, pixels outside the polygon (shifted into the crop's
/// local frame) are replaced with uniform white; pixels inside keep their
/// original color. The mask is hard-edged — a pixel is either in or out.
pub fn crop_polygon(
    image: &RgbImage,
    coords: &Polygon,
    mask: bool,
    min_width: Option<u32>,
) -> Result<RgbImage, SkipReason> {
    if coords.is_empty() {
        return Err(SkipReason::NoCoordinates);
    }

    let min_x = coords.iter().map(|p| i64::from(p.0)).min().unwrap_or(0).max(0);
    let max_x = coords
        .iter()
        .map(|p| i64::from(p.0))
        .max()
        .unwrap_or(0)
        .min(i64::from(image.width()));
    let min_y = coords.iter().map(|p| i64::from(p.1)).min().unwrap_or(0).max(0);
    let max_y = coords
        .iter()
        .map(|p| i64::from(p.1))
        .max()
        .unwrap_or(0)
        .min(i64::from(image.height()));

    if min_x >= max_x || min_y >= max_y {
        return Err(SkipReason::DegenerateCrop {
            min_x,
            min_y,
            max_x,
            max_y,
        });
    }

    let width = (max_x - min_x) as u32;
    let height = (max_y - min_y) as u32;

    if let Some(min_width) = min_width {
        if width < min_width {
            return Err(SkipReason::BelowMinWidth { width, min_width });
        }
    }

    let mut crop =
        image::imageops::crop_imm(image, min_x as u32, min_y as u32, width, height).to_image();

    if mask {
        apply_polygon_mask(&mut crop, coords, min_x, min_y);
    }

    Ok(crop)
}

/// Paint everything outside `coords` (shifted by `-offset`) uniform white.
fn apply_polygon_mask(crop: &mut RgbImage, coords: &Polygon, offset_x: i64, offset_y: i64) {
    let mut shifted: Vec<Point<i32>> = coords
        .iter()
        .map(|&(x, y)| {
            Point::new(
                (i64::from(x) - offset_x) as i32,
                (i64::from(y) - offset_y) as i32,
            )
        })
        .collect();

    // draw_polygon_mut rejects a closing point equal to the first one.
    while shifted.len() > 1 && shifted.first() == shifted.last() {
        shifted.pop();
    }
    if shifted.len() < 3 {
        return;
    }

    let mut mask = GrayImage::new(crop.width(), crop.height());
    draw_polygon_mut(&mut mask, &shifted, Luma([255u8]));

    for (x, y, pixel) in crop.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] != 255 {
            *pixel = MASK_BACKGROUND;
        }
    }
}

/// The single rectangle covering every point of every polygon.
///
/// Returned as four points in clockwise order starting at the top-left
/// corner, or empty when no polygon contributes any point.
pub fn enclosing_rect(polygons: &[&Polygon]) -> Polygon {
    let mut points = polygons.iter().flat_map(|p| p.iter().copied());

    let Some(first) = points.next() else {
        return Vec::new();
    };

    let (mut min_x, mut min_y) = first;
    let (mut max_x, mut max_y) = first;
    for (x, y) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    vec![(min_x, min_y), (max_x, min_y), (max_x, max_y), (min_x, max_y)]
}
