// Normalized <-> pixel coordinate mapping.
use crate::perception::types::{NormalizedBBox, PixelBBox, PixelPoint};

/// Scales a normalized box into pixel space, rounding each edge.
/// Callers must ensure `width > 0 && height > 0`.
pub fn to_pixel(bbox: &NormalizedBBox, width: u32, height: u32) -> PixelBBox {
    let (w, h) = (width as f64, height as f64);
    PixelBBox {
        x1: (bbox.x1 * w).round() as i32,
        y1: (bbox.y1 * h).round() as i32,
        x2: (bbox.x2 * w).round() as i32,
        y2: (bbox.y2 * h).round() as i32,
    }
}

pub fn center(bbox: &PixelBBox) -> PixelPoint {
    PixelPoint {
        x: ((bbox.x1 as f64 + bbox.x2 as f64) / 2.0).round() as i32,
        y: ((bbox.y1 as f64 + bbox.y2 as f64) / 2.0).round() as i32,
    }
}

/// Inclusive containment test of a pixel point against a normalized box.
/// A zero-sized image never contains anything.
pub fn contains(bbox: &NormalizedBBox, x: f64, y: f64, width: u32, height: u32) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    let nx = x / width as f64;
    let ny = y / height as f64;
    bbox.x1 <= nx && nx <= bbox.x2 && bbox.y1 <= ny && ny <= bbox.y2
}
