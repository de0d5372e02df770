use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::perception::geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Bounding box `[x1, y1, x2, y2]` in the 0.0–1.0 range, relative to the
/// image the detector analysed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl NormalizedBBox {
    /// Builds a box from raw corners, clamping to [0,1] and ordering each
    /// axis so that `x1 <= x2` and `y1 <= y2` always hold.
    pub fn from_corners(raw: [f64; 4]) -> Self {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let [ax, ay, bx, by] = raw.map(clamp);
        Self {
            x1: ax.min(bx),
            y1: ay.min(by),
            x2: ax.max(bx),
            y2: ay.max(by),
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

/// One UI element reported by the detector. Pixel geometry is derived once,
/// at construction, from the image size of the detection it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedElement {
    id: i64,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    interactive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    bbox: Option<NormalizedBBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pixel_bbox: Option<PixelBBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    center: Option<PixelPoint>,
}

impl DetectedElement {
    pub fn new(
        id: i64,
        label: impl Into<String>,
        kind: Option<String>,
        interactive: bool,
        bbox: Option<NormalizedBBox>,
        size: ImageSize,
    ) -> Self {
        let pixel_bbox = match bbox {
            Some(b) if !size.is_degenerate() => Some(geometry::to_pixel(&b, size.width, size.height)),
            _ => None,
        };
        let center = pixel_bbox.as_ref().map(geometry::center);
        Self {
            id,
            label: label.into(),
            kind,
            interactive,
            bbox,
            pixel_bbox,
            center,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn bbox(&self) -> Option<&NormalizedBBox> {
        self.bbox.as_ref()
    }

    pub fn pixel_bbox(&self) -> Option<&PixelBBox> {
        self.pixel_bbox.as_ref()
    }

    pub fn center(&self) -> Option<PixelPoint> {
        self.center
    }
}

/// Full outcome of one detector call.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    pub success: bool,
    pub image_size: ImageSize,
    pub elements: Vec<DetectedElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Base64 PNG with the detector's own box overlay, when it sent one.
    #[serde(skip)]
    pub labeled_image: Option<String>,
    pub parsed_at: DateTime<Utc>,
}

impl DetectionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            image_size: ImageSize::default(),
            elements: Vec::new(),
            error: Some(error.into()),
            labeled_image: None,
            parsed_at: Utc::now(),
        }
    }

    /// Re-derives every element's pixel geometry against `size`.
    pub fn rescaled(self, size: ImageSize) -> Self {
        let elements = self
            .elements
            .into_iter()
            .map(|el| DetectedElement::new(el.id, el.label, el.kind, el.interactive, el.bbox, size))
            .collect();
        Self {
            image_size: size,
            elements,
            ..self
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotMeta {
    pub monitor_name: String,
    pub scale_factor: f64,
    pub physical_width: u32,
    pub physical_height: u32,
    pub logical_width: u32,
    pub logical_height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_orders_and_clamps() {
        let b = NormalizedBBox::from_corners([0.6, 1.4, 0.2, -0.1]);
        assert_eq!(b.as_array(), [0.2, 0.0, 0.6, 1.0]);
    }

    #[test]
    fn element_derives_pixel_geometry() {
        let bbox = NormalizedBBox::from_corners([0.1, 0.1, 0.3, 0.3]);
        let el = DetectedElement::new(0, "OK", None, true, Some(bbox), ImageSize::new(1000, 1000));
        assert_eq!(
            el.pixel_bbox(),
            Some(&PixelBBox { x1: 100, y1: 100, x2: 300, y2: 300 })
        );
        assert_eq!(el.center(), Some(PixelPoint { x: 200, y: 200 }));
    }

    #[test]
    fn rescaled_rebuilds_pixels() {
        let bbox = NormalizedBBox::from_corners([0.5, 0.5, 1.0, 1.0]);
        let mut r = DetectionResult::failure("");
        r.success = true;
        r.elements = vec![DetectedElement::new(1, "a", None, true, Some(bbox), ImageSize::default())];
        let r = r.rescaled(ImageSize::new(200, 100));
        assert_eq!(r.image_size, ImageSize::new(200, 100));
        assert_eq!(r.elements[0].center(), Some(PixelPoint { x: 150, y: 75 }));
    }

    #[test]
    fn element_without_size_has_no_pixels() {
        let bbox = NormalizedBBox::from_corners([0.1, 0.1, 0.3, 0.3]);
        let el = DetectedElement::new(3, "x", None, false, Some(bbox), ImageSize::default());
        assert!(el.pixel_bbox().is_none());
        assert!(el.center().is_none());
        assert!(el.bbox().is_some());
    }
}
