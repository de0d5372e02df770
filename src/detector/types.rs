//! Wire types for the UI-element detection service.
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::perception::types::{DetectedElement, DetectionResult, ImageSize, NormalizedBBox};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    #[serde(other)]
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, alias = "modelLoaded", skip_serializing_if = "Option::is_none")]
    pub model_loaded: Option<bool>,
}

impl HealthReport {
    pub fn error() -> Self {
        Self {
            status: HealthStatus::Error,
            device: None,
            model_loaded: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParseRequest<'a> {
    pub image_base64: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ParseResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub image_size: ImageSize,
    #[serde(default)]
    pub element_count: usize,
    #[serde(default)]
    pub elements: Vec<WireElement>,
    #[serde(default)]
    pub labeled_image: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireElement {
    pub id: i64,
    pub content: WireContent,
    /// Older servers put the box next to `content` instead of inside it.
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
}

/// Element payload: a detail object, or a bare label from older servers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireContent {
    Plain(String),
    Detail(ElementDetail),
}

#[derive(Debug, Default, Deserialize)]
pub struct ElementDetail {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub interactivity: Option<bool>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ParseResponse {
    /// Converts the wire response, deriving pixel geometry against the image
    /// size the detector itself reports.
    pub fn into_result(self) -> DetectionResult {
        if !self.success {
            return DetectionResult::failure(
                self.error
                    .unwrap_or_else(|| "detector reported failure".to_string()),
            );
        }
        if self.element_count != self.elements.len() {
            tracing::debug!(
                reported = self.element_count,
                received = self.elements.len(),
                "detector element_count mismatch"
            );
        }

        let size = self.image_size;
        let elements = self
            .elements
            .into_iter()
            .map(|el| el.into_element(size))
            .collect();

        DetectionResult {
            success: true,
            image_size: size,
            elements,
            error: None,
            labeled_image: self.labeled_image,
            parsed_at: Utc::now(),
        }
    }
}

impl WireElement {
    fn into_element(self, size: ImageSize) -> DetectedElement {
        match self.content {
            WireContent::Plain(label) => DetectedElement::new(
                self.id,
                label,
                None,
                false,
                self.bbox.map(NormalizedBBox::from_corners),
                size,
            ),
            WireContent::Detail(detail) => DetectedElement::new(
                self.id,
                detail.content.unwrap_or_default(),
                detail.kind,
                detail.interactivity.unwrap_or(false),
                detail.bbox.or(self.bbox).map(NormalizedBBox::from_corners),
                size,
            ),
        }
    }
}
