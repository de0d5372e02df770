use std::sync::Arc;

use async_trait::async_trait;

use crate::detector::types::HealthReport;
use crate::perception::types::DetectionResult;

/// Strategy trait for UI element detection.
///
/// Implementations report failure inside the returned value rather than as
/// an error, so callers can always degrade to a plain screenshot.
#[async_trait]
pub trait VisionParser: Send + Sync {
    /// Where detection requests go, for logs and result details.
    fn endpoint(&self) -> &str;

    /// The same parser pointed at another service, for per-call overrides.
    fn at_endpoint(&self, base_url: &str) -> Arc<dyn VisionParser>;

    async fn health(&self) -> HealthReport;

    /// Detects elements in a base64-encoded PNG or JPEG.
    async fn parse(&self, image_base64: &str) -> DetectionResult;
}
