use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::DetectorConfig;
use crate::detector::types::{HealthReport, ParseRequest, ParseResponse};
use crate::perception::geometry;
use crate::perception::traits::VisionParser;
use crate::perception::types::{DetectedElement, DetectionResult};

/// HTTP client for the UI-element detection service.
///
/// Transport failures never escape as errors: `health` collapses them to
/// `status: error` and `parse` to a failed `DetectionResult`.
#[derive(Clone)]
pub struct DetectionClient {
    base_url: String,
    health_timeout: Duration,
    parse_timeout: Duration,
    client: reqwest::Client,
}

impl DetectionClient {
    pub fn new(base_url: &str, health_timeout: Duration, parse_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            health_timeout,
            parse_timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(cfg: &DetectorConfig) -> Self {
        Self::new(
            &cfg.base_url,
            Duration::from_secs(cfg.health_timeout_secs),
            Duration::from_secs(cfg.parse_timeout_secs),
        )
    }

    /// Same timeouts and connection pool, different service.
    pub fn with_base_url(&self, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> HealthReport {
        let url = format!("{}/health", self.base_url);
        let response = match self.client.get(&url).timeout(self.health_timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "detector health request failed");
                return HealthReport::error();
            }
        };
        if !response.status().is_success() {
            tracing::debug!(url = %url, status = %response.status(), "detector health not ok");
            return HealthReport::error();
        }
        response.json::<HealthReport>().await.unwrap_or_else(|e| {
            tracing::debug!(url = %url, error = %e, "detector health body unreadable");
            HealthReport::error()
        })
    }

    pub async fn parse(&self, image_base64: &str) -> DetectionResult {
        let url = format!("{}/parse", self.base_url);
        tracing::debug!(url = %url, payload_bytes = image_base64.len(), "sending parse request");

        let sent = self
            .client
            .post(&url)
            .timeout(self.parse_timeout)
            .json(&ParseRequest { image_base64 })
            .send()
            .await;

        let response = match sent {
            Ok(r) => r,
            Err(e) => return DetectionResult::failure(transport_message(&e)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "detector returned non-success status");
            return DetectionResult::failure(format!("HTTP {}: {}", status.as_u16(), body));
        }

        match response.json::<ParseResponse>().await {
            Ok(parsed) => {
                let result = parsed.into_result();
                tracing::debug!(
                    success = result.success,
                    elements = result.elements.len(),
                    width = result.image_size.width,
                    height = result.image_size.height,
                    "parse response received"
                );
                result
            }
            Err(e) => DetectionResult::failure(transport_message(&e)),
        }
    }
}

fn transport_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timed out".to_string()
    } else {
        e.to_string()
    }
}

#[async_trait]
impl VisionParser for DetectionClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    fn at_endpoint(&self, base_url: &str) -> Arc<dyn VisionParser> {
        Arc::new(self.with_base_url(base_url))
    }

    async fn health(&self) -> HealthReport {
        DetectionClient::health(self).await
    }

    async fn parse(&self, image_base64: &str) -> DetectionResult {
        DetectionClient::parse(self, image_base64).await
    }
}

/// Case-insensitive substring search over element labels, in response order.
pub fn find_by_text<'a>(result: &'a DetectionResult, text: &str) -> Vec<&'a DetectedElement> {
    let needle = text.to_lowercase();
    result
        .elements
        .iter()
        .filter(|el| el.label().to_lowercase().contains(&needle))
        .collect()
}

/// First element containing the pixel point. Pixels are read against the
/// image size recorded in the result, never the current screen.
pub fn find_at_point(result: &DetectionResult, x: f64, y: f64) -> Option<&DetectedElement> {
    let size = result.image_size;
    if size.is_degenerate() {
        return None;
    }
    result.elements.iter().find(|el| {
        el.bbox()
            .is_some_and(|b| geometry::contains(b, x, y, size.width, size.height))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::types::HealthStatus;
    use crate::perception::types::{ImageSize, NormalizedBBox};

    fn result_with(size: ImageSize, elements: Vec<(&str, Option<[f64; 4]>)>) -> DetectionResult {
        let elements = elements
            .into_iter()
            .enumerate()
            .map(|(i, (label, bbox))| {
                DetectedElement::new(i as i64, label, None, true, bbox.map(NormalizedBBox::from_corners), size)
            })
            .collect();
        DetectionResult {
            success: true,
            image_size: size,
            elements,
            error: None,
            labeled_image: None,
            parsed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn find_by_text_is_case_insensitive_and_ordered() {
        let result = result_with(
            ImageSize::new(2560, 1440),
            vec![("Button: Submit", None), ("Text: Hello World", None), ("Button: Cancel", None)],
        );
        let labels: Vec<&str> = find_by_text(&result, "button").iter().map(|e| e.label()).collect();
        assert_eq!(labels, vec!["Button: Submit", "Button: Cancel"]);
        assert_eq!(find_by_text(&result, "HELLO").len(), 1);
        assert!(find_by_text(&result, "missing").is_empty());
    }

    #[test]
    fn find_at_point_hits_and_misses() {
        let result = result_with(ImageSize::new(1000, 1000), vec![("Test Element", Some([0.1, 0.1, 0.3, 0.3]))]);
        assert_eq!(find_at_point(&result, 200.0, 200.0).map(|e| e.label()), Some("Test Element"));
        assert!(find_at_point(&result, 500.0, 500.0).is_none());
    }

    #[test]
    fn find_at_point_returns_first_in_response_order() {
        let result = result_with(
            ImageSize::new(100, 100),
            vec![("outer", Some([0.0, 0.0, 1.0, 1.0])), ("inner", Some([0.4, 0.4, 0.6, 0.6]))],
        );
        assert_eq!(find_at_point(&result, 50.0, 50.0).map(|e| e.label()), Some("outer"));
    }

    #[test]
    fn find_at_point_with_zero_size_is_none() {
        let result = result_with(ImageSize::new(0, 0), vec![("all", Some([0.0, 0.0, 1.0, 1.0]))]);
        for (x, y) in [(0.0, 0.0), (100.0, 100.0), (-5.0, 3.0)] {
            assert!(find_at_point(&result, x, y).is_none());
        }
    }

    #[test]
    fn elements_without_bbox_never_match_points() {
        let result = result_with(ImageSize::new(100, 100), vec![("label only", None)]);
        assert!(find_at_point(&result, 0.0, 0.0).is_none());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = DetectionClient::new("http://localhost:9999/", Duration::from_secs(5), Duration::from_secs(30));
        assert_eq!(client.base_url(), "http://localhost:9999");
        assert_eq!(client.with_base_url("http://10.0.0.2:8765//").base_url(), "http://10.0.0.2:8765");
        assert_eq!(client.at_endpoint("http://10.0.0.3:9000/").endpoint(), "http://10.0.0.3:9000");
    }

    #[tokio::test]
    async fn health_on_unreachable_endpoint_is_error() {
        let client = DetectionClient::new("http://127.0.0.1:1", Duration::from_secs(5), Duration::from_secs(5));
        for _ in 0..3 {
            let report = client.health().await;
            assert_eq!(report, HealthReport::error());
            assert_eq!(report.status, HealthStatus::Error);
        }
    }

    #[tokio::test]
    async fn parse_on_unreachable_endpoint_is_structured_failure() {
        let client = DetectionClient::new("http://127.0.0.1:1", Duration::from_secs(5), Duration::from_secs(5));
        let result = client.parse("dGVzdA==").await;
        assert!(!result.success);
        assert!(!result.error.unwrap_or_default().is_empty());
    }
}
