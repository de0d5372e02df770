// Routes one validated tool call to capture, detection or input synthesis.
use std::sync::Arc;

use serde_json::json;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::detector::{find_at_point, find_by_text, DetectionClient};
use crate::errors::{DeskError, DeskResult};
use crate::executor::input::{InputSynthesizer, InputTiming};
use crate::perception::cache::{DetectionCache, SessionId};
use crate::perception::screenshot::{self, ScreenImage};
use crate::perception::traits::VisionParser;
use crate::perception::types::DetectedElement;
use crate::platform::{self, DesktopBackend, HostPlatform};
use crate::tool::request::{parse_call, ActionRequest, FindQuery, ParseSource};
use crate::tool::types::ToolOutput;

pub struct Dispatcher {
    platform: HostPlatform,
    backend: Option<Arc<dyn DesktopBackend>>,
    synthesizer: Option<InputSynthesizer>,
    detector: Arc<dyn VisionParser>,
    config: AppConfig,
    cache: DetectionCache,
}

impl Dispatcher {
    /// Detects the host and wires the native backend plus the configured
    /// detection service.
    pub fn new(config: AppConfig) -> Self {
        let platform = HostPlatform::detect();
        let backend = platform::select_backend(&platform);
        let detector: Arc<dyn VisionParser> = Arc::new(DetectionClient::from_config(&config.detector));
        Self::with_parts(config, platform, backend, detector)
    }

    pub fn with_parts(
        config: AppConfig,
        platform: HostPlatform,
        backend: Option<Arc<dyn DesktopBackend>>,
        detector: Arc<dyn VisionParser>,
    ) -> Self {
        let synthesizer = backend.as_ref().map(|b| {
            InputSynthesizer::new(
                Arc::clone(b),
                InputTiming::from(&config.input),
                config.timeouts.clone(),
            )
        });
        Self {
            platform,
            backend,
            synthesizer,
            detector,
            config,
            cache: DetectionCache::new(),
        }
    }

    pub fn platform(&self) -> &HostPlatform {
        &self.platform
    }

    pub fn cache(&self) -> &DetectionCache {
        &self.cache
    }

    /// Entry point for one tool call. Every failure comes back as a
    /// structured result; nothing escapes as an error.
    pub async fn execute(&self, args: serde_json::Value) -> ToolOutput {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("desktop", %request_id);
        async move {
            let call = match parse_call(args) {
                Ok(call) => call,
                Err(e) => {
                    tracing::warn!(code = e.code(), error = %e, "rejected tool call");
                    return ToolOutput::error(&e);
                }
            };
            let action = call.request.name();
            tracing::debug!(action, session = %call.session, "dispatching");
            match self.dispatch(&call.session, call.request).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::error!(action, code = e.code(), error = %e, "action failed");
                    ToolOutput::error(&e)
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn dispatch(&self, session: &SessionId, request: ActionRequest) -> DeskResult<ToolOutput> {
        if request.touches_desktop() && self.backend.is_none() {
            return Err(DeskError::UnsupportedPlatform {
                platform: self.platform.name().to_string(),
            });
        }

        match request {
            ActionRequest::Screenshot => self.screenshot().await,
            ActionRequest::Parse { source, base_url } => self.parse(session, source, base_url.as_deref()).await,
            ActionRequest::Click { x, y, clicks, button } => {
                let record = self.synthesizer()?.click(x, y, button, clicks).await?;
                Ok(ToolOutput::json(record))
            }
            ActionRequest::Type { text } => Ok(ToolOutput::json(self.synthesizer()?.type_text(&text).await?)),
            ActionRequest::Key { key } => Ok(ToolOutput::json(self.synthesizer()?.key(&key).await?)),
            ActionRequest::Scroll { direction } => Ok(ToolOutput::json(self.synthesizer()?.scroll(direction).await?)),
            ActionRequest::Find { query } => self.find(session, query),
            ActionRequest::Health { base_url } => Ok(self.health(base_url.as_deref()).await),
        }
    }

    fn backend(&self) -> DeskResult<Arc<dyn DesktopBackend>> {
        self.backend.clone().ok_or_else(|| DeskError::UnsupportedPlatform {
            platform: self.platform.name().to_string(),
        })
    }

    fn synthesizer(&self) -> DeskResult<&InputSynthesizer> {
        self.synthesizer.as_ref().ok_or_else(|| DeskError::UnsupportedPlatform {
            platform: self.platform.name().to_string(),
        })
    }

    fn detector_for(&self, base_url: Option<&str>) -> Arc<dyn VisionParser> {
        match base_url {
            Some(url) => self.detector.at_endpoint(url),
            None => Arc::clone(&self.detector),
        }
    }

    async fn capture(&self) -> DeskResult<ScreenImage> {
        screenshot::capture_primary(self.backend()?, &self.config.capture, self.config.timeouts.capture()).await
    }

    async fn screenshot(&self) -> DeskResult<ToolOutput> {
        let shot = self.capture().await?;
        let size = shot.size();
        let mut details = json!({ "width": size.width, "height": size.height });
        if let Some(meta) = shot.meta() {
            details["scale_factor"] = json!(meta.scale_factor);
            details["monitor"] = json!(meta.monitor_name);
        }
        Ok(image_output(
            "desktop:screenshot",
            &shot,
            None,
            format!(
                "Screenshot captured. Screen size: {}x{}. Use action=\"parse\" to detect UI elements with coordinates.",
                size.width, size.height
            ),
            details,
        ))
    }

    async fn parse(
        &self,
        session: &SessionId,
        source: ParseSource,
        base_url: Option<&str>,
    ) -> DeskResult<ToolOutput> {
        let image = match source {
            ParseSource::Screen => self.capture().await?,
            ParseSource::File(path) => screenshot::load_image_file(&path).await?,
            ParseSource::Inline(data) => screenshot::load_image_base64(&data)?,
        };
        let size = image.size();
        let detector = self.detector_for(base_url);

        let result = detector.parse(&image.base64()).await;
        if !result.success {
            let err = DeskError::DetectionUnavailable(
                result.error.clone().unwrap_or_else(|| "detector reported failure".to_string()),
            );
            tracing::warn!(endpoint = %detector.endpoint(), error = %err, "falling back to plain screenshot");
            return Ok(image_output(
                "desktop:parse",
                &image,
                None,
                format!(
                    "{err}. Screenshot captured. Screen size: {}x{}. Analyze the image manually to find coordinates.",
                    size.width, size.height
                ),
                json!({
                    "width": size.width,
                    "height": size.height,
                    "detector_error": err.to_string(),
                }),
            ));
        }

        if result.image_size != size {
            tracing::debug!(
                reported_width = result.image_size.width,
                reported_height = result.image_size.height,
                width = size.width,
                height = size.height,
                "rescaling detection to the analysed image"
            );
        }
        let result = Arc::new(result.rescaled(size));
        self.cache.store(session, Arc::clone(&result));

        let text = format!(
            "Detector found {} UI elements.\nScreen: {}x{}\n\n{}\n\nTo click an element, use: action=\"click\", x=<center_x>, y=<center_y>",
            result.elements.len(),
            size.width,
            size.height,
            element_list(&result.elements),
        );
        let labeled = if self.config.detector.return_labeled_image {
            result.labeled_image.as_deref()
        } else {
            None
        };
        tracing::info!(session = %session, elements = result.elements.len(), "parse done");
        Ok(image_output(
            "desktop:parse",
            &image,
            labeled,
            text,
            json!({
                "width": size.width,
                "height": size.height,
                "element_count": result.elements.len(),
                "elements": result.elements,
                "parsed_at": result.parsed_at,
            }),
        ))
    }

    fn find(&self, session: &SessionId, query: FindQuery) -> DeskResult<ToolOutput> {
        let result = self.cache.latest(session)?;
        let payload = match query {
            FindQuery::Text(text) => {
                let matches = find_by_text(&result, &text);
                tracing::debug!(session = %session, query = %text, matches = matches.len(), "find by text");
                json!({
                    "success": true,
                    "session": session.as_str(),
                    "search_text": text,
                    "match_count": matches.len(),
                    "matches": matches,
                    "parsed_at": result.parsed_at,
                })
            }
            FindQuery::Point { x, y } => {
                let element = find_at_point(&result, x, y);
                tracing::debug!(session = %session, x, y, hit = element.is_some(), "find at point");
                json!({
                    "success": true,
                    "session": session.as_str(),
                    "point": { "x": x, "y": y },
                    "element": element,
                    "parsed_at": result.parsed_at,
                })
            }
        };
        Ok(ToolOutput::json(payload))
    }

    async fn health(&self, base_url: Option<&str>) -> ToolOutput {
        let detector = self.detector_for(base_url);
        let report = detector.health().await;
        ToolOutput::json(json!({
            "status": report.status,
            "device": report.device,
            "model_loaded": report.model_loaded,
            "base_url": detector.endpoint(),
        }))
    }
}

fn image_output(
    label: &str,
    image: &ScreenImage,
    replacement: Option<&str>,
    text: String,
    details: serde_json::Value,
) -> ToolOutput {
    // A labeled image is not the file on disk, so no path goes with it.
    let (data, mime_type, path) = match replacement {
        Some(labeled) => (labeled.to_string(), "image/png".to_string(), None),
        None => (
            image.base64(),
            image.mime_type().to_string(),
            image.persistent_path().map(|p| p.display().to_string()),
        ),
    };
    ToolOutput::Image {
        label: label.to_string(),
        mime_type,
        data,
        text,
        details,
        path,
    }
}

/// One line per element: `[id] "label" at (cx, cy) [interactive]`.
pub fn element_list(elements: &[DetectedElement]) -> String {
    elements
        .iter()
        .map(|el| {
            let mut line = format!("[{}] \"{}\"", el.id(), el.label());
            if let Some(c) = el.center() {
                line.push_str(&format!(" at ({}, {})", c.x, c.y));
            }
            if el.interactive() {
                line.push_str(" [interactive]");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
