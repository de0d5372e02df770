use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("Desktop control is not available on this platform ({platform})")]
    UnsupportedPlatform { platform: String },

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Screenshot capture timed out after {0}s")]
    CaptureTimeout(u64),

    #[error("Detection service unavailable: {0}")]
    DetectionUnavailable(String),

    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Input injection failed: {0}")]
    InputInjectionFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("No detection result available. Run action=parse first.")]
    NoDetectionResult,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl DeskError {
    /// Stable machine-readable code used in structured error results.
    pub fn code(&self) -> &'static str {
        match self {
            DeskError::UnsupportedPlatform { .. } => "unsupported_platform",
            DeskError::CaptureFailed(_) => "capture_failed",
            DeskError::CaptureTimeout(_) => "capture_timeout",
            DeskError::DetectionUnavailable(_) => "detection_unavailable",
            DeskError::UnknownKey(_) => "unknown_key",
            DeskError::InputInjectionFailed(_) => "input_injection_failed",
            DeskError::InvalidRequest(_) => "invalid_request",
            DeskError::UnknownAction(_) => "unknown_action",
            DeskError::NoDetectionResult => "no_detection_result",
            DeskError::Config(_) | DeskError::TomlDe(_) => "config",
            DeskError::Io(_) => "io",
            DeskError::Json(_) => "json",
            DeskError::Http(_) => "http",
            DeskError::Image(_) => "image",
        }
    }
}

impl serde::Serialize for DeskError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type DeskResult<T> = Result<T, DeskError>;
