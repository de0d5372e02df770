use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::DeskError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub def_type: String,
    pub function: FunctionDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Result handed back to the calling agent: an image with accompanying
/// text, or a structured JSON record.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutput {
    Image {
        label: String,
        mime_type: String,
        /// Base64-encoded image bytes.
        data: String,
        text: String,
        details: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    Json {
        payload: serde_json::Value,
    },
}

impl ToolOutput {
    pub fn json(payload: serde_json::Value) -> Self {
        ToolOutput::Json { payload }
    }

    /// Structured failure record. `platform` is attached for platform errors.
    pub fn error(err: &DeskError) -> Self {
        let mut payload = json!({
            "success": false,
            "error": err.to_string(),
            "code": err.code(),
        });
        if let DeskError::UnsupportedPlatform { platform } = err {
            payload["platform"] = json!(platform);
        }
        ToolOutput::Json { payload }
    }

    pub fn is_error(&self) -> bool {
        match self {
            ToolOutput::Json { payload } => payload.get("success") == Some(&json!(false)),
            ToolOutput::Image { .. } => false,
        }
    }

    /// `details` for images, the payload itself for JSON results.
    pub fn details(&self) -> &serde_json::Value {
        match self {
            ToolOutput::Image { details, .. } => details,
            ToolOutput::Json { payload } => payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_record_carries_code_and_platform() {
        let out = ToolOutput::error(&DeskError::UnsupportedPlatform { platform: "freebsd".into() });
        assert!(out.is_error());
        let d = out.details();
        assert_eq!(d["code"], "unsupported_platform");
        assert_eq!(d["platform"], "freebsd");
        assert_eq!(d["success"], false);
    }

    #[test]
    fn image_output_serializes_with_type_tag() {
        let out = ToolOutput::Image {
            label: "desktop:screenshot".into(),
            mime_type: "image/png".into(),
            data: "aGk=".into(),
            text: "hi".into(),
            details: json!({"width": 1}),
            path: None,
        };
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["type"], "image");
        assert!(v.get("path").is_none());
        assert!(!out.is_error());
    }
}
