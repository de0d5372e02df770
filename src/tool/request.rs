//! Boundary validation: raw tool arguments become a typed [`ActionRequest`]
//! before anything touches the desktop or the network.
use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::{DeskError, DeskResult};
use crate::executor::input::{ClickCount, ScrollDirection};
use crate::perception::cache::SessionId;
use crate::platform::MouseButton;

/// Raw arguments as sent by the calling agent.
#[derive(Debug, Default, Deserialize)]
pub struct ToolArgs {
    pub action: Option<String>,
    pub session: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub text: Option<String>,
    pub key: Option<String>,
    pub direction: Option<String>,
    pub clicks: Option<f64>,
    pub button: Option<String>,
    pub image_path: Option<String>,
    pub image_base64: Option<String>,
    /// Same as `text` for `find`.
    pub search_text: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FindQuery {
    Text(String),
    Point { x: f64, y: f64 },
}

/// Image a `parse` call analyses.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseSource {
    Screen,
    File(PathBuf),
    /// Base64 PNG or JPEG sent with the request.
    Inline(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    Screenshot,
    Parse {
        source: ParseSource,
        base_url: Option<String>,
    },
    Click {
        x: i32,
        y: i32,
        clicks: ClickCount,
        button: MouseButton,
    },
    Type {
        text: String,
    },
    Key {
        key: String,
    },
    Scroll {
        direction: ScrollDirection,
    },
    Find {
        query: FindQuery,
    },
    Health {
        base_url: Option<String>,
    },
}

impl ActionRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ActionRequest::Screenshot => "screenshot",
            ActionRequest::Parse { .. } => "parse",
            ActionRequest::Click { .. } => "click",
            ActionRequest::Type { .. } => "type",
            ActionRequest::Key { .. } => "key",
            ActionRequest::Scroll { .. } => "scroll",
            ActionRequest::Find { .. } => "find",
            ActionRequest::Health { .. } => "health",
        }
    }

    /// Whether serving this request needs screen capture or input injection.
    pub fn touches_desktop(&self) -> bool {
        match self {
            ActionRequest::Parse { source, .. } => *source == ParseSource::Screen,
            ActionRequest::Find { .. } | ActionRequest::Health { .. } => false,
            _ => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolCall {
    pub session: SessionId,
    pub request: ActionRequest,
}

pub fn parse_call(args: serde_json::Value) -> DeskResult<ToolCall> {
    let args: ToolArgs = serde_json::from_value(args)
        .map_err(|e| DeskError::InvalidRequest(format!("malformed arguments: {e}")))?;
    let session = match args.session.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => SessionId::new(s),
        _ => SessionId::default(),
    };
    let request = validate(args)?;
    Ok(ToolCall { session, request })
}

pub fn validate(args: ToolArgs) -> DeskResult<ActionRequest> {
    let action = non_empty(args.action.as_deref())
        .ok_or_else(|| DeskError::InvalidRequest("action is required".into()))?;

    let request = match action {
        "screenshot" => ActionRequest::Screenshot,
        // Inline data wins over a path when both are sent.
        "parse" => ActionRequest::Parse {
            source: match (non_empty(args.image_base64.as_deref()), non_empty(args.image_path.as_deref())) {
                (Some(data), _) => ParseSource::Inline(data.to_string()),
                (None, Some(path)) => ParseSource::File(PathBuf::from(path)),
                (None, None) => ParseSource::Screen,
            },
            base_url: non_empty(args.base_url.as_deref()).map(str::to_string),
        },
        "click" => ActionRequest::Click {
            x: required_int(args.x, "x")?,
            y: required_int(args.y, "y")?,
            clicks: match args.clicks {
                None => ClickCount::Single,
                Some(n) if n == 1.0 => ClickCount::Single,
                Some(n) if n == 2.0 => ClickCount::Double,
                Some(n) => return Err(DeskError::InvalidRequest(format!("clicks must be 1 or 2, got {n}"))),
            },
            button: match args.button.as_deref().map(str::trim) {
                None | Some("") | Some("left") => MouseButton::Left,
                Some("right") => MouseButton::Right,
                Some(other) => {
                    return Err(DeskError::InvalidRequest(format!("button must be left or right, got {other}")))
                }
            },
        },
        "type" => ActionRequest::Type {
            text: args
                .text
                .filter(|t| !t.is_empty())
                .ok_or_else(|| DeskError::InvalidRequest("text is required for type".into()))?,
        },
        "key" => ActionRequest::Key {
            key: non_empty(args.key.as_deref())
                .map(str::to_string)
                .ok_or_else(|| DeskError::InvalidRequest("key is required for key".into()))?,
        },
        "scroll" => ActionRequest::Scroll {
            direction: match non_empty(args.direction.as_deref()) {
                Some("up") => ScrollDirection::Up,
                Some("down") => ScrollDirection::Down,
                Some(other) => {
                    return Err(DeskError::InvalidRequest(format!("direction must be up or down, got {other}")))
                }
                None => return Err(DeskError::InvalidRequest("direction is required for scroll".into())),
            },
        },
        "find" => ActionRequest::Find {
            query: match (
                non_empty(args.text.as_deref()).or(non_empty(args.search_text.as_deref())),
                args.x,
                args.y,
            ) {
                (Some(text), _, _) => FindQuery::Text(text.to_string()),
                (None, Some(x), Some(y)) if x.is_finite() && y.is_finite() => FindQuery::Point { x, y },
                _ => {
                    return Err(DeskError::InvalidRequest(
                        "text or (x, y) coordinates required for find".into(),
                    ))
                }
            },
        },
        "health" => ActionRequest::Health {
            base_url: non_empty(args.base_url.as_deref()).map(str::to_string),
        },
        other => return Err(DeskError::UnknownAction(other.to_string())),
    };
    Ok(request)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required_int(value: Option<f64>, field: &str) -> DeskResult<i32> {
    let v = value.ok_or_else(|| DeskError::InvalidRequest(format!("{field} is required")))?;
    if !v.is_finite() || v.fract() != 0.0 || v < i32::MIN as f64 || v > i32::MAX as f64 {
        return Err(DeskError::InvalidRequest(format!("{field} must be an integer, got {v}")));
    }
    Ok(v as i32)
}
