//! Host platform detection and the desktop capability interface.
//!
//! Everything above this module talks to the desktop through
//! [`DesktopBackend`]; the concrete backend is picked once, at startup,
//! from the detected [`HostPlatform`].

mod dpi;
pub mod native;
pub mod plan;

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use serde::Serialize;

use crate::errors::DeskResult;
use crate::executor::keys::KeyCode;
use crate::executor::text_input::KeystrokeText;
use crate::perception::types::ScreenshotMeta;

pub use dpi::set_dpi_aware;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    MacOs,
    Linux,
    Other(String),
}

impl HostPlatform {
    pub fn detect() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn from_os_name(os: &str) -> Self {
        match os {
            "windows" => HostPlatform::Windows,
            "macos" => HostPlatform::MacOs,
            "linux" => HostPlatform::Linux,
            other => HostPlatform::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            HostPlatform::Windows => "windows",
            HostPlatform::MacOs => "macos",
            HostPlatform::Linux => "linux",
            HostPlatform::Other(name) => name,
        }
    }

    pub fn supports_native_backend(&self) -> bool {
        !matches!(self, HostPlatform::Other(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
}

impl MouseButton {
    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
        }
    }
}

/// One low-level input event. Plans are executed strictly in order.
#[derive(Debug, Clone, PartialEq)]
pub enum InputStep {
    MoveTo { x: i32, y: i32 },
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    Text(KeystrokeText),
    /// Wheel notches; positive scrolls up.
    Wheel(i32),
    Pause(Duration),
}

/// Raw frame straight from the OS, in physical pixels.
pub struct CapturedFrame {
    pub image: RgbaImage,
    pub meta: ScreenshotMeta,
}

/// Capability interface implemented once per target OS.
///
/// Both methods block; callers run them on the blocking pool under a timeout.
pub trait DesktopBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Captures the primary display at its physical resolution.
    fn capture(&self) -> DeskResult<CapturedFrame>;

    /// Executes an input plan in order, including its pauses.
    fn perform(&self, steps: &[InputStep]) -> DeskResult<()>;
}

/// Returns the backend for `platform`, or `None` when desktop control is
/// unavailable on it.
pub fn select_backend(platform: &HostPlatform) -> Option<Arc<dyn DesktopBackend>> {
    if !platform.supports_native_backend() {
        tracing::warn!(platform = %platform.name(), "no desktop backend for this platform");
        return None;
    }
    tracing::info!(platform = %platform.name(), "using native desktop backend");
    Some(Arc::new(native::NativeBackend::new()))
}
