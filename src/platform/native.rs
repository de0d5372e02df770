//! Native backend: `xcap` for capture, `enigo` for input injection.

use enigo::{Axis, Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use image::RgbaImage;
use xcap::Monitor;

use crate::errors::{DeskError, DeskResult};
use crate::executor::keys::KeyCode;
use crate::executor::text_input::KeystrokeText;
use crate::perception::types::ScreenshotMeta;
use crate::platform::plan::{self, InputSink};
use crate::platform::{dpi, CapturedFrame, DesktopBackend, InputStep, MouseButton};

pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        dpi::set_dpi_aware();
        Self
    }
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopBackend for NativeBackend {
    fn name(&self) -> &str {
        "native"
    }

    fn capture(&self) -> DeskResult<CapturedFrame> {
        let monitors = Monitor::all()
            .map_err(|e| DeskError::CaptureFailed(format!("enumerate monitors: {e}")))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary())
            .or_else(|| monitors.first())
            .ok_or_else(|| DeskError::CaptureFailed("no monitor found".into()))?;

        let raw = monitor
            .capture_image()
            .map_err(|e| DeskError::CaptureFailed(format!("capture primary monitor: {e}")))?;
        // xcap 0.0 builds on an older `image` major; move the pixels across.
        let image = adopt_frame(raw.width(), raw.height(), raw.into_raw())?;

        let scale_factor = match monitor.scale_factor() as f64 {
            s if s.is_finite() && s > 0.0 => s,
            _ => 1.0,
        };
        let (physical_width, physical_height) = (image.width(), image.height());
        let meta = ScreenshotMeta {
            monitor_name: monitor.name().to_string(),
            scale_factor,
            physical_width,
            physical_height,
            logical_width: (physical_width as f64 / scale_factor).round() as u32,
            logical_height: (physical_height as f64 / scale_factor).round() as u32,
        };
        tracing::debug!(
            monitor = %meta.monitor_name,
            width = physical_width,
            height = physical_height,
            scale = scale_factor,
            "primary monitor captured"
        );
        Ok(CapturedFrame { image, meta })
    }

    fn perform(&self, steps: &[InputStep]) -> DeskResult<()> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| {
            DeskError::InputInjectionFailed(format!("failed to create Enigo: {e}"))
        })?;
        plan::execute_plan(&mut EnigoSink(enigo), steps)
    }
}

/// Rebuilds an RGBA8 buffer as this crate's `RgbaImage`.
fn adopt_frame(width: u32, height: u32, pixels: Vec<u8>) -> DeskResult<RgbaImage> {
    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| DeskError::CaptureFailed("frame buffer does not match its dimensions".into()))
}

struct EnigoSink(Enigo);

impl InputSink for EnigoSink {
    type Key = Key;

    fn resolve_key(&self, code: KeyCode) -> DeskResult<Key> {
        to_enigo_key(code)
    }

    fn move_to(&mut self, x: i32, y: i32) -> DeskResult<()> {
        self.0.move_mouse(x, y, Coordinate::Abs).map_err(injection_failed)
    }

    fn button(&mut self, button: MouseButton, press: bool) -> DeskResult<()> {
        self.0
            .button(to_enigo_button(button), direction(press))
            .map_err(injection_failed)
    }

    fn key(&mut self, key: &Key, press: bool) -> DeskResult<()> {
        self.0.key(*key, direction(press)).map_err(injection_failed)
    }

    fn text(&mut self, text: &KeystrokeText) -> DeskResult<()> {
        self.0.text(&text.to_literal()).map_err(injection_failed)
    }

    // enigo scrolls down for positive lengths.
    fn wheel(&mut self, notches: i32) -> DeskResult<()> {
        self.0.scroll(-notches, Axis::Vertical).map_err(injection_failed)
    }
}

fn direction(press: bool) -> Direction {
    if press {
        Direction::Press
    } else {
        Direction::Release
    }
}

fn injection_failed(e: impl std::fmt::Display) -> DeskError {
    DeskError::InputInjectionFailed(e.to_string())
}

fn to_enigo_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
    }
}

fn to_enigo_key(code: KeyCode) -> DeskResult<Key> {
    let key = match code {
        KeyCode::Control => Key::Control,
        KeyCode::Alt => Key::Alt,
        KeyCode::Shift => Key::Shift,
        KeyCode::LeftMeta => Key::Meta,
        KeyCode::Enter => Key::Return,
        KeyCode::Tab => Key::Tab,
        KeyCode::Escape => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Space => Key::Space,
        KeyCode::Up => Key::UpArrow,
        KeyCode::Down => Key::DownArrow,
        KeyCode::Left => Key::LeftArrow,
        KeyCode::Right => Key::RightArrow,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::CapsLock => Key::CapsLock,
        KeyCode::F(n) => function_key(n)?,
        KeyCode::Char(c) => Key::Unicode(c.to_ascii_lowercase()),
        KeyCode::RightMeta
        | KeyCode::Insert
        | KeyCode::PrintScreen
        | KeyCode::Pause
        | KeyCode::NumLock
        | KeyCode::ScrollLock => match native_code(code) {
            Some(raw) => Key::Other(raw),
            None => {
                return Err(DeskError::InputInjectionFailed(format!(
                    "key {} is not available on this platform",
                    code.name()
                )))
            }
        },
    };
    Ok(key)
}

fn function_key(n: u8) -> DeskResult<Key> {
    Ok(match n {
        1 => Key::F1,
        2 => Key::F2,
        3 => Key::F3,
        4 => Key::F4,
        5 => Key::F5,
        6 => Key::F6,
        7 => Key::F7,
        8 => Key::F8,
        9 => Key::F9,
        10 => Key::F10,
        11 => Key::F11,
        12 => Key::F12,
        other => return Err(DeskError::UnknownKey(format!("f{other}"))),
    })
}

/// Platform key code for keys enigo has no portable variant for.
#[cfg(windows)]
fn native_code(code: KeyCode) -> Option<u32> {
    Some(code.vk() as u32)
}

/// X11 keysyms.
#[cfg(all(unix, not(target_os = "macos")))]
fn native_code(code: KeyCode) -> Option<u32> {
    match code {
        KeyCode::RightMeta => Some(0xffec),
        KeyCode::Insert => Some(0xff63),
        KeyCode::PrintScreen => Some(0xff61),
        KeyCode::Pause => Some(0xff13),
        KeyCode::NumLock => Some(0xff7f),
        KeyCode::ScrollLock => Some(0xff14),
        _ => None,
    }
}

/// macOS virtual key codes (kVK_*).
#[cfg(target_os = "macos")]
fn native_code(code: KeyCode) -> Option<u32> {
    match code {
        KeyCode::RightMeta => Some(0x36),
        KeyCode::Insert => Some(0x72),
        KeyCode::NumLock => Some(0x47),
        _ => None,
    }
}

#[cfg(not(any(windows, unix)))]
fn native_code(_code: KeyCode) -> Option<u32> {
    None
}
