// Input synthesis: high-level intents become ordered step plans, executed by
// the desktop backend on the blocking pool under a hard timeout.
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::config::{InputConfig, TimeoutConfig};
use crate::errors::{DeskError, DeskResult};
use crate::executor::keys::{resolve_chord, KeyChord};
use crate::executor::text_input::KeystrokeText;
use crate::platform::{DesktopBackend, InputStep, MouseButton};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
        }
    }

    fn sign(&self) -> i32 {
        match self {
            ScrollDirection::Up => 1,
            ScrollDirection::Down => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickCount {
    Single,
    Double,
}

impl ClickCount {
    pub fn as_u8(&self) -> u8 {
        match self {
            ClickCount::Single => 1,
            ClickCount::Double => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputTiming {
    /// Pause between pointer move and the first button press.
    pub settle: Duration,
    /// Gap between the two click pairs of a double-click.
    pub double_click_gap: Duration,
    /// How long all chord keys stay held before release.
    pub chord_hold: Duration,
    pub scroll_notches: i32,
}

impl Default for InputTiming {
    fn default() -> Self {
        Self::from(&InputConfig::default())
    }
}

impl From<&InputConfig> for InputTiming {
    fn from(cfg: &InputConfig) -> Self {
        Self {
            settle: Duration::from_millis(cfg.settle_delay_ms),
            double_click_gap: Duration::from_millis(cfg.double_click_gap_ms),
            chord_hold: Duration::from_millis(cfg.chord_hold_ms),
            scroll_notches: cfg.scroll_notches,
        }
    }
}

/// Move, settle, then one press/release pair per click. A double-click is
/// two discrete pairs separated by a fixed gap rather than an OS
/// double-click event, so it behaves the same on every backend.
pub fn click_plan(x: i32, y: i32, button: MouseButton, count: ClickCount, timing: &InputTiming) -> Vec<InputStep> {
    let mut steps = vec![
        InputStep::MoveTo { x, y },
        InputStep::Pause(timing.settle),
        InputStep::ButtonDown(button),
        InputStep::ButtonUp(button),
    ];
    if count == ClickCount::Double {
        steps.push(InputStep::Pause(timing.double_click_gap));
        steps.push(InputStep::ButtonDown(button));
        steps.push(InputStep::ButtonUp(button));
    }
    steps
}

pub fn key_plan(chord: &KeyChord, timing: &InputTiming) -> Vec<InputStep> {
    let mut steps: Vec<InputStep> = chord
        .down_sequence()
        .iter()
        .map(|code| InputStep::KeyDown(*code))
        .collect();
    steps.push(InputStep::Pause(timing.chord_hold));
    steps.extend(chord.up_sequence().into_iter().map(InputStep::KeyUp));
    steps
}

pub fn type_plan(text: &str) -> Vec<InputStep> {
    vec![InputStep::Text(KeystrokeText::new(text))]
}

pub fn scroll_plan(direction: ScrollDirection, timing: &InputTiming) -> Vec<InputStep> {
    vec![InputStep::Wheel(direction.sign() * timing.scroll_notches)]
}

pub struct InputSynthesizer {
    backend: Arc<dyn DesktopBackend>,
    timing: InputTiming,
    timeouts: TimeoutConfig,
}

impl InputSynthesizer {
    pub fn new(backend: Arc<dyn DesktopBackend>, timing: InputTiming, timeouts: TimeoutConfig) -> Self {
        Self {
            backend,
            timing,
            timeouts,
        }
    }

    /// Coordinates are passed through as-is; the OS clamps or ignores
    /// out-of-range positions.
    pub async fn click(&self, x: i32, y: i32, button: MouseButton, count: ClickCount) -> DeskResult<serde_json::Value> {
        let steps = click_plan(x, y, button, count, &self.timing);
        self.run_plan("click", steps, self.timeouts.click_secs).await?;

        let message = format!(
            "Clicked at ({x}, {y}) with {} button{}",
            button.as_str(),
            if count == ClickCount::Double { " (double-click)" } else { "" }
        );
        tracing::info!(x, y, button = button.as_str(), clicks = count.as_u8(), "click done");
        Ok(json!({
            "success": true,
            "action": "click",
            "x": x,
            "y": y,
            "clicks": count.as_u8(),
            "button": button.as_str(),
            "message": message,
        }))
    }

    pub async fn type_text(&self, text: &str) -> DeskResult<serde_json::Value> {
        self.run_plan("type", type_plan(text), self.timeouts.type_secs).await?;

        tracing::info!(chars = text.chars().count(), "type done");
        Ok(json!({
            "success": true,
            "action": "type",
            "text": text,
            "message": format!("Typed: \"{text}\""),
        }))
    }

    pub async fn key(&self, chord_str: &str) -> DeskResult<serde_json::Value> {
        let chord = resolve_chord(chord_str)?;
        let steps = key_plan(&chord, &self.timing);
        self.run_plan("key", steps, self.timeouts.key_secs).await?;

        let vk_codes: Vec<u8> = chord.down_sequence().iter().map(|k| k.vk()).collect();
        tracing::info!(key = %chord_str, "key chord done");
        Ok(json!({
            "success": true,
            "action": "key",
            "key": chord_str,
            "keys": chord.down_sequence(),
            "keyCodes": vk_codes,
            "message": format!("Pressed key: {chord_str}"),
        }))
    }

    pub async fn scroll(&self, direction: ScrollDirection) -> DeskResult<serde_json::Value> {
        let steps = scroll_plan(direction, &self.timing);
        self.run_plan("scroll", steps, self.timeouts.scroll_secs).await?;

        tracing::info!(direction = direction.as_str(), "scroll done");
        Ok(json!({
            "success": true,
            "action": "scroll",
            "direction": direction.as_str(),
            "message": format!("Scrolled {}", direction.as_str()),
        }))
    }

    /// Runs one plan as a single blocking unit. On timeout the call is
    /// reported as failed and never retried.
    async fn run_plan(&self, what: &'static str, steps: Vec<InputStep>, limit_secs: u64) -> DeskResult<()> {
        tracing::debug!(what, steps = steps.len(), backend = %self.backend.name(), "executing input plan");
        let backend = Arc::clone(&self.backend);
        let task = tokio::task::spawn_blocking(move || backend.perform(&steps));

        match tokio::time::timeout(Duration::from_secs(limit_secs), task).await {
            Err(_) => Err(DeskError::InputInjectionFailed(format!(
                "{what} timed out after {limit_secs}s"
            ))),
            Ok(Err(join)) => Err(DeskError::InputInjectionFailed(format!("{what} task failed: {join}"))),
            Ok(Ok(result)) => result,
        }
    }
}
