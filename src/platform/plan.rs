//! Executes an input plan against a low-level sink.
//!
//! Every key is resolved before the first event is sent, so a chord with a
//! key the sink cannot produce fails without touching the desktop. If an
//! event fails midway, keys and buttons still held are released in reverse
//! press order before the error is returned.

use std::time::Duration;

use crate::errors::DeskResult;
use crate::executor::keys::KeyCode;
use crate::executor::text_input::KeystrokeText;
use crate::platform::{InputStep, MouseButton};

/// Raw event surface of one input backend.
pub trait InputSink {
    type Key: Clone;

    fn resolve_key(&self, code: KeyCode) -> DeskResult<Self::Key>;
    fn move_to(&mut self, x: i32, y: i32) -> DeskResult<()>;
    fn button(&mut self, button: MouseButton, press: bool) -> DeskResult<()>;
    fn key(&mut self, key: &Self::Key, press: bool) -> DeskResult<()>;
    fn text(&mut self, text: &KeystrokeText) -> DeskResult<()>;
    /// Positive scrolls up.
    fn wheel(&mut self, notches: i32) -> DeskResult<()>;
    fn pause(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

enum Prepared<'a, K> {
    Key { code: KeyCode, key: K, press: bool },
    Other(&'a InputStep),
}

enum Held<K> {
    Key(KeyCode, K),
    Button(MouseButton),
}

pub fn execute_plan<S: InputSink>(sink: &mut S, steps: &[InputStep]) -> DeskResult<()> {
    let prepared = steps
        .iter()
        .map(|step| {
            Ok(match step {
                InputStep::KeyDown(code) => Prepared::Key { code: *code, key: sink.resolve_key(*code)?, press: true },
                InputStep::KeyUp(code) => Prepared::Key { code: *code, key: sink.resolve_key(*code)?, press: false },
                other => Prepared::Other(other),
            })
        })
        .collect::<DeskResult<Vec<_>>>()?;

    let mut held: Vec<Held<S::Key>> = Vec::new();
    for step in &prepared {
        if let Err(e) = apply(sink, step, &mut held) {
            release_all(sink, held);
            return Err(e);
        }
    }
    Ok(())
}

fn apply<S: InputSink>(sink: &mut S, step: &Prepared<'_, S::Key>, held: &mut Vec<Held<S::Key>>) -> DeskResult<()> {
    match step {
        Prepared::Key { code, key, press: true } => {
            sink.key(key, true)?;
            held.push(Held::Key(*code, key.clone()));
        }
        Prepared::Key { code, key, press: false } => {
            sink.key(key, false)?;
            if let Some(pos) = held.iter().rposition(|h| matches!(h, Held::Key(c, _) if c == code)) {
                held.remove(pos);
            }
        }
        Prepared::Other(InputStep::ButtonDown(button)) => {
            sink.button(*button, true)?;
            held.push(Held::Button(*button));
        }
        Prepared::Other(InputStep::ButtonUp(button)) => {
            sink.button(*button, false)?;
            if let Some(pos) = held.iter().rposition(|h| matches!(h, Held::Button(b) if b == button)) {
                held.remove(pos);
            }
        }
        Prepared::Other(InputStep::MoveTo { x, y }) => sink.move_to(*x, *y)?,
        Prepared::Other(InputStep::Text(text)) => sink.text(text)?,
        Prepared::Other(InputStep::Wheel(notches)) => sink.wheel(*notches)?,
        Prepared::Other(InputStep::Pause(delay)) => sink.pause(*delay),
        // Key steps are always prepared as `Prepared::Key`.
        Prepared::Other(InputStep::KeyDown(_) | InputStep::KeyUp(_)) => {}
    }
    Ok(())
}

fn release_all<S: InputSink>(sink: &mut S, held: Vec<Held<S::Key>>) {
    for h in held.into_iter().rev() {
        let released = match &h {
            Held::Key(_, key) => sink.key(key, false),
            Held::Button(button) => sink.button(*button, false),
        };
        if let Err(e) = released {
            tracing::warn!(error = %e, "release after failed plan did not go through");
        }
    }
}
