//! Action enum — user intents and internal events handled by the App.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Step sizes for the tone keys.
pub const GAIN_STEP_DB: f32 = 1.0;
pub const PAN_STEP_UI: f32 = 5.0;
pub const VOLUME_STEP: f32 = 5.0;
pub const SEEK_STEP_SECS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    TogglePause,
    Stop,
    Next,
    Prev,
    SeekRelative(f64),
    Mute,

    // ── Tone ─────────────────────────────────────────────────────────────────
    BassDelta(f32),
    TrebleDelta(f32),
    PanDelta(f32),
    VolumeDelta(f32),
    ResetTone,

    // ── System ───────────────────────────────────────────────────────────────
    ToggleHelp,
    Quit,
    Noop,
}

impl Action {
    pub fn from_key(key: KeyEvent) -> Self {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }
        match key.code {
            KeyCode::Char(' ') => Action::TogglePause,
            KeyCode::Char('s') => Action::Stop,
            KeyCode::Char('n') => Action::Next,
            KeyCode::Char('p') => Action::Prev,
            KeyCode::Right => Action::SeekRelative(SEEK_STEP_SECS),
            KeyCode::Left => Action::SeekRelative(-SEEK_STEP_SECS),
            KeyCode::Char('m') => Action::Mute,
            KeyCode::Char('B') => Action::BassDelta(GAIN_STEP_DB),
            KeyCode::Char('b') => Action::BassDelta(-GAIN_STEP_DB),
            KeyCode::Char('T') => Action::TrebleDelta(GAIN_STEP_DB),
            KeyCode::Char('t') => Action::TrebleDelta(-GAIN_STEP_DB),
            KeyCode::Char(']') => Action::PanDelta(PAN_STEP_UI),
            KeyCode::Char('[') => Action::PanDelta(-PAN_STEP_UI),
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => {
                Action::VolumeDelta(VOLUME_STEP)
            }
            KeyCode::Char('-') | KeyCode::Down => Action::VolumeDelta(-VOLUME_STEP),
            KeyCode::Char('0') => Action::ResetTone,
            KeyCode::Char('?') => Action::ToggleHelp,
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            _ => Action::Noop,
        }
    }
}
