//! OS-level actions and the executor that carries them out.
//!
//! Input injection itself lives outside this crate. The mapper produces
//! [`Action`] values and the session hands them to an [`ActionExecutor`].

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::sexp::format_event;

/// Scroll direction for the victory-sign gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Wheel clicks: positive scrolls up.
    pub fn clicks(&self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

/// Volume step direction for the two-hand gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDirection {
    Up,
    Down,
}

impl VolumeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// One fire-and-forget command for the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move the pointer to a screen ratio in [0, 1] on each axis.
    MoveCursor { x: f32, y: f32 },
    PressLeft,
    ReleaseLeft,
    ClickRight,
    Scroll(ScrollDirection),
    SwitchWindow,
    ChangeVolume(VolumeDirection),
}

impl Action {
    /// Event name for IPC-style output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MoveCursor { .. } => "move-cursor",
            Self::PressLeft => "press-left",
            Self::ReleaseLeft => "release-left",
            Self::ClickRight => "click-right",
            Self::Scroll(_) => "scroll",
            Self::SwitchWindow => "switch-window",
            Self::ChangeVolume(_) => "change-volume",
        }
    }

    /// Render as an event s-expression.
    pub fn to_sexp(&self) -> String {
        match self {
            Self::MoveCursor { x, y } => format_event(
                self.as_str(),
                &[("x", &format!("{:.3}", x)), ("y", &format!("{:.3}", y))],
            ),
            Self::Scroll(dir) => {
                format_event(self.as_str(), &[("direction", &format!(":{}", dir.as_str()))])
            }
            Self::ChangeVolume(dir) => {
                format_event(self.as_str(), &[("direction", &format!(":{}", dir.as_str()))])
            }
            _ => format_event(self.as_str(), &[]),
        }
    }
}

/// Receives actions from the mapper. All methods are fire-and-forget.
pub trait ActionExecutor: Send {
    fn move_cursor(&mut self, x: f32, y: f32);
    fn press_left(&mut self);
    fn release_left(&mut self);
    fn click_right(&mut self);
    fn scroll(&mut self, direction: ScrollDirection);
    fn switch_window(&mut self);
    fn change_volume(&mut self, direction: VolumeDirection);

    /// Dispatch one action to the matching method.
    fn execute(&mut self, action: &Action) {
        match *action {
            Action::MoveCursor { x, y } => self.move_cursor(x, y),
            Action::PressLeft => self.press_left(),
            Action::ReleaseLeft => self.release_left(),
            Action::ClickRight => self.click_right(),
            Action::Scroll(direction) => self.scroll(direction),
            Action::SwitchWindow => self.switch_window(),
            Action::ChangeVolume(direction) => self.change_volume(direction),
        }
    }
}

// ── Log executor ───────────────────────────────────────────

/// Writes each action as an event s-expression to stdout.
///
/// Cursor moves are only traced at debug level unless `echo_moves` is set,
/// since they arrive every frame.
#[derive(Debug, Default)]
pub struct LogExecutor {
    pub echo_moves: bool,
    emitted: u64,
}

impl LogExecutor {
    pub fn new(echo_moves: bool) -> Self {
        Self {
            echo_moves,
            emitted: 0,
        }
    }

    /// Events written so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn emit(&mut self, action: Action) {
        debug!(action = action.as_str(), "execute");
        if matches!(action, Action::MoveCursor { .. }) && !self.echo_moves {
            return;
        }
        println!("{}", action.to_sexp());
        self.emitted += 1;
    }
}

impl ActionExecutor for LogExecutor {
    fn move_cursor(&mut self, x: f32, y: f32) {
        self.emit(Action::MoveCursor { x, y });
    }

    fn press_left(&mut self) {
        self.emit(Action::PressLeft);
    }

    fn release_left(&mut self) {
        self.emit(Action::ReleaseLeft);
    }

    fn click_right(&mut self) {
        self.emit(Action::ClickRight);
    }

    fn scroll(&mut self, direction: ScrollDirection) {
        self.emit(Action::Scroll(direction));
    }

    fn switch_window(&mut self) {
        self.emit(Action::SwitchWindow);
    }

    fn change_volume(&mut self, direction: VolumeDirection) {
        self.emit(Action::ChangeVolume(direction));
    }
}

// ── Recording executor ─────────────────────────────────────

/// Collects actions in memory. Clones share the same record, so a handle
/// kept outside a running session can inspect what was executed.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    actions: Arc<Mutex<Vec<Action>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.clear();
        }
    }

    fn record(&self, action: Action) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.push(action);
        }
    }
}

impl ActionExecutor for RecordingExecutor {
    fn move_cursor(&mut self, x: f32, y: f32) {
        self.record(Action::MoveCursor { x, y });
    }

    fn press_left(&mut self) {
        self.record(Action::PressLeft);
    }

    fn release_left(&mut self) {
        self.record(Action::ReleaseLeft);
    }

    fn click_right(&mut self) {
        self.record(Action::ClickRight);
    }

    fn scroll(&mut self, direction: ScrollDirection) {
        self.record(Action::Scroll(direction));
    }

    fn switch_window(&mut self) {
        self.record(Action::SwitchWindow);
    }

    fn change_volume(&mut self, direction: VolumeDirection) {
        self.record(Action::ChangeVolume(direction));
    }
}
