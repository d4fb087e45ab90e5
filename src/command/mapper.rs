//! Real-time command mapping from raw hand observations.
//!
//! Runs once per frame, independent of gesture prediction. A closed fist
//! with the thumb raised wakes the mapper; a fist with the thumb tucked puts
//! it back to sleep. While active, one hand drives the pointer, click, drag,
//! scroll and window-switch gestures, and two hands drive volume.

use tracing::{debug, info};

use super::executor::{Action, ScrollDirection, VolumeDirection};
use crate::hand::{Finger, FrameSample, HandLandmark, HandObservation};
use crate::sexp::bool_atom;

// ── Config ─────────────────────────────────────────────────

/// Thresholds for command mapping. Distances are in normalized image units.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Consecutive qualifying frames needed to switch mode.
    pub debounce_frames: u32,
    /// Frames before the window-switch gesture can fire again.
    pub switch_cooldown_frames: u32,
    /// Index-thumb distance below which the pointer freezes (unless dragging).
    pub freeze_threshold: f32,
    /// Fingertip-thumb distance below which a pinch is engaged.
    pub click_threshold: f32,
    /// Camera border ignored when mapping to screen coordinates.
    pub frame_margin: f32,
    /// How far above the index MCP the thumb tip must be to count as raised.
    pub thumb_high_margin: f32,
    /// Middle-MCP y below which the victory sign scrolls up.
    pub scroll_up_below: f32,
    /// Middle-MCP y above which the victory sign scrolls down.
    pub scroll_down_above: f32,
    /// Minimum change in inter-hand distance for a volume step.
    pub volume_dead_zone: f32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            debounce_frames: 10,
            switch_cooldown_frames: 30,
            freeze_threshold: 0.10,
            click_threshold: 0.05,
            frame_margin: 0.2,
            thumb_high_margin: 0.02,
            scroll_up_below: 0.4,
            scroll_down_above: 0.6,
            volume_dead_zone: 0.02,
        }
    }
}

impl MapperConfig {
    /// Thresholds as plist fields, without the enclosing parens.
    pub fn plist_fields(&self) -> String {
        format!(
            ":debounce-frames {} :switch-cooldown-frames {} :freeze-threshold {:.3} :click-threshold {:.3} :frame-margin {:.3} :thumb-high-margin {:.3} :scroll-up-below {:.3} :scroll-down-above {:.3} :volume-dead-zone {:.3}",
            self.debounce_frames,
            self.switch_cooldown_frames,
            self.freeze_threshold,
            self.click_threshold,
            self.frame_margin,
            self.thumb_high_margin,
            self.scroll_up_below,
            self.scroll_down_above,
            self.volume_dead_zone,
        )
    }
}

// ── State ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sleeping,
    Active,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sleeping => "sleeping",
            Self::Active => "active",
        }
    }
}

/// Mode plus debounce counters, each bounded by `debounce_frames`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationState {
    pub mode: Mode,
    pub activation_counter: u32,
    pub deactivation_counter: u32,
}

impl Default for ActivationState {
    fn default() -> Self {
        Self {
            mode: Mode::Sleeping,
            activation_counter: 0,
            deactivation_counter: 0,
        }
    }
}

/// Pinch flags kept across frames so press/release fire on edges only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinchState {
    /// Index-thumb pinch (drag).
    pub is_pinching_left: bool,
    /// Middle-thumb pinch (click).
    pub is_pinching_right: bool,
}

/// Baseline for the two-hand volume gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolumeTracking {
    pub last_distance: Option<f32>,
}

/// Retrigger lock for the window-switch gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cooldown {
    #[default]
    Idle,
    CoolingDown(u32),
}

impl Cooldown {
    /// Advance one frame.
    pub fn tick(&mut self) {
        if let Self::CoolingDown(remaining) = *self {
            *self = if remaining <= 1 {
                Self::Idle
            } else {
                Self::CoolingDown(remaining - 1)
            };
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn remaining(&self) -> u32 {
        match self {
            Self::Idle => 0,
            Self::CoolingDown(n) => *n,
        }
    }
}

// ── Mapper ─────────────────────────────────────────────────

/// Per-frame state machine turning hand poses into [`Action`]s.
#[derive(Debug, Clone)]
pub struct CommandMapper {
    pub config: MapperConfig,
    activation: ActivationState,
    pinch: PinchState,
    volume: VolumeTracking,
    switch_cooldown: Cooldown,
}

impl CommandMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self {
            config,
            activation: ActivationState::default(),
            pinch: PinchState::default(),
            volume: VolumeTracking::default(),
            switch_cooldown: Cooldown::Idle,
        }
    }

    /// Process one frame and return the actions it triggers, in order.
    pub fn process(&mut self, frame: &FrameSample) -> Vec<Action> {
        let mut actions = Vec::new();

        let primary = match frame {
            FrameSample::NoHand => return actions,
            FrameSample::OneHand(hand) | FrameSample::TwoHands(hand, _) => hand,
        };

        self.switch_cooldown.tick();
        self.update_activation(primary);
        if self.activation.mode == Mode::Sleeping {
            return actions;
        }

        match frame {
            FrameSample::NoHand => {}
            FrameSample::OneHand(hand) => self.single_hand(hand, &mut actions),
            FrameSample::TwoHands(a, b) => self.volume_control(a, b, &mut actions),
        }

        for action in &actions {
            debug!(action = action.as_str(), "mapped");
        }
        actions
    }

    // ── Activation ──

    fn update_activation(&mut self, hand: &HandObservation) {
        let debounce = self.config.debounce_frames.max(1);
        let folded = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky]
            .iter()
            .all(|f| hand.is_curled(*f));
        let thumb_high = hand.point(HandLandmark::ThumbTip).y
            < hand.point(HandLandmark::IndexMcp).y - self.config.thumb_high_margin;

        let state = &mut self.activation;
        if folded && thumb_high {
            state.deactivation_counter = 0;
            state.activation_counter = (state.activation_counter + 1).min(debounce);
            if state.activation_counter >= debounce {
                state.activation_counter = 0;
                if state.mode == Mode::Sleeping {
                    state.mode = Mode::Active;
                    info!("Gesture control activated");
                }
            }
        } else if folded {
            state.activation_counter = 0;
            state.deactivation_counter = (state.deactivation_counter + 1).min(debounce);
            if state.deactivation_counter >= debounce {
                state.deactivation_counter = 0;
                if state.mode == Mode::Active {
                    state.mode = Mode::Sleeping;
                    info!("Gesture control deactivated");
                }
            }
        } else {
            state.activation_counter = state.activation_counter.saturating_sub(1);
            state.deactivation_counter = 0;
        }
    }

    // ── Single hand ──

    fn single_hand(&mut self, hand: &HandObservation, actions: &mut Vec<Action>) {
        let index = !hand.is_curled(Finger::Index);
        let middle = !hand.is_curled(Finger::Middle);
        let ring = !hand.is_curled(Finger::Ring);
        let pinky = !hand.is_curled(Finger::Pinky);

        // Ring folded, others out: window switch.
        if index && middle && !ring && pinky {
            if self.switch_cooldown.is_idle() {
                actions.push(Action::SwitchWindow);
                self.switch_cooldown = Cooldown::CoolingDown(self.config.switch_cooldown_frames);
            }
            return;
        }

        // Victory sign: scroll by hand height.
        if index && middle && !ring && !pinky {
            let y = hand.point(HandLandmark::MiddleMcp).y;
            if y < self.config.scroll_up_below {
                actions.push(Action::Scroll(ScrollDirection::Up));
            } else if y > self.config.scroll_down_above {
                actions.push(Action::Scroll(ScrollDirection::Down));
            }
            return;
        }

        self.pointer(hand, actions);
    }

    fn pointer(&mut self, hand: &HandObservation, actions: &mut Vec<Action>) {
        let click = self.config.click_threshold;
        let dist_left = hand.distance(HandLandmark::IndexTip, HandLandmark::ThumbTip);
        let dist_right = hand.distance(HandLandmark::MiddleTip, HandLandmark::ThumbTip);

        if dist_left > self.config.freeze_threshold || self.pinch.is_pinching_left {
            let anchor = hand.point(HandLandmark::IndexMcp);
            let x = 1.0 - self.screen_ratio(anchor.x);
            let y = self.screen_ratio(anchor.y);
            actions.push(Action::MoveCursor { x, y });
        }

        if dist_left < click && !self.pinch.is_pinching_left {
            self.pinch.is_pinching_left = true;
            actions.push(Action::PressLeft);
        } else if dist_left > click && self.pinch.is_pinching_left {
            self.pinch.is_pinching_left = false;
            actions.push(Action::ReleaseLeft);
        }

        if dist_right < click && !self.pinch.is_pinching_right {
            self.pinch.is_pinching_right = true;
            actions.push(Action::ClickRight);
        } else if dist_right > click && self.pinch.is_pinching_right {
            self.pinch.is_pinching_right = false;
        }
    }

    /// Stretch [margin, 1 - margin] to [0, 1], clamped.
    fn screen_ratio(&self, v: f32) -> f32 {
        let margin = self.config.frame_margin;
        let span = 1.0 - 2.0 * margin;
        if span <= 0.0 {
            return 0.5;
        }
        ((v - margin) / span).clamp(0.0, 1.0)
    }

    // ── Two hands ──

    fn volume_control(&mut self, a: &HandObservation, b: &HandObservation, actions: &mut Vec<Action>) {
        let dist = a
            .point(HandLandmark::IndexTip)
            .distance(&b.point(HandLandmark::IndexTip));

        let Some(baseline) = self.volume.last_distance else {
            self.volume.last_distance = Some(dist);
            return;
        };

        let delta = dist - baseline;
        if delta > self.config.volume_dead_zone {
            actions.push(Action::ChangeVolume(VolumeDirection::Up));
            self.volume.last_distance = Some(dist);
        } else if delta < -self.config.volume_dead_zone {
            actions.push(Action::ChangeVolume(VolumeDirection::Down));
            self.volume.last_distance = Some(dist);
        }
    }

    // ── Accessors ──

    pub fn mode(&self) -> Mode {
        self.activation.mode
    }

    pub fn is_active(&self) -> bool {
        self.activation.mode == Mode::Active
    }

    pub fn activation(&self) -> &ActivationState {
        &self.activation
    }

    pub fn pinch(&self) -> PinchState {
        self.pinch
    }

    pub fn volume(&self) -> VolumeTracking {
        self.volume
    }

    pub fn switch_cooldown(&self) -> Cooldown {
        self.switch_cooldown
    }

    /// Return to the initial sleeping state.
    pub fn reset(&mut self) {
        self.activation = ActivationState::default();
        self.pinch = PinchState::default();
        self.volume = VolumeTracking::default();
        self.switch_cooldown = Cooldown::Idle;
    }

    /// Generate s-expression for status reporting.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:mode :{} :activation {} :deactivation {} :pinch-left {} :pinch-right {} :switch-cooldown {} :volume-baseline {})",
            self.activation.mode.as_str(),
            self.activation.activation_counter,
            self.activation.deactivation_counter,
            bool_atom(self.pinch.is_pinching_left),
            bool_atom(self.pinch.is_pinching_right),
            self.switch_cooldown.remaining(),
            self.volume
                .last_distance
                .map(|d| format!("{:.3}", d))
                .unwrap_or_else(|| "nil".to_string()),
        )
    }

    /// Generate s-expression for the effective thresholds.
    pub fn config_sexp(&self) -> String {
        format!("({})", self.config.plist_fields())
    }
}

impl Default for CommandMapper {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

// ── Test helpers ───────────────────────────────────────────

/// Hand with the wrist at `wrist`. Extended fingers reach 0.35 above the
/// wrist, curled ones stop at 0.10; PIPs sit at 0.22 and MCPs at 0.15.
#[cfg(test)]
pub(crate) fn make_hand(wrist: (f32, f32), extended: [bool; 4], thumb_high: bool) -> HandObservation {
    use crate::hand::{Handedness, Point2, LANDMARK_COUNT};

    let (wx, wy) = wrist;
    let mut points = [Point2::new(wx, wy); LANDMARK_COUNT];
    let columns = [
        (HandLandmark::IndexMcp, HandLandmark::IndexPip, HandLandmark::IndexTip, -0.04),
        (HandLandmark::MiddleMcp, HandLandmark::MiddlePip, HandLandmark::MiddleTip, 0.0),
        (HandLandmark::RingMcp, HandLandmark::RingPip, HandLandmark::RingTip, 0.04),
        (HandLandmark::PinkyMcp, HandLandmark::PinkyPip, HandLandmark::PinkyTip, 0.08),
    ];
    for ((mcp, pip, tip, dx), out) in columns.into_iter().zip(extended) {
        points[mcp.index()] = Point2::new(wx + dx, wy - 0.15);
        points[pip.index()] = Point2::new(wx + dx, wy - 0.22);
        let reach = if out { 0.35 } else { 0.10 };
        points[tip.index()] = Point2::new(wx + dx, wy - reach);
    }
    let thumb_y = if thumb_high { wy - 0.25 } else { wy - 0.10 };
    points[HandLandmark::ThumbTip.index()] = Point2::new(wx - 0.2, thumb_y);
    HandObservation::new(Handedness::Right, points)
}

#[cfg(test)]
pub(crate) fn fist_hand(thumb_high: bool) -> HandObservation {
    make_hand((0.5, 0.8), [false; 4], thumb_high)
}

#[cfg(test)]
pub(crate) fn open_hand() -> HandObservation {
    make_hand((0.5, 0.8), [true; 4], true)
}

#[cfg(test)]
fn set_point(hand: &mut HandObservation, landmark: HandLandmark, x: f32, y: f32) {
    hand.points[landmark.index()] = crate::hand::Point2::new(x, y);
}

// ── Tests ──────────────────────────────────────────────────
