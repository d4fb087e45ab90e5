//! Hand landmark data structures.
//!
//! Models the 21-keypoint hand topology produced by the landmark detector,
//! in normalized image coordinates ([0,1] on both axes, y grows downward).
//! A `FrameSample` carries the hands seen in one captured frame.

// ── Landmark definitions ───────────────────────────────────

/// The 21 hand landmarks, in detector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Total number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

impl HandLandmark {
    /// Convert landmark enum to array index (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The four non-thumb fingertips, index to pinky.
    pub fn fingertips() -> [HandLandmark; 4] {
        [Self::IndexTip, Self::MiddleTip, Self::RingTip, Self::PinkyTip]
    }
}

/// A non-thumb finger, used for curl tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// (tip, pip) landmark pair for this finger.
    pub fn joints(&self) -> (HandLandmark, HandLandmark) {
        match self {
            Self::Index => (HandLandmark::IndexTip, HandLandmark::IndexPip),
            Self::Middle => (HandLandmark::MiddleTip, HandLandmark::MiddlePip),
            Self::Ring => (HandLandmark::RingTip, HandLandmark::RingPip),
            Self::Pinky => (HandLandmark::PinkyTip, HandLandmark::PinkyPip),
        }
    }
}

// ── Handedness ─────────────────────────────────────────────

/// Handedness label as reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse a detector label ("Left"/"left", "Right"/"right").
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

// ── Points ─────────────────────────────────────────────────

/// A 2-D point in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point2) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// ── Hand observation ───────────────────────────────────────

/// One detected hand in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandObservation {
    /// Detector handedness label.
    pub handedness: Handedness,
    /// 21 landmarks indexed by `HandLandmark`.
    pub points: [Point2; LANDMARK_COUNT],
}

impl HandObservation {
    pub fn new(handedness: Handedness, points: [Point2; LANDMARK_COUNT]) -> Self {
        Self { handedness, points }
    }

    /// Build from a flat `[x0, y0, x1, y1, ...]` slice.
    /// Returns `None` unless exactly 42 coordinates are given.
    pub fn from_flat(handedness: Handedness, coords: &[f32]) -> Option<Self> {
        if coords.len() != LANDMARK_COUNT * 2 {
            return None;
        }
        let mut points = [Point2::default(); LANDMARK_COUNT];
        for (point, xy) in points.iter_mut().zip(coords.chunks_exact(2)) {
            *point = Point2::new(xy[0], xy[1]);
        }
        Some(Self { handedness, points })
    }

    /// Position of a landmark.
    pub fn point(&self, landmark: HandLandmark) -> Point2 {
        self.points[landmark.index()]
    }

    /// Distance between two landmarks of this hand.
    pub fn distance(&self, a: HandLandmark, b: HandLandmark) -> f32 {
        self.point(a).distance(&self.point(b))
    }

    /// A finger is curled when its tip is closer to the wrist than its PIP joint.
    pub fn is_curled(&self, finger: Finger) -> bool {
        let (tip, pip) = finger.joints();
        self.distance(tip, HandLandmark::Wrist) < self.distance(pip, HandLandmark::Wrist)
    }

    /// Wrist to middle-finger MCP distance, used as the hand's size.
    pub fn scale(&self) -> f32 {
        self.distance(HandLandmark::Wrist, HandLandmark::MiddleMcp)
    }
}

// ── Frame sample ───────────────────────────────────────────

/// Hands detected in one captured frame.
///
/// The hand count changes the whole command grammar, so it is carried as a
/// variant rather than a list length.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSample {
    NoHand,
    OneHand(HandObservation),
    TwoHands(HandObservation, HandObservation),
}

impl FrameSample {
    /// Build from detector output. Hands beyond the second are dropped.
    pub fn from_hands(hands: Vec<HandObservation>) -> Self {
        let mut hands = hands.into_iter();
        match (hands.next(), hands.next()) {
            (None, _) => Self::NoHand,
            (Some(first), None) => Self::OneHand(first),
            (Some(first), Some(second)) => Self::TwoHands(first, second),
        }
    }

    /// The first detected hand, if any.
    pub fn first(&self) -> Option<&HandObservation> {
        match self {
            Self::NoHand => None,
            Self::OneHand(hand) | Self::TwoHands(hand, _) => Some(hand),
        }
    }

    /// All detected hands in detector order.
    pub fn hands(&self) -> Vec<&HandObservation> {
        match self {
            Self::NoHand => Vec::new(),
            Self::OneHand(hand) => vec![hand],
            Self::TwoHands(a, b) => vec![a, b],
        }
    }

    pub fn hand_count(&self) -> usize {
        match self {
            Self::NoHand => 0,
            Self::OneHand(_) => 1,
            Self::TwoHands(_, _) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoHand)
    }
}

// ── Tests ──────────────────────────────────────────────────
