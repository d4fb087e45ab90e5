//! Landmark normalization and per-frame feature encoding.
//!
//! A hand becomes 42 floats: wrist-zeroed, then divided by the largest
//! absolute coordinate so every value lies in [-1, 1]. A frame becomes 84
//! floats: two 42-float hand slots, zero-filled when a hand is missing.

use super::landmarks::{FrameSample, HandObservation, Handedness, LANDMARK_COUNT};

/// Floats per normalized hand (21 points × x, y).
pub const HAND_FEATURES: usize = LANDMARK_COUNT * 2;

/// Floats per encoded frame (two hand slots).
pub const FRAME_FEATURES: usize = HAND_FEATURES * 2;

/// The detector labels hands as seen by a mirrored camera, so its "Right"
/// hand fills the left slot and "Left" fills the right slot. Trained models
/// depend on this layout.
pub const MIRRORED_HANDEDNESS_CONVENTION: bool = true;

/// Which feature slot a hand occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSlot {
    Left,
    Right,
}

impl FeatureSlot {
    /// Slot for a detector handedness label.
    pub fn for_handedness(handedness: Handedness) -> Self {
        match (handedness, MIRRORED_HANDEDNESS_CONVENTION) {
            (Handedness::Right, true) | (Handedness::Left, false) => Self::Left,
            (Handedness::Left, true) | (Handedness::Right, false) => Self::Right,
        }
    }

    fn offset(&self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => HAND_FEATURES,
        }
    }
}

/// Normalize one hand into a scale- and position-invariant 42-float vector.
pub fn normalize_hand(hand: &HandObservation) -> [f32; HAND_FEATURES] {
    let wrist = hand.points[0];

    let mut max_abs = hand
        .points
        .iter()
        .map(|p| (p.x - wrist.x).abs().max((p.y - wrist.y).abs()))
        .fold(0.0_f32, f32::max);
    if max_abs == 0.0 {
        max_abs = 1.0;
    }

    let mut out = [0.0; HAND_FEATURES];
    for (i, p) in hand.points.iter().enumerate() {
        out[i * 2] = (p.x - wrist.x) / max_abs;
        out[i * 2 + 1] = (p.y - wrist.y) / max_abs;
    }
    out
}

/// Fixed-length two-hand feature vector for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector([f32; FRAME_FEATURES]);

impl FeatureVector {
    /// All-zero vector (no hands).
    pub fn zeros() -> Self {
        Self([0.0; FRAME_FEATURES])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// The 42 floats of one slot.
    pub fn slot(&self, slot: FeatureSlot) -> &[f32] {
        let start = slot.offset();
        &self.0[start..start + HAND_FEATURES]
    }

    fn set_slot(&mut self, slot: FeatureSlot, values: &[f32; HAND_FEATURES]) {
        let start = slot.offset();
        self.0[start..start + HAND_FEATURES].copy_from_slice(values);
    }
}

/// Encode a frame into its 84-float feature vector.
///
/// If the detector reports two hands with the same label, the later one
/// overwrites the earlier one's slot.
pub fn encode_frame(frame: &FrameSample) -> FeatureVector {
    let mut features = FeatureVector::zeros();
    for hand in frame.hands() {
        let slot = FeatureSlot::for_handedness(hand.handedness);
        features.set_slot(slot, &normalize_hand(hand));
    }
    features
}

/// Encode a sequence of frames into one flat vector, oldest first.
pub fn encode_sequence<'a, I>(frames: I) -> Vec<f32>
where
    I: IntoIterator<Item = &'a FrameSample>,
{
    let mut flat = Vec::new();
    for frame in frames {
        flat.extend_from_slice(encode_frame(frame).as_slice());
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::landmarks::{HandLandmark, Point2};

    fn make_hand(handedness: Handedness, seed: f32) -> HandObservation {
        let mut points = [Point2::default(); LANDMARK_COUNT];
        for (i, p) in points.iter_mut().enumerate() {
            let t = i as f32;
            *p = Point2::new(0.4 + (t * seed).sin() * 0.1, 0.6 - (t * 0.7).cos() * 0.15);
        }
        HandObservation::new(handedness, points)
    }

    #[test]
    fn test_normalized_length_and_range() {
        for seed in [0.3_f32, 1.1, 2.7, 5.0] {
            let out = normalize_hand(&make_hand(Handedness::Left, seed));
            assert_eq!(out.len(), 42);
            assert!(
                out.iter().all(|v| (-1.0..=1.0).contains(v)),
                "values out of range for seed {seed}: {out:?}",
            );
            assert!(out.iter().any(|v| v.abs() == 1.0), "max coordinate should map to ±1");
        }
    }

    #[test]
    fn test_wrist_is_origin() {
        let out = normalize_hand(&make_hand(Handedness::Right, 0.9));
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let hand = make_hand(Handedness::Left, 1.3);
        let a = normalize_hand(&hand);
        let b = normalize_hand(&hand);
        assert_eq!(a.map(f32::to_bits), b.map(f32::to_bits));
    }

    #[test]
    fn test_renormalizing_is_noop() {
        let hand = make_hand(Handedness::Left, 2.1);
        let once = normalize_hand(&hand);
        let again = normalize_hand(&HandObservation::from_flat(Handedness::Left, &once).unwrap());
        for (a, b) in once.iter().zip(again.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn test_degenerate_hand_is_zero() {
        let hand = HandObservation::new(Handedness::Left, [Point2::new(0.5, 0.5); LANDMARK_COUNT]);
        assert!(normalize_hand(&hand).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_translation_invariance() {
        let hand = make_hand(Handedness::Left, 0.8);
        let mut shifted = hand.clone();
        for p in shifted.points.iter_mut() {
            p.x += 0.25;
            p.y -= 0.125;
        }
        let a = normalize_hand(&hand);
        let b = normalize_hand(&shifted);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_encode_no_hands_is_zero() {
        let features = encode_frame(&FrameSample::NoHand);
        assert_eq!(features.as_slice().len(), 84);
        assert!(features.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_mirrored_handedness_convention() {
        assert!(MIRRORED_HANDEDNESS_CONVENTION);

        // Detector "Right" lands in the left slot.
        let right = make_hand(Handedness::Right, 1.7);
        let features = encode_frame(&FrameSample::OneHand(right.clone()));
        assert_eq!(features.slot(FeatureSlot::Left), &normalize_hand(&right)[..]);
        assert!(features.slot(FeatureSlot::Right).iter().all(|v| *v == 0.0));

        // Detector "Left" lands in the right slot.
        let left = make_hand(Handedness::Left, 0.4);
        let features = encode_frame(&FrameSample::OneHand(left.clone()));
        assert_eq!(features.slot(FeatureSlot::Right), &normalize_hand(&left)[..]);
        assert!(features.slot(FeatureSlot::Left).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_encode_two_hands() {
        let left = make_hand(Handedness::Left, 0.4);
        let right = make_hand(Handedness::Right, 1.7);
        let features = encode_frame(&FrameSample::TwoHands(left.clone(), right.clone()));
        assert_eq!(features.slot(FeatureSlot::Left), &normalize_hand(&right)[..]);
        assert_eq!(features.slot(FeatureSlot::Right), &normalize_hand(&left)[..]);
        assert!(features.as_slice().iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_encode_sequence_order() {
        let a = FrameSample::OneHand(make_hand(Handedness::Right, 0.5));
        let b = FrameSample::NoHand;
        let flat = encode_sequence([&a, &b]);
        assert_eq!(flat.len(), 2 * FRAME_FEATURES);
        assert_eq!(&flat[..FRAME_FEATURES], encode_frame(&a).as_slice());
        assert!(flat[FRAME_FEATURES..].iter().all(|v| *v == 0.0));
        assert_eq!(flat[HandLandmark::Wrist.index()], 0.0);
    }
}
