//! Hand observations and their feature encoding.

pub mod landmarks;
pub mod normalize;

pub use landmarks::{
    Finger, FrameSample, HandLandmark, HandObservation, Handedness, Point2, LANDMARK_COUNT,
};
pub use normalize::{
    encode_frame, encode_sequence, normalize_hand, FeatureSlot, FeatureVector, FRAME_FEATURES,
    HAND_FEATURES, MIRRORED_HANDEDNESS_CONVENTION,
};
