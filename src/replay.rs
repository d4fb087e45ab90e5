//! Recorded detector output played back as a frame source.
//!
//! One frame per line:
//!
//! ```text
//! ; comment
//! (:hands ((:label right :points (x0 y0 x1 y1 ... x20 y20))))
//! (:hands ())
//! ```

use std::collections::VecDeque;
use std::io::BufRead;
use std::path::Path;

use anyhow::{anyhow, Context};
use tracing::{debug, info, warn};

use crate::hand::{FrameSample, HandObservation, Handedness};
use crate::session::FrameSource;
use crate::sexp::{get_keyword, get_value, list_items, number_list};

/// Parse one line. `Ok(None)` for blank lines and comments.
pub fn parse_frame(line: &str) -> anyhow::Result<Option<FrameSample>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') {
        return Ok(None);
    }
    let value = lexpr::from_str(line).map_err(|e| anyhow!("malformed frame: {e}"))?;
    let hands = get_value(&value, "hands").ok_or_else(|| anyhow!("frame missing :hands"))?;

    let mut observations = Vec::new();
    for (i, hand) in list_items(hands).into_iter().enumerate() {
        let label = get_keyword(hand, "label").ok_or_else(|| anyhow!("hand {i} missing :label"))?;
        let handedness =
            Handedness::parse(&label).ok_or_else(|| anyhow!("hand {i} has unknown label {label:?}"))?;
        let coords: Vec<f32> = get_value(hand, "points")
            .and_then(number_list)
            .ok_or_else(|| anyhow!("hand {i} has no numeric :points"))?
            .into_iter()
            .map(|v| v as f32)
            .collect();
        let observation = HandObservation::from_flat(handedness, &coords).ok_or_else(|| {
            anyhow!("hand {i} has {} coordinates, expected 42", coords.len())
        })?;
        observations.push(observation);
    }
    if observations.len() > 2 {
        debug!("Frame has {} hands, tracking the first two", observations.len());
    }
    Ok(Some(FrameSample::from_hands(observations)))
}

/// Frames loaded from a replay file, optionally looped.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: Vec<FrameSample>,
    pending: VecDeque<FrameSample>,
    repeat: bool,
}

impl ReplaySource {
    pub fn new(frames: Vec<FrameSample>, repeat: bool) -> Self {
        Self {
            pending: frames.iter().cloned().collect(),
            frames,
            repeat,
        }
    }

    /// Read frames from `reader`. Malformed lines are logged and skipped.
    pub fn from_reader<R: BufRead>(reader: R, repeat: bool) -> anyhow::Result<Self> {
        let mut frames = Vec::new();
        let mut skipped = 0usize;
        for (n, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("failed to read line {}", n + 1))?;
            match parse_frame(&line) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {}
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping replay line {}: {:#}", n + 1, e);
                }
            }
        }
        if skipped > 0 {
            warn!("{} malformed replay line(s) skipped", skipped);
        }
        Ok(Self::new(frames, repeat))
    }

    pub fn open(path: &Path, repeat: bool) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open replay {}", path.display()))?;
        let source = Self::from_reader(std::io::BufReader::new(file), repeat)?;
        info!("Loaded {} frame(s) from {}", source.len(), path.display());
        Ok(source)
    }

    /// Frames in one pass.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> anyhow::Result<Option<FrameSample>> {
        if self.pending.is_empty() && self.repeat {
            self.pending.extend(self.frames.iter().cloned());
        }
        Ok(self.pending.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::HandLandmark;

    fn points_text(x0: f32) -> String {
        (0..21)
            .map(|i| format!("{} {}", x0 + i as f32 * 0.01, 0.5))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn hand_text(label: &str, x0: f32) -> String {
        format!("(:label {} :points ({}))", label, points_text(x0))
    }

    #[test]
    fn test_parse_one_hand() {
        let line = format!("(:hands ({}))", hand_text("right", 0.2));
        let frame = parse_frame(&line).unwrap().unwrap();
        let hand = match &frame {
            FrameSample::OneHand(hand) => hand,
            other => panic!("expected one hand, got {:?}", other),
        };
        assert_eq!(hand.handedness, Handedness::Right);
        assert!((hand.point(HandLandmark::Wrist).x - 0.2).abs() < 1e-6);
        assert!((hand.point(HandLandmark::PinkyTip).x - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_parse_two_hands() {
        let line = format!("(:hands ({} {}))", hand_text("left", 0.1), hand_text("Right", 0.6));
        let frame = parse_frame(&line).unwrap().unwrap();
        assert_eq!(frame.hand_count(), 2);
    }

    #[test]
    fn test_parse_no_hands() {
        assert_eq!(parse_frame("(:hands ())").unwrap(), Some(FrameSample::NoHand));
    }

    #[test]
    fn test_blank_and_comment_skipped() {
        assert_eq!(parse_frame("   ").unwrap(), None);
        assert_eq!(parse_frame("; recorded 2024-05-01").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_frame("(:hands").is_err());
        assert!(parse_frame("(:frame 1)").is_err());
        assert!(parse_frame("(:hands ((:label middle :points (0.1 0.2))))").is_err());
        let short = "(:hands ((:label left :points (0.1 0.2 0.3))))";
        let err = parse_frame(short).unwrap_err();
        assert!(err.to_string().contains("expected 42"), "got {}", err);
    }

    #[test]
    fn test_reader_skips_malformed_lines() {
        let text = format!(
            "; header\n(:hands ())\nnot a frame (\n\n(:hands ({}))\n",
            hand_text("left", 0.3)
        );
        let mut source = ReplaySource::from_reader(text.as_bytes(), false).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.next_frame().unwrap(), Some(FrameSample::NoHand));
        assert_eq!(source.next_frame().unwrap().map(|f| f.hand_count()), Some(1));
        assert_eq!(source.next_frame().unwrap(), None);
    }

    #[test]
    fn test_repeat_loops() {
        let mut source = ReplaySource::new(vec![FrameSample::NoHand], true);
        for _ in 0..3 {
            assert_eq!(source.next_frame().unwrap(), Some(FrameSample::NoHand));
        }
    }

    #[test]
    fn test_open_missing_file() {
        let err = ReplaySource::open(Path::new("/nonexistent/frames.sexp"), false).unwrap_err();
        assert!(err.to_string().contains("failed to open replay"));
    }
}
