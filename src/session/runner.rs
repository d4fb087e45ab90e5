//! Session start/stop: a paced producer thread feeding the pipeline through
//! a single-slot handoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use tracing::{debug, info, warn};

use super::pipeline::Pipeline;
use super::slot::LatestSlot;
use crate::hand::FrameSample;

/// Supplies frames in capture order. Owned by the producer thread and
/// dropped there when the session stops.
pub trait FrameSource: Send {
    /// Next frame, blocking as needed. `Ok(None)` ends the stream.
    fn next_frame(&mut self) -> anyhow::Result<Option<FrameSample>>;
}

impl FrameSource for std::vec::IntoIter<FrameSample> {
    fn next_frame(&mut self) -> anyhow::Result<Option<FrameSample>> {
        Ok(self.next())
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Producer pacing.
    pub target_fps: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { target_fps: 30 }
    }
}

impl SessionConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)))
    }
}

/// Throughput and prediction summary of one run.
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    /// Frames read from the source.
    pub frames_captured: u64,
    /// Frames the pipeline processed.
    pub frames_processed: u64,
    /// Frames overwritten in the slot before the pipeline took them.
    pub frames_dropped: u64,
    pub inference_errors: u64,
    pub elapsed: Duration,
    /// Last displayed label.
    pub current_label: Option<String>,
    /// Distinct labels, newest first.
    pub prediction_log: Vec<String>,
    /// Set when the source failed instead of ending normally.
    pub source_error: Option<String>,
}

impl SessionReport {
    /// Processed frames per second over the run.
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_processed as f64 / secs
        } else {
            0.0
        }
    }
}

struct Running {
    stop_requested: Arc<AtomicBool>,
    slot: Arc<LatestSlot<FrameSample>>,
    producer: JoinHandle<anyhow::Result<u64>>,
    consumer: JoinHandle<Pipeline>,
    started: Instant,
}

/// Owns the pipeline between runs and the worker threads during one.
pub struct Session {
    pub config: SessionConfig,
    pipeline: Option<Pipeline>,
    running: Option<Running>,
}

impl Session {
    pub fn new(config: SessionConfig, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline: Some(pipeline),
            running: None,
        }
    }

    /// Spawn the producer and consumer threads.
    pub fn start(&mut self, source: Box<dyn FrameSource>) -> anyhow::Result<()> {
        if self.running.is_some() {
            bail!("session already running");
        }
        let mut pipeline = self
            .pipeline
            .take()
            .ok_or_else(|| anyhow!("session pipeline was lost by an earlier failure"))?;

        let stop_requested = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(LatestSlot::new());

        let consumer = {
            let slot = slot.clone();
            thread::Builder::new()
                .name("mira-pipeline".into())
                .spawn(move || {
                    while let Some(frame) = slot.take() {
                        pipeline.process_frame(frame);
                    }
                    pipeline
                })
                .context("failed to spawn pipeline thread")?
        };

        let producer = {
            let slot = slot.clone();
            let stop_requested = stop_requested.clone();
            let interval = self.config.frame_interval();
            thread::Builder::new()
                .name("mira-capture".into())
                .spawn(move || {
                    let result = produce(source, &slot, &stop_requested, interval);
                    slot.close();
                    result
                })
        };
        let producer = match producer {
            Ok(handle) => handle,
            Err(e) => {
                slot.close();
                if let Ok(pipeline) = consumer.join() {
                    self.pipeline = Some(pipeline);
                }
                return Err(e).context("failed to spawn capture thread");
            }
        };

        info!("Session started at {} fps", self.config.target_fps);
        self.running = Some(Running {
            stop_requested,
            slot,
            producer,
            consumer,
            started: Instant::now(),
        });
        Ok(())
    }

    /// Whether both worker threads are still going. False once the
    /// source is exhausted and the last frame processed.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.consumer.is_finished())
    }

    /// Stop the producer, join it (releasing the source), drain the
    /// consumer and reset the pipeline for the next start.
    pub fn stop(&mut self) -> anyhow::Result<SessionReport> {
        let running = self
            .running
            .take()
            .ok_or_else(|| anyhow!("session not running"))?;

        running.stop_requested.store(true, Ordering::SeqCst);
        running.slot.close();

        let produced = running
            .producer
            .join()
            .map_err(|_| anyhow!("capture thread panicked"))?;
        let mut pipeline = running
            .consumer
            .join()
            .map_err(|_| anyhow!("pipeline thread panicked"))?;
        let elapsed = running.started.elapsed();

        let (frames_captured, source_error) = match produced {
            Ok(n) => (n, None),
            Err(e) => {
                warn!("Frame source failed: {:#}", e);
                (running.slot.delivered() + running.slot.dropped(), Some(format!("{:#}", e)))
            }
        };

        let report = SessionReport {
            frames_captured,
            frames_processed: pipeline.frames(),
            frames_dropped: running.slot.dropped(),
            inference_errors: pipeline.inference_errors(),
            elapsed,
            current_label: pipeline.log().current().map(str::to_string),
            prediction_log: pipeline.log().entries().map(str::to_string).collect(),
            source_error,
        };

        pipeline.reset();
        self.pipeline = Some(pipeline);
        info!(
            "Session stopped: {} frame(s) processed, {} dropped, {:.1} fps",
            report.frames_processed,
            report.frames_dropped,
            report.fps()
        );
        Ok(report)
    }

    /// The idle pipeline, between runs.
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.running.is_some() {
            if let Err(e) = self.stop() {
                warn!("Session shutdown failed: {:#}", e);
            }
        }
    }
}

/// Producer loop. Reads and paces frames until the source ends or a stop
/// is requested. Returns the number of frames captured.
fn produce(
    mut source: Box<dyn FrameSource>,
    slot: &LatestSlot<FrameSample>,
    stop_requested: &AtomicBool,
    interval: Duration,
) -> anyhow::Result<u64> {
    let mut captured = 0u64;
    while !stop_requested.load(Ordering::SeqCst) {
        let tick = Instant::now();
        let Some(frame) = source.next_frame()? else {
            debug!("Frame source exhausted after {} frame(s)", captured);
            break;
        };
        captured += 1;
        if slot.put(frame) {
            debug!(frame = captured, "consumer behind, frame overwritten");
        }
        if let Some(rest) = interval.checked_sub(tick.elapsed()) {
            thread::sleep(rest);
        }
    }
    Ok(captured)
}
