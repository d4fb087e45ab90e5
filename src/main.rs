//! Mira - replays recorded hand landmarks through the gesture interpreter.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{info, warn};

use mira_gestures::classify::ModelStore;
use mira_gestures::command::LogExecutor;
use mira_gestures::replay::ReplaySource;
use mira_gestures::session::{Pipeline, Session};
use mira_gestures::InterpreterConfig;

/// Global flag set by SIGTERM/SIGINT handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

#[derive(Parser, Debug)]
#[command(name = "mira", about = "Hand-gesture interpreter for recorded landmark streams")]
struct Cli {
    /// Replay file of detected hands, one frame per line
    #[arg(long)]
    frames: PathBuf,

    /// Config plist overriding default thresholds
    #[arg(long)]
    config: Option<PathBuf>,

    /// Static-pose model file
    #[arg(long)]
    static_model: Option<PathBuf>,

    /// Dynamic-sequence model file
    #[arg(long)]
    dynamic_model: Option<PathBuf>,

    /// Frame rate to replay at (overrides config)
    #[arg(long)]
    fps: Option<u32>,

    /// Classification window length in frames (overrides config)
    #[arg(long)]
    window: Option<usize>,

    /// Restart the replay when it ends; run until interrupted
    #[arg(long = "loop")]
    repeat: bool,

    /// Also print cursor moves, not just discrete actions
    #[arg(long)]
    echo_moves: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

/// Install signal handlers for graceful shutdown (SIGTERM, SIGINT).
fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mira=info,mira_gestures=info".into()),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => InterpreterConfig::load(path)?,
        None => InterpreterConfig::default(),
    };
    if let Some(fps) = cli.fps {
        config.session.target_fps = fps;
    }
    if let Some(window) = cli.window {
        config.classifier.window_size = window;
    }
    config.validate()?;

    if cli.print_config {
        println!("{}", config.config_sexp());
        return Ok(());
    }

    info!("mira v{} starting", env!("CARGO_PKG_VERSION"));

    let models = ModelStore::load(cli.static_model.as_deref(), cli.dynamic_model.as_deref());
    if !models.is_ready() {
        warn!("Gesture models not ready; predictions will report \"not ready\"");
    }

    let source = ReplaySource::open(&cli.frames, cli.repeat)?;
    if source.is_empty() {
        warn!("Replay {} contains no frames", cli.frames.display());
    }

    let pipeline = Pipeline::from_config(&config, models, Box::new(LogExecutor::new(cli.echo_moves)));
    let mut session = Session::new(config.session.clone(), pipeline);

    install_signal_handlers();
    session.start(Box::new(source))?;

    let started = Instant::now();
    let mut last_status_log = Instant::now();
    let status_interval = Duration::from_secs(10);
    while session.is_running() {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            info!("Shutdown signal received, stopping session");
            break;
        }
        if last_status_log.elapsed() >= status_interval {
            info!("Session running for {}s", started.elapsed().as_secs());
            last_status_log = Instant::now();
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let report = session.stop()?;
    info!(
        "Processed {} of {} frame(s) ({} dropped, {} inference error(s)) in {:.1}s, {:.1} fps",
        report.frames_processed,
        report.frames_captured,
        report.frames_dropped,
        report.inference_errors,
        report.elapsed.as_secs_f64(),
        report.fps(),
    );
    if let Some(label) = &report.current_label {
        info!("Last prediction: {}", label);
    }
    if !report.prediction_log.is_empty() {
        info!("Prediction log (newest first): {}", report.prediction_log.join(", "));
    }
    if let Some(err) = report.source_error {
        anyhow::bail!("frame source failed: {}", err);
    }
    Ok(())
}
