//! Angle server: receives encoded frames over TCP, runs BODY_25 pose
//! estimation, derives joint angles, and streams per-frame results back to
//! the client as JSON.

use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use jointstream::config::Config;
use jointstream::pipeline::FrameProcessor;
use jointstream::pose::PoseDetector;
use jointstream::session;
use jointstream::worker;

const CONFIG_PATH: &str = "angle_server.toml";

// ---------------------------------------------------------------------------
// Logging (stderr + timestamped file under logs/)
// ---------------------------------------------------------------------------

type LogFile = Arc<Mutex<std::io::BufWriter<std::fs::File>>>;

fn open_log_file() -> Result<LogFile> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/angle_{}.log", ts);
    let file = std::fs::File::create(&path)?;
    eprintln!("Log: {}", path);
    Ok(Arc::new(Mutex::new(std::io::BufWriter::new(file))))
}

macro_rules! log {
    ($logfile:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("{}", msg);
        if let Ok(mut f) = $logfile.lock() {
            let _ = writeln!(f, "{}", msg);
            let _ = f.flush();
        }
    }};
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);
    let logfile = open_log_file()?;

    log!(logfile, "Angle Server ({})", env!("GIT_VERSION"));
    log!(logfile, "Listen: {}", config.listen_addr);
    log!(logfile, "Model: {}", config.model);
    log!(logfile, "Confidence threshold: {}", config.confidence_threshold);
    log!(logfile, "Input size: {}", config.input_size);
    if config.verbose {
        log!(logfile, "Verbose mode: ON");
    }

    let catalog = config.angle_catalog()?;
    for spec in &catalog {
        log!(logfile, "  angle: {}", spec.label());
    }

    let mut detector = PoseDetector::new(&config.model)?;
    detector.warmup(config.input_size)?;
    log!(logfile, "Pose model loaded");

    let processor = FrameProcessor::new(
        detector,
        catalog,
        config.confidence_threshold,
        config.input_size,
        config.verbose,
    );
    let (job_tx, worker_handle) = worker::spawn_inference_worker(processor);

    // Ctrl-C flips the shutdown switch watched by every session
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let bind_addr: std::net::SocketAddr = config
        .listen_addr
        .parse()
        .context("invalid listen_addr")?;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log!(logfile, "Listening on {}", bind_addr);
    log!(logfile, "");

    let mut accept_shutdown = shutdown_rx.clone();
    loop {
        tokio::select! {
            _ = accept_shutdown.changed() => {
                log!(logfile, "Shutdown signal received");
                break;
            }
            accepted = listener.accept() => {
                let (stream, addr) = accepted?;
                stream.set_nodelay(true)?;
                log!(logfile, "Client connected: {}", addr);

                let jobs = job_tx.clone();
                let shutdown = shutdown_rx.clone();
                let logfile = Arc::clone(&logfile);
                tokio::spawn(async move {
                    match session::run_session(stream, jobs, shutdown).await {
                        Ok(()) => log!(logfile, "Client disconnected: {}", addr),
                        Err(e) => log!(logfile, "Session error ({}): {}", addr, e),
                    }
                });
            }
        }
    }

    // Sessions drop their job senders as they wind down; the worker exits
    // once the last one is gone.
    drop(job_tx);
    if worker_handle.join().is_err() {
        log!(logfile, "Inference worker panicked");
    }
    log!(logfile, "Server stopped");
    Ok(())
}
