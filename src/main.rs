// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use drumsync::audio::{self, AudioBackend};
use drumsync::config::{ConfigWatcher, PracticeConfig};
use drumsync::detection::{BpmPipeline, MemoryVoteStore, TempoRequests, Unavailable};
use drumsync::metronome::Metronome;
use drumsync::player::{EmbedApiLoader, SimulatedApi, SimulatedPlayer};
use drumsync::ui::{App, PracticeSession};

const DEFAULT_CONFIG: &str = "drumsync.yaml";
const LOG_FILE: &str = "drumsync.log";
/// Length of the simulated video when no real player is attached
const SIMULATED_VIDEO_SECONDS: f64 = 240.0;

fn print_usage() {
    println!("drumsync - Metronome for drum practice");
    println!();
    println!("Usage: drumsync [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <PATH>     Practice file, YAML or TOML (default {})", DEFAULT_CONFIG);
    println!("  --video-id <URL>    Load a video by URL or 11-character id");
    println!("  --simulate          Run without an audio device");
    println!("  --list-devices      List available audio output devices");
    println!("  --help              Show this help message");
}

/// Options for an interactive session
#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    video: Option<String>,
    simulate: bool,
}

enum Command {
    Run(Options),
    ListDevices,
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut options = Options::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--list-devices" => return Ok(Command::ListDevices),
            "--help" | "-h" => return Ok(Command::Help),
            "--simulate" => options.simulate = true,
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config = Some(PathBuf::from(path));
            }
            "--video-id" => {
                let video = iter
                    .next()
                    .ok_or_else(|| anyhow!("--video-id requires a URL or video id"))?;
                options.video = Some(video.clone());
            }
            other => return Err(anyhow!("Unknown option: {}", other)),
        }
    }

    Ok(Command::Run(options))
}

/// Log to a file so output does not corrupt the terminal UI
fn init_logging(default_level: &str) -> Result<()> {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_owned());
    let file = File::create(LOG_FILE).with_context(|| format!("Failed to create {}", LOG_FILE))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::builder().parse_lossy(directives))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn list_devices() {
    let default = audio::output::default_device_name();
    let devices = audio::output::list_devices();
    if devices.is_empty() {
        println!("No audio output devices found");
        return;
    }
    println!("Audio output devices:");
    for name in devices {
        let marker = if Some(&name) == default.as_ref() { " (default)" } else { "" };
        println!("  {}{}", name, marker);
    }
}

fn run(options: Options) -> Result<()> {
    let config_path = options
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = PracticeConfig::load_or_default(&config_path)?;
    init_logging(&config.log_level)?;
    info!("drumsync starting");
    if !config_path.exists() {
        warn!("Config file {:?} not found, using defaults", config_path);
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    // The stream must outlive the metronome
    let backend = if options.simulate {
        AudioBackend::simulated()
    } else {
        AudioBackend::open(config.audio.clone())
    };

    let metronome = Arc::new(Metronome::with_config(
        backend.device(),
        runtime.handle().clone(),
        &config.scheduler,
    ));

    let pipeline = BpmPipeline::with_config(
        MemoryVoteStore::new(),
        Unavailable,
        Unavailable,
        config.detection.clone(),
    );
    let mut session = PracticeSession::new(
        Arc::clone(&metronome),
        SimulatedPlayer::new(SIMULATED_VIDEO_SECONDS),
    )
    .with_detection(TempoRequests::new(Arc::new(pipeline), runtime.handle().clone()));
    session.apply_config(&config);

    if let Some(video) = &options.video {
        let loader = EmbedApiLoader::new(SimulatedApi);
        match runtime.block_on(loader.ensure_loaded()) {
            Ok(()) => {
                session.load_video(video);
            }
            Err(e) => session.ui_mut().set_status(format!("Video player unavailable: {}", e)),
        }
    }

    if backend.error().is_some() {
        session.ui_mut().set_status("Audio could not initialize");
    }

    let watcher = if config_path.exists() {
        match ConfigWatcher::new(&config_path, None) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Config hot reload disabled: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let mut app = App::new().context("Failed to initialize terminal")?;
    let result = app.run(&mut session, watcher.as_ref(), |session, elapsed| {
        let seconds = elapsed.as_secs_f64();
        backend.advance(seconds);
        session.advance_player(seconds);
    });
    drop(app);

    metronome.dispose();
    drop(backend);
    info!("drumsync stopped");
    result.context("Terminal UI failed")
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match parse_args(&args) {
        Ok(Command::Run(options)) => run(options)?,
        Ok(Command::ListDevices) => list_devices(),
        Ok(Command::Help) => print_usage(),
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
