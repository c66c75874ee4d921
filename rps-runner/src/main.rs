//! Executable entry point for the arena.
//!
//! Loads configuration, spawns the population, then runs the frame loop:
//! render, move, resolve collisions, check for a homogeneous population.
//! The loop stops when one kind has taken over (after one last render) or
//! on Ctrl+C.

use clap::Parser;
use crossbeam_channel::{bounded, Receiver};
use hdrhistogram::Histogram;
use log::{info, warn};
use rps_config::{load_config, Config, SenderType, SerializerType};
use rps_simulation::{spawn_population, step, Census, StepOutcome};
use rps_transport::{
    BinarySerializer, JsonSerializer, Region, RenderSurface, Sender, Serializer, SpriteCatalog,
    StdioSender,
};
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

#[cfg(feature = "websocket")]
use rps_transport::WebSocketSender;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the simulation configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config {}: {e}", args.config.display());
            process::exit(1);
        }
    };
    info!("using configuration from {}", args.config.display());

    let mut rng = rand::thread_rng();
    let mut population = spawn_population(&config, &mut rng);
    let census = Census::of(&population);
    info!(
        "spawned {} individuals ({} rock / {} paper / {} scissor)",
        population.len(),
        census.rock,
        census.paper,
        census.scissor
    );

    let serializer = create_serializer(&config);
    let sender = create_sender(&config);
    let sprites = SpriteCatalog::new(
        config.sprites.rock.clone(),
        config.sprites.paper.clone(),
        config.sprites.scissor.clone(),
    );
    let clear = Region {
        x: 0.0,
        y: 0.0,
        width: config.world.width,
        height: config.world.height,
    };
    let mut surface = RenderSurface::new(serializer, sender, sprites, clear, config.entity_size);

    let interrupted = ctrl_c_channel();
    let frame_duration = Duration::from_secs_f64(1.0 / config.framerate as f64);
    let mut frame_times = Histogram::<u64>::new(3).expect("3 significant figures is in range");

    info!("running at {} FPS", config.framerate);
    let survivor = loop {
        let frame_start = Instant::now();

        if interrupted.try_recv().is_ok() {
            info!("interrupted, stopping after {} frames", surface.frames_sent());
            break None;
        }

        // Render pass: the viewer sees the state entering this frame.
        if let Err(e) = surface.present(&population) {
            warn!("failed to send frame: {e}");
        }

        match step(&mut population, config.entity_size) {
            StepOutcome::Continue => {}
            StepOutcome::Settled(kind) => {
                // The terminal frame draws twice, so the viewer shows the
                // arena after the last conversions landed.
                if let Err(e) = surface.present(&population) {
                    warn!("failed to send final frame: {e}");
                }
                break Some(kind);
            }
        }

        let elapsed = frame_start.elapsed();
        frame_times.saturating_record(elapsed.as_micros() as u64);
        if elapsed < frame_duration {
            spin_sleep::sleep(frame_duration - elapsed);
        } else if config.framerate > 10 {
            warn!(
                "frame time exceeded budget: {:?} > {:?}",
                elapsed, frame_duration
            );
        }
    };

    if let Some(kind) = survivor {
        info!(
            "population is homogeneous after {} frames: {kind}",
            surface.frames_sent()
        );
    }
    report_frame_stats(&frame_times);
}

fn ctrl_c_channel() -> Receiver<()> {
    let (tx, rx) = bounded(1);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    }) {
        warn!("failed to install Ctrl+C handler: {e}");
    }
    rx
}

fn report_frame_stats(frame_times: &Histogram<u64>) {
    if frame_times.is_empty() {
        return;
    }
    info!(
        "frame time µs: p50={} p99={} max={}",
        frame_times.value_at_quantile(0.5),
        frame_times.value_at_quantile(0.99),
        frame_times.max()
    );
}

fn create_serializer(config: &Config) -> Box<dyn Serializer> {
    match config.transport.serializer {
        SerializerType::Json => Box::new(JsonSerializer),
        SerializerType::Binary => Box::new(BinarySerializer),
    }
}

#[allow(unused_variables)]
fn create_sender(config: &Config) -> Box<dyn Sender> {
    match config.transport.sender {
        SenderType::Stdio => Box::new(StdioSender::new()),
        SenderType::WebSocket => {
            #[cfg(feature = "websocket")]
            {
                let options = &config.transport.websocket;
                match WebSocketSender::start(&options.host, options.port) {
                    Ok(sender) => {
                        info!(
                            "open the viewer page against ws://{}:{} to watch the arena",
                            options.host, options.port
                        );
                        return Box::new(sender);
                    }
                    Err(e) => {
                        eprintln!("failed to start WebSocket server: {e}");
                        process::exit(1);
                    }
                }
            }

            #[cfg(not(feature = "websocket"))]
            {
                eprintln!("WebSocket sender configured but websocket feature is not enabled!");
                process::exit(1);
            }
        }
    }
}
