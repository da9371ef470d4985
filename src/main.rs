#![forbid(unsafe_code)]

mod app;
mod config;
mod demo_world;
mod logging;

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{OverlayConfig, load_config_from_path};

#[derive(Parser, Debug)]
#[command(name = "overlay", about = "Headless run of the overlay build pipeline over a demo world")]
struct Cli {
    /// TOML config; built-in defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of frames to simulate
    #[arg(long, default_value_t = 240)]
    frames: u32,
    /// Sleep between frames in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
    /// Build on the frame thread regardless of the config
    #[arg(long)]
    sync: bool,
    /// Demo world seed
    #[arg(long, default_value_t = 1337)]
    seed: i32,
    /// Log filter (env_logger syntax); overrides RUST_LOG
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.log.as_deref());

    let cfg = match &cli.config {
        Some(path) => {
            let cfg = load_config_from_path(path)?;
            log::info!("loaded config from {}", path.display());
            cfg
        }
        None => OverlayConfig::default(),
    };

    app::run(
        &cfg,
        &app::RunOptions {
            frames: cli.frames,
            frame_ms: cli.frame_ms,
            seed: cli.seed,
            force_sync: cli.sync,
        },
    )
}
