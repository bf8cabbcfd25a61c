// SPDX-License-Identifier: GPL-3.0-only

use camera_support::backends::camera::FlashMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-support")]
#[command(about = "Drive the camera plugin from the command line")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras and the presets they support
    List,

    /// Take a photo
    Photo {
        /// Output file path (default: ~/Pictures/camera/IMG_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Flash mode (off, on, auto)
        #[arg(short, long)]
        flash: Option<FlashMode>,
    },

    /// Run the preview and report the frames the texture receives
    Preview {
        /// Number of frames to wait for
        #[arg(short, long, default_value = "30")]
        frames: u64,
    },

    /// Send a single method call and print the encoded reply
    Call {
        /// Method name, e.g. getPlatformVersion
        method: String,

        /// Arguments as JSON
        #[arg(short, long)]
        args: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=camera_support=debug for session and pipeline detail
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_cameras(),
        Commands::Photo { output, flash } => cli::take_photo(output, flash),
        Commands::Preview { frames } => cli::run_preview(frames),
        Commands::Call { method, args } => cli::send_call(&method, args.as_deref()),
    }
}
