use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use rvs::config;
use rvs::RvsConfig;

/// rvs: park arbitrary files inside lossless video for hosts that never
/// expose object storage.
#[derive(Parser)]
#[command(name = "rvs", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file into a video
    Encode {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output video path (.mkv)
        #[arg(short, long)]
        output: PathBuf,

        /// Encrypt the file with a password
        #[arg(short, long)]
        password: Option<String>,

        /// Frame width (default: 3840)
        #[arg(long, default_value_t = config::DEFAULT_FRAME_WIDTH)]
        width: u32,

        /// Frame height (default: 2160)
        #[arg(long, default_value_t = config::DEFAULT_FRAME_HEIGHT)]
        height: u32,

        /// Frames per second (default: 30)
        #[arg(long, default_value_t = config::DEFAULT_FPS)]
        fps: u32,

        /// Chunk size in bytes (default: 4096)
        #[arg(long, default_value_t = config::DEFAULT_CHUNK_SIZE)]
        chunk_size: u32,

        /// Fountain redundancy as a fraction (default: 0.30 = 30%)
        #[arg(long, default_value_t = config::DEFAULT_REDUNDANCY)]
        redundancy: f32,
    },

    /// Decode a video back into the original file
    Decode {
        /// Input video path (.mkv)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Decryption password (required if the file was encrypted)
        #[arg(short, long)]
        password: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            input,
            output,
            password,
            width,
            height,
            fps,
            chunk_size,
            redundancy,
        } => {
            let cfg = RvsConfig {
                chunk_size,
                redundancy,
                frame_width: width,
                frame_height: height,
                fps,
                ..Default::default()
            };

            rvs::encode_file(&input, &output, password.as_deref(), &cfg)?;
        }

        Commands::Decode {
            input,
            output,
            password,
        } => {
            rvs::decode_file(&input, &output, password.as_deref())?;
        }
    }

    Ok(())
}
