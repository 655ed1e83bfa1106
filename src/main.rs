//! framecrypt server binary
//!
//! # Usage
//!
//! ```bash
//! # Pipe a camera through ffmpeg as MJPEG
//! ffmpeg -f v4l2 -i /dev/video0 -f mjpeg -q:v 5 - | framecrypt --mjpeg-stdin
//!
//! # Replay a directory of JPEG files at 15 fps on port 9000
//! framecrypt --frames-dir ./frames --fps 15 --bind 127.0.0.1:9000
//!
//! # Use fixed key material instead of a random key per run
//! framecrypt --mjpeg-stdin --key <base64 32 bytes> --iv <base64 16 bytes>
//! ```
//!
//! Then open `http://<bind>/` in a browser.
//!
//! With `--mjpeg-stdin`, exit after Ctrl-C waits for the pending stdin read
//! to return. Stop the upstream producer (or close the pipe) so the process
//! can finish.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use framecrypt::{
    CipherConfig, DirectorySource, FrameCipher, FrameSlot, MjpegSource, Pipeline, ServerConfig,
    StreamServer, StreamStats,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Encrypted live frame streaming server
#[derive(Parser, Debug)]
#[command(name = "framecrypt")]
#[command(about = "Stream camera frames to browsers with per-frame AES-256-CBC encryption")]
#[command(version)]
#[command(group(ArgGroup::new("source").required(true).args(["mjpeg_stdin", "frames_dir"])))]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Maximum concurrent stream clients (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

    /// Read an MJPEG byte stream from stdin
    #[arg(long)]
    mjpeg_stdin: bool,

    /// Replay the JPEG files in this directory
    #[arg(long, value_name = "DIR")]
    frames_dir: Option<PathBuf>,

    /// Replay rate for --frames-dir
    #[arg(long, default_value_t = 10.0)]
    fps: f64,

    /// Base64 AES-256 key (random if omitted)
    #[arg(long, requires = "iv")]
    key: Option<String>,

    /// Base64 CBC IV (random if omitted)
    #[arg(long, requires = "key")]
    iv: Option<String>,

    /// Seconds between stats log lines
    #[arg(long, default_value_t = 5)]
    stats_interval_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "framecrypt=debug"
    } else {
        "framecrypt=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cipher_config = match (args.key.as_deref(), args.iv.as_deref()) {
        (Some(key), Some(iv)) => CipherConfig::from_base64(key, iv)?,
        _ => CipherConfig::generate(),
    };
    tracing::info!(
        key_bits = cipher_config.key().len() * 8,
        iv_bits = cipher_config.iv().len() * 8,
        fixed = args.key.is_some(),
        "Cipher configured (AES-256-CBC, PKCS#7)"
    );

    let slot = Arc::new(FrameSlot::new());
    let stats = Arc::new(StreamStats::new());
    let cipher = FrameCipher::new(cipher_config.clone());

    let producer = match args.frames_dir {
        Some(dir) => {
            let source = DirectorySource::open(&dir, args.fps).await?;
            let pipeline = Pipeline::new(source, cipher, Arc::clone(&slot), Arc::clone(&stats));
            tokio::spawn(pipeline.run())
        }
        None => {
            // Runtime shutdown waits for the blocking stdin read to return
            tracing::info!("Reading MJPEG frames from stdin");
            let source = MjpegSource::new(tokio::io::stdin());
            let pipeline = Pipeline::new(source, cipher, Arc::clone(&slot), Arc::clone(&stats));
            tokio::spawn(pipeline.run())
        }
    };

    let config = ServerConfig::with_addr(args.bind)
        .max_connections(args.max_connections)
        .stats_interval(Duration::from_secs(args.stats_interval_secs.max(1)));
    let server = StreamServer::new(config, &cipher_config, slot, stats);

    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received");
            }
            result = producer => match result {
                Ok(Ok(frames)) => tracing::info!(frames = frames, "Producer finished"),
                Ok(Err(e)) => tracing::error!(error = %e, "Producer failed"),
                Err(e) => tracing::error!(error = %e, "Producer task panicked"),
            },
        }
    };

    server.run_until(shutdown).await?;

    Ok(())
}
