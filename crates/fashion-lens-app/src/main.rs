#![warn(missing_docs)]
//! # fashion-lens binary
//!
//! Headless entry point: analyzes a file or a synthetic camera frame against
//! the configured recommendation service and prints the view state.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use fashion_lens_app::{AppConfig, AppError, FashionLens, LocalFile, app_version, connect};
use fashion_lens_capture::{
    CaptureError, HeadlessSurface, SyntheticCameraPlatform, SyntheticOutcome,
};
use fashion_lens_client::{HttpRecommendationClient, RecommendationService};
use fashion_lens_ui::UiState;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(version = app_version(), about, long_about = None)]
struct Args {
    /// Settings file; defaults to `fashion-lens.toml` when present.
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Uploads an image file and prints the recommendations.
    Analyze {
        /// Image to analyze.
        file: PathBuf,
    },
    /// Captures a still from the synthetic camera and analyzes it.
    Camera {
        /// Simulate a refused permission prompt.
        #[clap(long, action)]
        deny: bool,
        /// Simulate a machine without a camera.
        #[clap(long, action, conflicts_with = "deny")]
        no_device: bool,
        /// Frames the stream needs before it has real dimensions.
        #[clap(long, default_value_t = 0)]
        warmup: u32,
    },
    /// Downloads the latest clothing styles export.
    Download {
        /// Directory to write the export into.
        #[clap(long, default_value = ".")]
        out: PathBuf,
    },
    /// Prints the application version.
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Version => {
            println!("fashion-lens {}", app_version());
        }
        Command::Analyze { file } => {
            let mut lens = headless(&config, SyntheticCameraPlatform::new())?;
            lens.open_upload()?;
            if let Err(error) = lens.analyze_file(&LocalFile::new(&file)).await {
                return Err(report(&lens, error));
            }
            render(lens.state());
        }
        Command::Camera {
            deny,
            no_device,
            warmup,
        } => {
            let platform = SyntheticCameraPlatform::new().with_warmup_frames(warmup);
            if deny {
                platform.set_outcome(SyntheticOutcome::Deny);
            } else if no_device {
                platform.set_outcome(SyntheticOutcome::NoDevice);
            }

            let mut lens = headless(&config, platform)?;
            let result = run_camera(&mut lens).await;
            lens.shutdown();
            if let Err(error) = result {
                return Err(report(&lens, error));
            }
            render(lens.state());
        }
        Command::Download { out } => {
            let mut lens = headless(&config, SyntheticCameraPlatform::new())?;
            let export = match lens.download_styles().await {
                Ok(export) => export,
                Err(error) => return Err(report(&lens, error)),
            };
            let path = out.join(&export.file_name);
            tokio::fs::write(&path, &export.bytes).await?;
            info!(path = %path.display(), bytes = export.bytes.len(), "styles export written");
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn headless(
    config: &AppConfig,
    platform: SyntheticCameraPlatform,
) -> Result<FashionLens<HttpRecommendationClient>, AppError> {
    connect(config, Arc::new(platform), Box::new(HeadlessSurface::new()))
}

async fn run_camera<S: RecommendationService>(lens: &mut FashionLens<S>) -> Result<(), AppError> {
    lens.open_camera(&CancellationToken::new()).await?;

    loop {
        match lens.capture() {
            Ok(_) => break,
            Err(AppError::Capture(CaptureError::FrameNotReady)) => {
                if let Some(notice) = lens.notice() {
                    eprintln!("{}", notice.message);
                }
                tokio::task::yield_now().await;
            }
            Err(error) => return Err(error),
        }
    }

    lens.submit_capture().await?;
    Ok(())
}

fn report<S: RecommendationService>(lens: &FashionLens<S>, error: AppError) -> color_eyre::Report {
    if let Some(notice) = lens.notice() {
        eprintln!("{}", notice.message);
    } else if let Some(message) = lens.state().error_message() {
        eprintln!("{message}");
    }
    eyre!(error)
}

fn render(state: &UiState) {
    println!("{}", state.status_line());
    let Some(result) = state.results() else {
        return;
    };

    println!("Gender:    {}", result.gender);
    println!("Skin tone: {}", result.skin_tone);
    if let Some(face) = &result.detected_face {
        println!("Face crop: {face:?}");
    }
    if !result.has_recommendations() {
        println!("No clothing recommendations.");
        return;
    }
    for (index, item) in result.clothing.iter().enumerate() {
        println!(
            "{}. {} ({}, {}) - {}",
            index + 1,
            item.item,
            item.fabric,
            item.color,
            item.traditional_aspect
        );
        if let Some(url) = &item.image_url {
            println!("   {url}");
        }
    }
}
