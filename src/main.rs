use anyhow::Context;
use clap::Parser;
use image::DynamicImage;
use page_dewarp::{DewarpConfig, Dewarper};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "page-dewarp")]
#[command(about = "Straighten curved text lines in a scanned page")]
#[command(version)]
pub struct Args {
    /// Page image to dewarp (any format the image crate can decode)
    pub input: PathBuf,

    /// Where to write the dewarped page
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also write the binarized page
    #[arg(long)]
    pub binary: Option<PathBuf>,

    /// Also write the detected curves drawn over the binarized page
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Write a JSON report of per-line outcomes and stage timings
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// JSON file with pipeline parameters (missing fields use defaults)
    #[arg(long, env = "DEWARP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Minimum spacing between text lines, in rows
    #[arg(long, env = "DEWARP_LINE_WINDOW")]
    pub line_window: Option<usize>,

    /// Half-height of the band sampled around each line
    #[arg(long, env = "DEWARP_WINDOW_HEIGHT")]
    pub window_height: Option<u32>,

    /// Background rows inserted between dewarped lines
    #[arg(long, env = "DEWARP_LINE_PADDING")]
    pub line_padding: Option<u32>,

    /// Skip rendering the curve overlay
    #[arg(long)]
    pub no_overlay: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Build the pipeline configuration: file first, then flag overrides
    fn dewarp_config(&self) -> anyhow::Result<DewarpConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => DewarpConfig::default(),
        };

        if let Some(window) = self.line_window {
            config.line_window = window;
        }
        if let Some(height) = self.window_height {
            config.window_height = height;
        }
        if let Some(padding) = self.line_padding {
            config.line_padding = padding;
        }
        if self.no_overlay || self.overlay.is_none() {
            config.draw_overlay = false;
        }

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    run(&args)
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = args.dewarp_config()?;
    let dewarper = Dewarper::new(config)?;

    tracing::info!("Dewarping {}", args.input.display());
    let image = image::open(&args.input)
        .with_context(|| format!("Failed to load image {}", args.input.display()))?;

    let result = dewarper.process_image(&image)?;

    save(DynamicImage::ImageLuma8(result.page.clone()), &args.output)?;
    if let Some(path) = &args.binary {
        save(DynamicImage::ImageLuma8(result.mask.clone()), path)?;
    }
    if let (Some(path), Some(overlay)) = (&args.overlay, &result.overlay) {
        save(DynamicImage::ImageRgb8(overlay.clone()), path)?;
    }
    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }

    tracing::info!(
        "Done in {}ms: {} of {} lines dewarped{}",
        result.total_time_ms,
        result.dewarped_count(),
        result.lines.len(),
        if result.fallback { " (fallback to binary page)" } else { "" }
    );

    Ok(())
}

fn save(image: DynamicImage, path: &Path) -> anyhow::Result<()> {
    image
        .save(path)
        .with_context(|| format!("Failed to write image {}", path.display()))
}
