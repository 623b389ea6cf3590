use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use boxmask_rs::{
    CancelToken, DirImageSource, DirOutputSink, DisplaySurface, ImageStatus, JsonAnnotationStore,
    LumaThresholdOracle, MaskPipeline, PipelineConfig, Placement, RegionState,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Segment annotated boxes in a directory of images and write the overlays
#[derive(Parser, Debug)]
#[command(name = "boxmask")]
#[command(about = "Composite box-prompted segmentation masks onto images", long_about = None)]
struct Args {
    /// Directory holding the uploaded images
    #[arg(short, long)]
    images: PathBuf,

    /// Annotation JSON document
    #[arg(short, long)]
    annotations: PathBuf,

    /// Directory receiving masked images and crops
    #[arg(short, long, default_value = "masked_outputs")]
    output: PathBuf,

    /// Pipeline configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Width of the canvas the boxes were drawn on
    #[arg(long)]
    display_width: Option<f64>,

    /// Window that receives mask pixels
    #[arg(long, value_enum)]
    placement: Option<PlacementArg>,

    /// Overlay blend strength in [0, 1]
    #[arg(long)]
    alpha: Option<f32>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum PlacementArg {
    Unpadded,
    Padded,
}

impl From<PlacementArg> for Placement {
    fn from(arg: PlacementArg) -> Self {
        match arg {
            PlacementArg::Unpadded => Placement::Unpadded,
            PlacementArg::Padded => Placement::Padded,
        }
    }
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(width) = args.display_width {
        config.display = DisplaySurface::FixedWidth { width };
    }
    if let Some(placement) = args.placement {
        config.placement = placement.into();
    }
    if let Some(alpha) = args.alpha {
        config.overlay.alpha = alpha;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let store = JsonAnnotationStore::from_file(&args.annotations)
        .with_context(|| format!("reading annotations {}", args.annotations.display()))?;
    let images = DirImageSource::new(&args.images);
    let sink = DirOutputSink::create(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;

    info!(
        images = %args.images.display(),
        records = store.len(),
        output = %args.output.display(),
        "boxmask starting"
    );

    let pipeline = MaskPipeline::new(Arc::new(LumaThresholdOracle::new()), config)?;
    let report = pipeline
        .run_store(Arc::new(images), Arc::new(store), &CancelToken::new())
        .await;

    let written = report.write_outputs(&sink)?;

    for image in &report.images {
        match &image.status {
            ImageStatus::Succeeded(output) => {
                println!(
                    "{}: {} region(s) composited, {} skipped",
                    image.id,
                    output.composited_regions(),
                    output.skipped_regions().count()
                );
                for region in &output.regions {
                    if let RegionState::Skipped(err) = &region.state {
                        println!("  region {}: {}", region.index, err);
                    }
                }
            }
            ImageStatus::Failed { error, regions } => {
                println!("{}: failed: {}", image.id, error);
                for region in regions {
                    if let RegionState::Skipped(err) = &region.state {
                        println!("  region {}: {}", region.index, err);
                    }
                }
            }
            ImageStatus::Cancelled => println!("{}: cancelled", image.id),
        }
    }
    println!("Wrote {} file(s) to {}", written, sink.root().display());

    if report.failed().next().is_some() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
