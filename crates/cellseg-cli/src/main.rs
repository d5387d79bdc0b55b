//! cellseg CLI — segment cells in a 2D image and export masks and ROIs.

use clap::Parser;
use std::path::PathBuf;

use cellseg::pipeline::{self, PipelineConfig, SegmentReport, SegmentRequest};
use cellseg::{load_model, Diameter};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Parser)]
#[command(name = "cellseg")]
#[command(
    about = "Segment cells in a 2D grayscale image; write a label mask and optional ImageJ ROIs"
)]
#[command(version)]
struct Cli {
    /// Path to the input image (single channel).
    image_path: PathBuf,

    /// Segmentation model identifier (e.g. threshold, otsu).
    model_name: String,

    /// Cell probability threshold passed to the model.
    /// Non-numeric values keep the model default.
    #[arg(allow_hyphen_values = true)]
    prob_thresh: String,

    /// Expected cell diameter in pixels.
    /// Any non-numeric value (e.g. "auto") estimates it from the image.
    #[arg(allow_hyphen_values = true)]
    cell_diameter: String,

    /// Path to write the 16-bit label mask (format from extension).
    output_mask_file: PathBuf,

    /// Path to write the ROI zip archive. ROIs are skipped when omitted.
    output_zip: Option<PathBuf>,
}

impl Cli {
    fn prob_threshold(&self) -> Option<f32> {
        self.prob_thresh
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|t| t.is_finite())
    }

    fn diameter(&self) -> Diameter {
        Diameter::from_arg(&self.cell_diameter)
    }

    fn to_request(&self) -> SegmentRequest {
        SegmentRequest {
            image_path: self.image_path.clone(),
            mask_path: self.output_mask_file.clone(),
            roi_path: self.output_zip.clone(),
            diameter: self.diameter(),
            prob_threshold: self.prob_threshold(),
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    run(&cli)?;
    Ok(())
}

// ── segment ────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> CliResult<SegmentReport> {
    tracing::info!("Initializing the model");
    let model = load_model(&cli.model_name)?;

    let request = cli.to_request();
    if cli.prob_threshold().is_none() {
        tracing::debug!(
            "prob_thresh '{}' is not a number; using the model default",
            cli.prob_thresh
        );
    }

    let report = pipeline::run(&request, model.as_ref(), &PipelineConfig::default())?;

    tracing::info!(
        "Segmented {} cells ({} raw labels), diameter {:.2} px",
        report.n_cells,
        report.n_raw_labels,
        report.diameter
    );
    tracing::info!("Mask written to {}", request.mask_path.display());
    if let (Some(n), Some(path)) = (report.n_rois, &request.roi_path) {
        tracing::info!("{} ROIs written to {}", n, path.display());
    }
    Ok(report)
}
