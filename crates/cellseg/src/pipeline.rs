//! End-to-end segmentation pipeline.
//!
//! [`segment`] runs the in-memory stages (contrast normalization, model
//! evaluation, mask cleaning). [`run`] wraps it with the file I/O used by the
//! command-line tool: load the image, write the mask, and optionally extract
//! and write the ROI archive. Stages run strictly in sequence and the first
//! failure aborts the run. The mask is written before ROIs are extracted, so
//! a failing ROI stage leaves the mask on disk.

use std::path::PathBuf;

use crate::contrast::{normalize_contrast, ClaheConfig, ContrastError};
use crate::image_io::{load_intensity_image, write_label_mask, ImageIoError, IntensityImage};
use crate::mask::{clean_mask, max_label, LabelMask};
use crate::model::{ChannelSpec, Diameter, EvalParams, ModelError, SegmentationModel};
use crate::roi::{extract_rois, write_roi_archive, RoiError};

/// Tuning shared by every pipeline run.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub clahe: ClaheConfig,
    /// Channel layout passed to the model.
    pub channels: ChannelSpec,
}

/// Inputs and outputs of one file-to-file run.
#[derive(Debug, Clone)]
pub struct SegmentRequest {
    pub image_path: PathBuf,
    pub mask_path: PathBuf,
    /// ROI archive destination; `None` skips ROI extraction entirely.
    pub roi_path: Option<PathBuf>,
    pub diameter: Diameter,
    pub prob_threshold: Option<f32>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SegmentReport {
    /// Largest label in the raw model output.
    pub n_raw_labels: u32,
    /// Cells left after cleaning (the cleaned mask's max label).
    pub n_cells: u32,
    /// Diameter used for cleaning, as reported by the model.
    pub diameter: f32,
    /// ROIs written, when an archive was requested.
    pub n_rois: Option<usize>,
}

/// Result of the in-memory stages.
#[derive(Debug, Clone)]
pub struct Segmented {
    /// Cleaned, sequentially labelled mask.
    pub mask: LabelMask,
    pub diameter: f32,
    pub n_raw_labels: u32,
}

/// Errors that abort a pipeline run.
#[derive(Debug)]
pub enum PipelineError {
    Image(ImageIoError),
    Contrast(ContrastError),
    Model(ModelError),
    /// The model returned a mask whose size differs from the image.
    ShapeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    Roi(RoiError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image(e) => write!(f, "{}", e),
            Self::Contrast(e) => write!(f, "contrast normalization failed: {}", e),
            Self::Model(e) => write!(f, "{}", e),
            Self::ShapeMismatch { expected, actual } => write!(
                f,
                "model mask is {}x{}, expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            Self::Roi(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(e) => Some(e),
            Self::Contrast(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Roi(e) => Some(e),
            Self::ShapeMismatch { .. } => None,
        }
    }
}

impl From<ImageIoError> for PipelineError {
    fn from(e: ImageIoError) -> Self {
        Self::Image(e)
    }
}

impl From<ContrastError> for PipelineError {
    fn from(e: ContrastError) -> Self {
        Self::Contrast(e)
    }
}

impl From<ModelError> for PipelineError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<RoiError> for PipelineError {
    fn from(e: RoiError) -> Self {
        Self::Roi(e)
    }
}

/// Normalize, segment and clean one image.
pub fn segment(
    image: &IntensityImage,
    model: &dyn SegmentationModel,
    diameter: Diameter,
    prob_threshold: Option<f32>,
    config: &PipelineConfig,
) -> Result<Segmented, PipelineError> {
    tracing::info!("Segmenting cells");
    let normalized = normalize_contrast(image, &config.clahe)?;
    let params = EvalParams {
        diameter,
        channels: config.channels,
        prob_threshold,
    };
    let seg = model.eval(&normalized, &params)?;

    if seg.mask.dimensions() != image.dimensions() {
        return Err(PipelineError::ShapeMismatch {
            expected: image.dimensions(),
            actual: seg.mask.dimensions(),
        });
    }
    if !(seg.diameter.is_finite() && seg.diameter > 0.0) {
        return Err(ModelError::InvalidDiameter(seg.diameter).into());
    }

    let n_raw_labels = max_label(&seg.mask);
    tracing::info!("Cleaning the segmentation mask");
    let mask = clean_mask(seg.mask, seg.diameter);
    tracing::debug!(
        "{} raw labels -> {} cells (diameter {:.2} px)",
        n_raw_labels,
        max_label(&mask),
        seg.diameter
    );

    Ok(Segmented {
        mask,
        diameter: seg.diameter,
        n_raw_labels,
    })
}

/// Run the full file-to-file pipeline for `request`.
pub fn run(
    request: &SegmentRequest,
    model: &dyn SegmentationModel,
    config: &PipelineConfig,
) -> Result<SegmentReport, PipelineError> {
    if let Ok(json) = serde_json::to_string(config) {
        tracing::debug!("pipeline config: {}", json);
    }
    tracing::debug!(
        "model '{}', diameter {}, prob_threshold {:?}",
        model.name(),
        request.diameter,
        request.prob_threshold
    );

    tracing::info!("Loading the image");
    let image = load_intensity_image(&request.image_path)?;
    tracing::debug!("image size: {}x{}", image.width(), image.height());

    let segmented = segment(
        &image,
        model,
        request.diameter,
        request.prob_threshold,
        config,
    )?;

    tracing::info!("Saving mask");
    write_label_mask(&segmented.mask, &request.mask_path)?;

    let n_rois = match &request.roi_path {
        Some(roi_path) => {
            tracing::info!("Identifying ROIs");
            let rois = extract_rois(&segmented.mask)?;
            tracing::info!("Saving ROIs");
            write_roi_archive(roi_path, &rois)?;
            Some(rois.len())
        }
        None => None,
    };

    Ok(SegmentReport {
        n_raw_labels: segmented.n_raw_labels,
        n_cells: max_label(&segmented.mask),
        diameter: segmented.diameter,
        n_rois,
    })
}
