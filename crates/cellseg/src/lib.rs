//! cellseg — post-processing pipeline for 2D cell segmentation.
//!
//! The segmentation itself is delegated to a [`SegmentationModel`] backend.
//! Everything around it lives here. The pipeline stages are:
//!
//! 1. **Load** – single-channel image into an `f32` intensity buffer.
//! 2. **Contrast** – contrast-limited adaptive histogram equalization,
//!    rescaled to the full 8-bit range.
//! 3. **Model** – label mask + cell diameter from the selected backend.
//! 4. **Clean** – border trim, small-object removal, sequential relabeling.
//! 5. **Mask output** – 16-bit label image.
//! 6. **ROI** – external contour per label, encoded as ImageJ polygon ROIs
//!    and written to a zip archive.
//!
//! # Public API
//! - [`pipeline::run`] for the file-to-file flow used by the CLI
//! - [`pipeline::segment`] for the in-memory flow
//! - stage functions in [`contrast`], [`mask`] and [`roi`] for callers that
//!   want to compose their own pipeline

pub mod contrast;
pub mod image_io;
pub mod mask;
pub mod model;
pub mod pipeline;
pub mod roi;

#[cfg(test)]
pub(crate) mod test_utils;

pub use contrast::{normalize_contrast, ClaheConfig, ContrastError};
pub use image_io::{load_intensity_image, write_label_mask, ImageIoError, IntensityImage};
pub use mask::{clean_mask, max_label, LabelMask};
pub use model::{
    load_model, ChannelSpec, Diameter, EvalParams, ModelError, Segmentation, SegmentationModel,
};
pub use pipeline::{PipelineConfig, PipelineError, SegmentReport, SegmentRequest, Segmented};
pub use roi::{extract_rois, write_roi_archive, Roi, RoiError};
