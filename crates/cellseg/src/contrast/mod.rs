//! Local contrast enhancement ahead of segmentation.
//!
//! [`normalize_contrast`] runs contrast-limited adaptive histogram
//! equalization (CLAHE) and maps the result onto the full 8-bit range, so
//! the model always sees a `u8` image whose brightest pixel is 255.

mod clahe;

use image::{GrayImage, Luma};

use crate::image_io::IntensityImage;

pub use clahe::equalize_adapthist;

/// CLAHE parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClaheConfig {
    /// Side length of the square contextual region (pixels).
    pub kernel_size: u32,
    /// Histogram clip limit as a fraction of the contextual region size.
    pub clip_limit: f64,
    /// Number of histogram bins.
    pub nbins: u32,
}

impl Default for ClaheConfig {
    fn default() -> Self {
        Self {
            kernel_size: 127,
            clip_limit: 0.01,
            nbins: 256,
        }
    }
}

/// Errors from contrast normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ContrastError {
    /// The image has no pixels.
    Empty,
    /// All pixels share one value, so the intensity range is zero.
    Degenerate {
        /// The shared pixel value.
        value: f32,
    },
    /// The image contains NaN or infinite intensities.
    NonFinite,
    /// A CLAHE parameter is out of range.
    InvalidConfig(String),
}

impl std::fmt::Display for ContrastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "image has no pixels"),
            Self::Degenerate { value } => write!(
                f,
                "image is constant (all pixels = {}); contrast cannot be normalized",
                value
            ),
            Self::NonFinite => write!(f, "image contains non-finite intensities"),
            Self::InvalidConfig(msg) => write!(f, "invalid CLAHE config: {}", msg),
        }
    }
}

impl std::error::Error for ContrastError {}

/// Equalize `image` with CLAHE, then rescale so its maximum maps to 255.
///
/// Values are truncated, not rounded, on the cast to `u8`.
pub fn normalize_contrast(
    image: &IntensityImage,
    config: &ClaheConfig,
) -> Result<GrayImage, ContrastError> {
    let equalized = equalize_adapthist(image, config)?;
    let max = equalized
        .as_raw()
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    if !(max > 0.0) {
        return Err(ContrastError::Degenerate { value: max });
    }
    Ok(GrayImage::from_fn(
        equalized.width(),
        equalized.height(),
        |x, y| {
            let v = equalized.get_pixel(x, y)[0] / max;
            Luma([(255.0 * v) as u8])
        },
    ))
}
