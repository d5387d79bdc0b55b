//! Segmentation model capability and backend registry.
//!
//! The pipeline only knows the [`SegmentationModel`] trait: given a
//! contrast-normalized 8-bit image, an expected cell diameter (or
//! [`Diameter::Auto`]) and a channel layout, a backend returns a label mask
//! and the diameter it actually used. Backends are selected by name through
//! [`load_model`].

mod threshold;

use image::GrayImage;

use crate::mask::LabelMask;

pub use threshold::ThresholdModel;

/// Model identifiers accepted by [`load_model`].
pub const KNOWN_MODELS: &[&str] = &["threshold", "otsu"];

/// Expected cell diameter in pixels, or a request to estimate it per image.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diameter {
    /// Estimate the diameter from the image.
    #[default]
    Auto,
    /// Fixed diameter in pixels (finite, > 0).
    Pixels(f32),
}

impl Diameter {
    /// Parse a command-line value.
    ///
    /// Anything that is not a finite positive number (`"auto"`, `"abc"`,
    /// `"0"`, `"nan"`) means [`Diameter::Auto`]; this never fails.
    pub fn from_arg(raw: &str) -> Self {
        Self::from_value(raw.trim().parse::<f32>().ok())
    }

    /// Map an optional numeric value onto the diameter model.
    pub fn from_value(value: Option<f32>) -> Self {
        match value {
            Some(v) if v.is_finite() && v > 0.0 => Self::Pixels(v),
            _ => Self::Auto,
        }
    }

    /// Fixed diameter, if one was given.
    pub fn pixels(self) -> Option<f32> {
        match self {
            Self::Auto => None,
            Self::Pixels(v) => Some(v),
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }
}

impl std::fmt::Display for Diameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Pixels(v) => write!(f, "{} px", v),
        }
    }
}

/// Two-element channel layout `[segment_channel, nuclear_channel]`.
///
/// `[0, 0]` means a single grayscale channel, the only layout the pipeline
/// produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChannelSpec(pub [u32; 2]);

impl ChannelSpec {
    pub const GRAYSCALE: Self = Self([0, 0]);

    pub fn is_grayscale(self) -> bool {
        self == Self::GRAYSCALE
    }
}

impl Default for ChannelSpec {
    fn default() -> Self {
        Self::GRAYSCALE
    }
}

/// Inputs to a single model evaluation besides the image itself.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalParams {
    pub diameter: Diameter,
    pub channels: ChannelSpec,
    /// Cell-probability threshold (logit units, 0 = backend default
    /// decision boundary). `None` keeps the backend default.
    pub prob_threshold: Option<f32>,
}

impl Default for EvalParams {
    fn default() -> Self {
        Self {
            diameter: Diameter::Auto,
            channels: ChannelSpec::GRAYSCALE,
            prob_threshold: None,
        }
    }
}

/// Model output consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Per-pixel labels, background 0. Labels may have gaps.
    pub mask: LabelMask,
    /// Diameter used for this image: the supplied value, or the estimate
    /// when [`Diameter::Auto`] was requested. Always concrete.
    pub diameter: f32,
}

/// Errors raised by model selection or evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No backend is registered under this identifier.
    UnknownModel(String),
    /// The backend cannot process this channel layout.
    UnsupportedChannels(ChannelSpec),
    /// The backend reported a diameter that is not finite and positive.
    InvalidDiameter(f32),
    /// Backend-specific failure.
    Backend(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownModel(name) => write!(
                f,
                "unknown model '{}' (available: {})",
                name,
                KNOWN_MODELS.join(", ")
            ),
            Self::UnsupportedChannels(ch) => {
                write!(f, "unsupported channel layout [{}, {}]", ch.0[0], ch.0[1])
            }
            Self::InvalidDiameter(d) => write!(f, "model returned invalid diameter {}", d),
            Self::Backend(msg) => write!(f, "model failure: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

/// A segmentation backend.
pub trait SegmentationModel {
    /// Identifier the backend was registered under.
    fn name(&self) -> &str;

    /// Segment `image` (8-bit, contrast-normalized).
    fn eval(&self, image: &GrayImage, params: &EvalParams) -> Result<Segmentation, ModelError>;
}

/// Instantiate the backend registered as `name`.
pub fn load_model(name: &str) -> Result<Box<dyn SegmentationModel>, ModelError> {
    match name {
        "threshold" | "otsu" => Ok(Box::new(ThresholdModel::new(name))),
        _ => Err(ModelError::UnknownModel(name.to_string())),
    }
}
