//! Classical intensity-threshold backend.
//!
//! Cells are the pixels brighter than a global level, split into
//! 8-connected components. The level is Otsu's threshold, shifted by the
//! probability threshold: the backend treats pixel intensity as the logit of
//! a cell probability centred on the Otsu level, `INTENSITY_PER_LOGIT` gray
//! levels per logit unit.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::region_labelling::{connected_components, Connectivity};

use super::{Diameter, EvalParams, ModelError, Segmentation, SegmentationModel};
use crate::mask::{label_areas, LabelMask};

/// Gray levels per logit unit of the probability threshold.
const INTENSITY_PER_LOGIT: f32 = 8.0;

/// Diameter reported when auto-estimation finds no cells.
const NOMINAL_DIAMETER_PX: f32 = 30.0;

/// Otsu-threshold segmentation backend.
#[derive(Debug, Clone)]
pub struct ThresholdModel {
    name: String,
    nominal_diameter_px: f32,
}

impl ThresholdModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nominal_diameter_px: NOMINAL_DIAMETER_PX,
        }
    }

    /// Foreground level for `image` under the given probability threshold.
    pub fn level(&self, image: &GrayImage, prob_threshold: Option<f32>) -> u8 {
        let otsu = otsu_level(image) as f32;
        let shift = prob_threshold.filter(|t| t.is_finite()).unwrap_or(0.0);
        (otsu + shift * INTENSITY_PER_LOGIT).clamp(0.0, 255.0) as u8
    }

    /// Equivalent-circle diameter of the median component area.
    fn estimate_diameter(&self, mask: &LabelMask) -> f32 {
        let mut areas: Vec<usize> = label_areas(mask)
            .into_iter()
            .skip(1)
            .filter(|&a| a > 0)
            .collect();
        if areas.is_empty() {
            tracing::warn!(
                "no cells found for diameter estimation; using nominal {:.1} px",
                self.nominal_diameter_px
            );
            return self.nominal_diameter_px;
        }
        areas.sort_unstable();
        let median = areas[areas.len() / 2] as f32;
        2.0 * (median / std::f32::consts::PI).sqrt()
    }
}

impl SegmentationModel for ThresholdModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn eval(&self, image: &GrayImage, params: &EvalParams) -> Result<Segmentation, ModelError> {
        if !params.channels.is_grayscale() {
            return Err(ModelError::UnsupportedChannels(params.channels));
        }

        let level = self.level(image, params.prob_threshold);
        let foreground = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([if image.get_pixel(x, y)[0] > level { 255 } else { 0 }])
        });
        let mask = connected_components(&foreground, Connectivity::Eight, Luma([0u8]));

        let diameter = match params.diameter {
            Diameter::Pixels(d) => d,
            Diameter::Auto => {
                let d = self.estimate_diameter(&mask);
                tracing::info!("Estimated cell diameter: {:.2} px", d);
                d
            }
        };
        tracing::debug!("threshold model: level={}, diameter={:.2}", level, diameter);

        Ok(Segmentation { mask, diameter })
    }
}
