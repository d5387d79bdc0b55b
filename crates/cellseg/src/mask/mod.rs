//! Integer label masks and the cleaning stage applied to raw model output.
//!
//! Value 0 is background; value `k > 0` identifies the k-th cell. After
//! [`clean_mask`] the labels are exactly `1..=max_label` with no gaps.

mod clean;

use image::{ImageBuffer, Luma};

pub use clean::{clean_mask, relabel_sequential, remove_small_objects, trim_border};

/// Per-pixel cell labels, same dimensions as the segmented image.
pub type LabelMask = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Largest label value present (0 for an all-background mask).
pub fn max_label(mask: &LabelMask) -> u32 {
    mask.as_raw().iter().copied().max().unwrap_or(0)
}

/// Pixel count for every label `0..=max_label`, indexed by label.
pub fn label_areas(mask: &LabelMask) -> Vec<usize> {
    let mut areas = vec![0usize; max_label(mask) as usize + 1];
    for &v in mask.as_raw() {
        areas[v as usize] += 1;
    }
    areas
}
