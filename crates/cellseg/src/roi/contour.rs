//! Per-label external contour tracing.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};

use crate::mask::{max_label, LabelMask};

/// Inclusive pixel bounding box of one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl LabelBounds {
    fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// Bounding box of every label `0..=max_label` in one raster pass.
///
/// Entry 0 (background) is always `None`, as is any label without pixels.
pub fn label_bounds(mask: &LabelMask) -> Vec<Option<LabelBounds>> {
    let mut bounds: Vec<Option<LabelBounds>> = vec![None; max_label(mask) as usize + 1];
    for (x, y, p) in mask.enumerate_pixels() {
        let label = p[0];
        if label == 0 {
            continue;
        }
        bounds[label as usize]
            .get_or_insert(LabelBounds::at(x, y))
            .include(x, y);
    }
    bounds
}

/// Trace the external boundary of `label` inside `bbox`.
///
/// The label is cropped with a one-pixel background margin and traced with
/// Suzuki-Abe border following. When the label has several components the
/// first outer border in raster order (topmost start pixel) wins; OpenCV's
/// external retrieval lists the last-found border first, so a split label
/// can get a different component there. Holes are ignored. Points are in
/// full-image coordinates.
pub fn external_contour(
    mask: &LabelMask,
    label: u32,
    bbox: LabelBounds,
) -> Option<Vec<[i32; 2]>> {
    let crop_w = bbox.max_x - bbox.min_x + 3;
    let crop_h = bbox.max_y - bbox.min_y + 3;
    let crop = GrayImage::from_fn(crop_w, crop_h, |cx, cy| {
        let inside = cx >= 1
            && cy >= 1
            && cx < crop_w - 1
            && cy < crop_h - 1
            && mask.get_pixel(bbox.min_x + cx - 1, bbox.min_y + cy - 1)[0] == label;
        Luma([if inside { 255 } else { 0 }])
    });

    let ox = bbox.min_x as i32 - 1;
    let oy = bbox.min_y as i32 - 1;
    find_contours::<i32>(&crop)
        .into_iter()
        .find(|c| c.border_type == BorderType::Outer)
        .map(|c| c.points.iter().map(|p| [p.x + ox, p.y + oy]).collect())
}

/// Keep only the vertices where the closed chain changes direction.
///
/// A point is dropped when the step into it equals the step out of it,
/// wrapping around at the ends. Chains shorter than three points are
/// returned unchanged.
pub fn simplify_chain(points: &[[i32; 2]]) -> Vec<[i32; 2]> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |a: [i32; 2], b: [i32; 2]| [b[0] - a[0], b[1] - a[1]];
    let kept: Vec<[i32; 2]> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();
    if kept.is_empty() {
        vec![points[0]]
    } else {
        kept
    }
}
