//! Shared test utilities: synthetic cell images, literal label masks and a
//! scripted segmentation backend.

use std::cell::RefCell;

use image::{GrayImage, Luma};

use crate::image_io::IntensityImage;
use crate::mask::LabelMask;
use crate::model::{EvalParams, ModelError, Segmentation, SegmentationModel};

/// Render filled disks on a uniform background.
///
/// Pixels within `radius` of a disk center get `cell_pix`, everything else
/// `bg_pix`.
pub(crate) fn draw_disk_image(
    w: u32,
    h: u32,
    disks: &[([f32; 2], f32)],
    cell_pix: u8,
    bg_pix: u8,
) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let inside = disks.iter().any(|&(c, r)| {
                let dx = x as f32 - c[0];
                let dy = y as f32 - c[1];
                dx * dx + dy * dy <= r * r
            });
            img.put_pixel(x, y, Luma([if inside { cell_pix } else { bg_pix }]));
        }
    }
    img
}

/// The same disks as raw `f32` intensities, e.g. a 12-bit camera frame.
pub(crate) fn disk_intensity_image(
    w: u32,
    h: u32,
    disks: &[([f32; 2], f32)],
    cell_value: f32,
    bg_value: f32,
) -> IntensityImage {
    let gray = draw_disk_image(w, h, disks, 255, 0);
    IntensityImage::from_fn(w, h, |x, y| {
        Luma([if gray.get_pixel(x, y)[0] > 0 {
            cell_value
        } else {
            bg_value
        }])
    })
}

/// Gaussian-blur a `GrayImage` via `imageproc`.
pub(crate) fn blur_gray(img: &GrayImage, sigma: f32) -> GrayImage {
    imageproc::filter::gaussian_blur_f32(img, sigma)
}

/// Build a label mask from literal rows (`rows[y][x]`).
pub(crate) fn label_mask_from_rows(rows: &[&[u32]]) -> LabelMask {
    let h = rows.len() as u32;
    let w = rows.first().map_or(0, |r| r.len()) as u32;
    LabelMask::from_fn(w, h, |x, y| Luma([rows[y as usize][x as usize]]))
}

/// Label mask with one filled disk per entry, labelled 1, 2, ... in order.
pub(crate) fn disk_label_mask(w: u32, h: u32, disks: &[([f32; 2], f32)]) -> LabelMask {
    LabelMask::from_fn(w, h, |x, y| {
        let label = disks
            .iter()
            .position(|&(c, r)| {
                let dx = x as f32 - c[0];
                let dy = y as f32 - c[1];
                dx * dx + dy * dy <= r * r
            })
            .map_or(0, |i| i as u32 + 1);
        Luma([label])
    })
}

/// Backend that returns a fixed mask and records every call.
pub(crate) struct ScriptedModel {
    pub mask: LabelMask,
    /// Diameter reported when the caller asks for auto-estimation.
    pub estimated_diameter: f32,
    pub calls: RefCell<Vec<EvalParams>>,
}

impl ScriptedModel {
    pub(crate) fn new(mask: LabelMask, estimated_diameter: f32) -> Self {
        Self {
            mask,
            estimated_diameter,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl SegmentationModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn eval(&self, _image: &GrayImage, params: &EvalParams) -> Result<Segmentation, ModelError> {
        self.calls.borrow_mut().push(params.clone());
        Ok(Segmentation {
            mask: self.mask.clone(),
            diameter: params.diameter.pixels().unwrap_or(self.estimated_diameter),
        })
    }
}
