//! Cell outlines as polygon regions of interest.
//!
//! Every label of a cleaned mask becomes one [`Roi`]: the label's external
//! contour, reduced to the vertices where the boundary changes direction.
//! ROIs are named by their zero-based export position and can be written as
//! an ImageJ-compatible zip archive with [`write_roi_archive`].

mod archive;
mod contour;
pub mod imagej;

use std::path::PathBuf;

use crate::mask::{max_label, LabelMask};

pub use archive::write_roi_archive;
pub use contour::{external_contour, label_bounds, simplify_chain, LabelBounds};

/// Closed polygon outline of one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roi {
    /// Export name (zero-based position as a decimal string).
    pub name: String,
    /// Vertices `[x, y]` in image pixel coordinates.
    pub points: Vec<[i32; 2]>,
}

impl Roi {
    pub fn new(name: impl Into<String>, points: Vec<[i32; 2]>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Inclusive bounding box `(min_xy, max_xy)`.
    pub fn bounds(&self) -> Option<([i32; 2], [i32; 2])> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                [lo[0].min(p[0]), lo[1].min(p[1])],
                [hi[0].max(p[0]), hi[1].max(p[1])],
            )
        }))
    }

    /// Unsigned polygon area (shoelace formula) in square pixels.
    pub fn polygon_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let [x0, y0] = self.points[i];
                let [x1, y1] = self.points[(i + 1) % n];
                x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
            })
            .sum();
        twice.unsigned_abs() as f64 / 2.0
    }
}

/// Errors from ROI extraction and encoding.
#[derive(Debug)]
pub enum RoiError {
    /// A label in `1..=max_label` has no pixels, so the mask is not dense.
    EmptyLabel(u32),
    /// The polygon has more vertices than the ROI format can store.
    TooManyPoints { name: String, n: usize },
    /// A vertex does not fit the format's 16-bit coordinates.
    CoordinateOverflow { name: String, x: i32, y: i32 },
    /// Filesystem failure while writing the archive.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Zip container failure while writing the archive.
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

impl std::fmt::Display for RoiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLabel(label) => {
                write!(f, "label {} has no pixels; mask labels are not sequential", label)
            }
            Self::TooManyPoints { name, n } => {
                write!(f, "ROI '{}' has {} vertices (max {})", name, n, u16::MAX)
            }
            Self::CoordinateOverflow { name, x, y } => write!(
                f,
                "ROI '{}' vertex ({}, {}) is outside the 16-bit coordinate range",
                name, x, y
            ),
            Self::Io { path, source } => {
                write!(f, "failed to write ROI archive {}: {}", path.display(), source)
            }
            Self::Zip { path, source } => {
                write!(f, "failed to write ROI archive {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for RoiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Zip { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One ROI per label `1..=max_label`, in label order.
///
/// The mask must be sequentially labelled (as produced by
/// [`crate::mask::clean_mask`]); a missing label is reported as
/// [`RoiError::EmptyLabel`].
pub fn extract_rois(mask: &LabelMask) -> Result<Vec<Roi>, RoiError> {
    let top = max_label(mask);
    let bounds = label_bounds(mask);
    (1..=top)
        .map(|label| {
            let bbox = bounds[label as usize].ok_or(RoiError::EmptyLabel(label))?;
            let contour =
                external_contour(mask, label, bbox).ok_or(RoiError::EmptyLabel(label))?;
            let name = (label - 1).to_string();
            Ok(Roi::new(name, simplify_chain(&contour)))
        })
        .collect()
}
