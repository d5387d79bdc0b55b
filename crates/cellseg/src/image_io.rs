//! Image loading and label-mask persistence.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, ImageReader, Luma};

use crate::mask::{max_label, LabelMask};

/// Single-channel intensity image in the input's native numeric range.
pub type IntensityImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Errors raised while reading input images or writing label masks.
#[derive(Debug)]
pub enum ImageIoError {
    /// The input could not be opened or decoded.
    Read {
        path: PathBuf,
        source: image::ImageError,
    },
    /// The mask could not be encoded or written.
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
    /// A label id does not fit the 16-bit mask encoding.
    LabelOverflow {
        /// Largest label present in the mask.
        label: u32,
    },
}

impl std::fmt::Display for ImageIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read image {}: {}", path.display(), source)
            }
            Self::Write { path, source } => {
                write!(f, "failed to write mask {}: {}", path.display(), source)
            }
            Self::LabelOverflow { label } => write!(
                f,
                "label {} exceeds the 16-bit mask range (max {})",
                label,
                u16::MAX
            ),
        }
    }
}

impl std::error::Error for ImageIoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
            Self::LabelOverflow { .. } => None,
        }
    }
}

/// Read a single-channel image from disk.
///
/// The on-disk format is detected from the file content, falling back to the
/// extension.
pub fn load_intensity_image(path: &Path) -> Result<IntensityImage, ImageIoError> {
    let read_err = |source| ImageIoError::Read {
        path: path.to_path_buf(),
        source,
    };
    let img = ImageReader::open(path)
        .map_err(|e| read_err(image::ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| read_err(image::ImageError::IoError(e)))?
        .decode()
        .map_err(read_err)?;
    Ok(intensity_from_dynamic(img))
}

/// Convert a decoded image to raw single-channel intensities.
///
/// 8- and 16-bit gray data keeps its integer values (alpha is dropped).
/// Color and float images are reduced to luma.
pub fn intensity_from_dynamic(img: DynamicImage) -> IntensityImage {
    match img {
        DynamicImage::ImageLuma8(buf) => {
            IntensityImage::from_fn(buf.width(), buf.height(), |x, y| {
                Luma([buf.get_pixel(x, y)[0] as f32])
            })
        }
        DynamicImage::ImageLuma16(buf) => {
            IntensityImage::from_fn(buf.width(), buf.height(), |x, y| {
                Luma([buf.get_pixel(x, y)[0] as f32])
            })
        }
        DynamicImage::ImageLumaA8(buf) => {
            IntensityImage::from_fn(buf.width(), buf.height(), |x, y| {
                Luma([buf.get_pixel(x, y)[0] as f32])
            })
        }
        DynamicImage::ImageLumaA16(buf) => {
            IntensityImage::from_fn(buf.width(), buf.height(), |x, y| {
                Luma([buf.get_pixel(x, y)[0] as f32])
            })
        }
        other => other.to_luma32f(),
    }
}

/// Write a label mask as a 16-bit grayscale image, overwriting `path`.
///
/// The encoder is chosen from the file extension (`.tif`, `.png`, ...).
pub fn write_label_mask(mask: &LabelMask, path: &Path) -> Result<(), ImageIoError> {
    let top = max_label(mask);
    if top > u32::from(u16::MAX) {
        return Err(ImageIoError::LabelOverflow { label: top });
    }
    let out: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_fn(mask.width(), mask.height(), |x, y| {
            Luma([mask.get_pixel(x, y)[0] as u16])
        });
    out.save(path).map_err(|source| ImageIoError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::label_mask_from_rows;

    #[test]
    fn luma16_keeps_raw_values() {
        let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(3, 2, |x, y| Luma([(1000 * (x + 3 * y)) as u16]));
        let img = intensity_from_dynamic(DynamicImage::ImageLuma16(buf));
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1)[0], 5000.0);
    }

    #[test]
    fn mask_round_trips_through_tiff() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mask.tif");
        let mask = label_mask_from_rows(&[&[0, 0, 0, 0], &[0, 1, 2, 0], &[0, 300, 2, 0]]);
        write_label_mask(&mask, &path).expect("write mask");

        let back = image::open(&path).expect("reopen").into_luma16();
        assert_eq!(back.dimensions(), (4, 3));
        assert_eq!(back.get_pixel(1, 1)[0], 1);
        assert_eq!(back.get_pixel(2, 1)[0], 2);
        assert_eq!(back.get_pixel(1, 2)[0], 300);
        assert_eq!(back.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn writing_overwrites_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mask.png");
        std::fs::write(&path, b"stale").expect("seed file");
        let mask = label_mask_from_rows(&[&[0, 1], &[1, 0]]);
        write_label_mask(&mask, &path).expect("write mask");
        let back = image::open(&path).expect("reopen").into_luma16();
        assert_eq!(back.get_pixel(1, 0)[0], 1);
    }

    #[test]
    fn oversized_labels_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mask.tif");
        let mask = label_mask_from_rows(&[&[0, 70_000]]);
        let err = write_label_mask(&mask, &path).expect_err("overflow");
        assert!(matches!(err, ImageIoError::LabelOverflow { label: 70_000 }));
        assert!(!path.exists());
    }

    #[test]
    fn missing_input_is_a_read_error() {
        let err = load_intensity_image(Path::new("/nonexistent/cells.tif")).expect_err("missing");
        assert!(matches!(err, ImageIoError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/cells.tif"));
    }
}
