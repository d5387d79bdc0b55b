//! Zip container of `.roi` entries, readable by ImageJ's ROI manager.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::imagej::encode_roi;
use super::{Roi, RoiError};

/// Write `rois` to a fresh zip archive at `path`.
///
/// Entries are named `"<index>.roi"` in slice order. An existing file is
/// truncated. All ROIs are encoded before the file is touched, so encoding
/// errors leave the destination untouched.
pub fn write_roi_archive(path: &Path, rois: &[Roi]) -> Result<(), RoiError> {
    let encoded = rois
        .iter()
        .map(encode_roi)
        .collect::<Result<Vec<_>, _>>()?;

    let io_err = |source| RoiError::Io {
        path: path.to_path_buf(),
        source,
    };
    let zip_err = |source| RoiError::Zip {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (index, bytes) in encoded.iter().enumerate() {
        zip.start_file(format!("{}.roi", index), options)
            .map_err(zip_err)?;
        zip.write_all(bytes).map_err(io_err)?;
    }
    let mut inner = zip.finish().map_err(zip_err)?;
    inner.flush().map_err(io_err)?;

    tracing::debug!("wrote {} ROIs to {}", rois.len(), path.display());
    Ok(())
}
