//! Contrast-limited adaptive histogram equalization.
//!
//! The image is quantized to 14 bits, reflect-padded to whole tiles, and
//! equalized per `kernel_size × kernel_size` contextual region. Each pixel's
//! output is the bilinear blend of the four surrounding region mappings.

use image::Luma;

use super::{ClaheConfig, ContrastError};
use crate::image_io::IntensityImage;

/// Working gray depth (14 bits).
const NR_OF_GRAY: usize = 1 << 14;

/// Equalize `image` and return intensities rescaled to `[0, 1]`.
///
/// Requires a non-empty, finite, non-constant image.
pub fn equalize_adapthist(
    image: &IntensityImage,
    config: &ClaheConfig,
) -> Result<IntensityImage, ContrastError> {
    validate(config)?;
    let (w, h) = (image.width() as usize, image.height() as usize);
    if w == 0 || h == 0 {
        return Err(ContrastError::Empty);
    }

    let quantized = quantize(image.as_raw())?;

    // ── Pad to whole tiles (half a tile before, up to 1.5 tiles after) ─────
    let k = config.kernel_size as usize;
    let pad_before = k / 2;
    let pad_after = |s: usize| (k - s % k) % k + k.div_ceil(2);
    let pw = w + pad_before + pad_after(w);
    let ph = h + pad_before + pad_after(h);

    let bin_size = 1 + NR_OF_GRAY / config.nbins as usize;
    let mut padded = vec![0u16; pw * ph];
    for py in 0..ph {
        let sy = reflect_index(py as isize - pad_before as isize, h);
        let row = &mut padded[py * pw..(py + 1) * pw];
        for (px, dst) in row.iter_mut().enumerate() {
            let sx = reflect_index(px as isize - pad_before as isize, w);
            *dst = (quantized[sy * w + sx] as usize / bin_size) as u16;
        }
    }

    // ── Per-region clipped histogram → gray mapping ────────────────────────
    let ns_y = ph / k - 1;
    let ns_x = pw / k - 1;
    let kernel_elements = k * k;
    let clim = if config.clip_limit > 0.0 {
        ((config.clip_limit * kernel_elements as f64) as usize).max(1)
    } else {
        kernel_elements
    };
    let nbins = config.nbins as usize;

    let mut maps: Vec<Vec<u16>> = Vec::with_capacity(ns_y * ns_x);
    let mut hist = vec![0usize; nbins];
    for ty in 0..ns_y {
        for tx in 0..ns_x {
            hist.iter_mut().for_each(|c| *c = 0);
            let y0 = pad_before + ty * k;
            let x0 = pad_before + tx * k;
            for py in y0..y0 + k {
                for &bin in &padded[py * pw + x0..py * pw + x0 + k] {
                    hist[bin as usize] += 1;
                }
            }
            clip_histogram(&mut hist, clim);
            maps.push(map_histogram(&hist, kernel_elements));
        }
    }

    tracing::debug!(
        "CLAHE: {}x{} image, {}x{} regions of {} px, clip={} counts",
        w,
        h,
        ns_x,
        ns_y,
        k,
        clim
    );

    // Mapping grid with one replicated region on every side.
    let map_index = |gy: usize, gx: usize| {
        gy.saturating_sub(1).min(ns_y - 1) * ns_x + gx.saturating_sub(1).min(ns_x - 1)
    };

    // ── Bilinear blend of the four neighbouring mappings ───────────────────
    let inv_k = 1.0 / k as f64;
    let mut result = vec![0u16; w * h];
    for y in 0..h {
        let py = y + pad_before;
        let (by, u) = (py / k, py % k);
        let wy1 = u as f64 * inv_k;
        let wy0 = 1.0 - wy1;
        for x in 0..w {
            let px = x + pad_before;
            let (bx, v) = (px / k, px % k);
            let wx1 = v as f64 * inv_k;
            let wx0 = 1.0 - wx1;
            let bin = padded[py * pw + px] as usize;

            let mut acc = 0.0f32;
            acc += (maps[map_index(by, bx)][bin] as f64 * wy0 * wx0) as f32;
            acc += (maps[map_index(by, bx + 1)][bin] as f64 * wy0 * wx1) as f32;
            acc += (maps[map_index(by + 1, bx)][bin] as f64 * wy1 * wx0) as f32;
            acc += (maps[map_index(by + 1, bx + 1)][bin] as f64 * wy1 * wx1) as f32;
            result[y * w + x] = acc as u16;
        }
    }

    // ── Rescale to [0, 1] ──────────────────────────────────────────────────
    let lo = result.iter().copied().min().unwrap_or(0);
    let hi = result.iter().copied().max().unwrap_or(0);
    if hi == lo {
        return Err(ContrastError::Degenerate { value: lo as f32 });
    }
    let span = (hi - lo) as f64;
    Ok(IntensityImage::from_fn(w as u32, h as u32, |x, y| {
        let r = result[y as usize * w + x as usize];
        Luma([((r - lo) as f64 / span) as f32])
    }))
}

fn validate(config: &ClaheConfig) -> Result<(), ContrastError> {
    if config.kernel_size == 0 {
        return Err(ContrastError::InvalidConfig(
            "kernel_size must be >= 1".to_string(),
        ));
    }
    if config.nbins == 0 || config.nbins as usize > NR_OF_GRAY {
        return Err(ContrastError::InvalidConfig(format!(
            "nbins must be in [1, {}], got {}",
            NR_OF_GRAY, config.nbins
        )));
    }
    if !config.clip_limit.is_finite() || config.clip_limit < 0.0 {
        return Err(ContrastError::InvalidConfig(format!(
            "clip_limit must be finite and >= 0, got {}",
            config.clip_limit
        )));
    }
    Ok(())
}

/// Linear map of `[min, max]` onto `[0, NR_OF_GRAY - 1]`, rounded to the
/// nearest gray level.
fn quantize(data: &[f32]) -> Result<Vec<u16>, ContrastError> {
    if data.iter().any(|v| !v.is_finite()) {
        return Err(ContrastError::NonFinite);
    }
    let lo = data.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if hi <= lo {
        return Err(ContrastError::Degenerate { value: lo });
    }
    let (lo, span) = (lo as f64, hi as f64 - lo as f64);
    let top = (NR_OF_GRAY - 1) as f64;
    Ok(data
        .iter()
        .map(|&v| ((v as f64 - lo) / span * top).round() as u16)
        .collect())
}

/// Mirror index into `[0, n)` without repeating the edge sample.
fn reflect_index(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let m = i.rem_euclid(period);
    if m >= n as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

/// Clip bins at `clip_limit` and redistribute the excess over all bins.
fn clip_histogram(hist: &mut [usize], clip_limit: usize) {
    let n_bins = hist.len() as i64;
    let clip = clip_limit as i64;

    let mut n_excess: i64 = 0;
    for c in hist.iter_mut() {
        if *c > clip_limit {
            n_excess += (*c - clip_limit) as i64;
            *c = clip_limit;
        }
    }

    // Uniform increment for bins well below the limit.
    let bin_incr = n_excess / n_bins;
    let upper = clip - bin_incr;
    for c in hist.iter_mut() {
        if (*c as i64) < upper {
            *c += bin_incr as usize;
            n_excess -= bin_incr;
        }
    }
    for c in hist.iter_mut() {
        let v = *c as i64;
        if v >= upper && v < clip {
            n_excess -= clip - v;
            *c = clip_limit;
        }
    }

    // Residual excess, one count at a time in strided passes.
    while n_excess > 0 {
        let prev_excess = n_excess;
        for index in 0..hist.len() {
            let under = hist.iter().filter(|&&c| c < clip_limit).count() as i64;
            let step = (under / n_excess).max(1) as usize;
            let mut added = 0i64;
            for c in hist.iter_mut().skip(index).step_by(step) {
                if *c < clip_limit {
                    *c += 1;
                    added += 1;
                }
            }
            n_excess -= added;
            if n_excess <= 0 {
                break;
            }
        }
        if prev_excess == n_excess {
            break;
        }
    }
}

/// Cumulative histogram scaled to `[0, NR_OF_GRAY - 1]`.
fn map_histogram(hist: &[usize], n_pixels: usize) -> Vec<u16> {
    let top = (NR_OF_GRAY - 1) as f64;
    let scale = top / n_pixels as f64;
    let mut cumsum = 0usize;
    hist.iter()
        .map(|&c| {
            cumsum += c;
            (cumsum as f64 * scale).min(top) as u16
        })
        .collect()
}
