//! Border trim, small-object removal and sequential relabeling.
//!
//! Small-object removal runs one same-label connected-components pass with a
//! size lookup table instead of isolating every label with a full-image scan.
//! The output is the same as the per-label formulation: a component only ever
//! joins 8-adjacent pixels that carry the same label value.

use std::collections::{BTreeSet, HashMap};

use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

use super::{max_label, LabelMask};

/// Zero the outermost rows and columns in place.
pub fn trim_border(mask: &mut LabelMask) {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    for x in 0..w {
        mask.put_pixel(x, 0, Luma([0]));
        mask.put_pixel(x, h - 1, Luma([0]));
    }
    for y in 0..h {
        mask.put_pixel(0, y, Luma([0]));
        mask.put_pixel(w - 1, y, Luma([0]));
    }
}

/// Drop every 8-connected component with fewer than `min_size` pixels.
///
/// Surviving pixels keep their label; removed pixels become background.
/// A component of exactly `min_size` pixels survives.
pub fn remove_small_objects(mask: &LabelMask, min_size: f32) -> LabelMask {
    let components = connected_components(mask, Connectivity::Eight, Luma([0u32]));

    let n_components = components.as_raw().iter().copied().max().unwrap_or(0) as usize;
    let mut sizes = vec![0usize; n_components + 1];
    for &c in components.as_raw() {
        sizes[c as usize] += 1;
    }

    let mut out = LabelMask::new(mask.width(), mask.height());
    for (dst, (&label, &comp)) in out
        .pixels_mut()
        .zip(mask.as_raw().iter().zip(components.as_raw()))
    {
        if label != 0 && sizes[comp as usize] as f32 >= min_size {
            *dst = Luma([label]);
        }
    }

    tracing::debug!(
        "small-object removal: {} components, {} kept (min_size={:.1})",
        n_components,
        sizes
            .iter()
            .skip(1)
            .filter(|&&s| s as f32 >= min_size)
            .count(),
        min_size
    );
    out
}

/// Renumber non-zero labels to `1..=N` in ascending order of their old
/// value. Background stays 0.
///
/// Returns the relabelled mask and the old → new mapping.
pub fn relabel_sequential(mask: &LabelMask) -> (LabelMask, HashMap<u32, u32>) {
    let distinct: BTreeSet<u32> = mask.as_raw().iter().copied().filter(|&v| v != 0).collect();
    let forward: HashMap<u32, u32> = distinct
        .into_iter()
        .zip(1u32..)
        .collect();
    let mut out = LabelMask::new(mask.width(), mask.height());
    for (dst, label) in out.pixels_mut().zip(mask.as_raw()) {
        if let Some(&new) = forward.get(label) {
            *dst = Luma([new]);
        }
    }
    (out, forward)
}

/// Full cleaning pass: trim the border, remove components smaller than
/// `diameter / 2` pixels, then relabel sequentially.
///
/// `diameter` must be the concrete value reported by the model, never the
/// auto sentinel.
pub fn clean_mask(mut mask: LabelMask, diameter: f32) -> LabelMask {
    let raw_max = max_label(&mask);
    trim_border(&mut mask);
    let kept = remove_small_objects(&mask, diameter / 2.0);
    let (clean, forward) = relabel_sequential(&kept);
    tracing::debug!(
        "mask cleaning: max label {} -> {} (diameter={:.2})",
        raw_max,
        forward.len(),
        diameter
    );
    clean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::label_areas;
    use crate::test_utils::{disk_label_mask, label_mask_from_rows};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn distinct_labels(mask: &LabelMask) -> BTreeSet<u32> {
        mask.as_raw().iter().copied().filter(|&v| v != 0).collect()
    }

    /// Random blocky label field: rectangles of random labels, some of them
    /// touching each other and the border.
    fn random_mask(seed: u64, w: u32, h: u32, n_rects: usize, max_id: u32) -> LabelMask {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut mask = LabelMask::new(w, h);
        for _ in 0..n_rects {
            let label = rng.gen_range(1..=max_id);
            let x0 = rng.gen_range(0..w);
            let y0 = rng.gen_range(0..h);
            let rw = rng.gen_range(1..=12u32);
            let rh = rng.gen_range(1..=12u32);
            for y in y0..(y0 + rh).min(h) {
                for x in x0..(x0 + rw).min(w) {
                    mask.put_pixel(x, y, Luma([label]));
                }
            }
        }
        mask
    }

    #[test]
    fn trim_zeroes_all_four_edges() {
        let mut mask = LabelMask::from_pixel(5, 4, Luma([7]));
        trim_border(&mut mask);
        for (x, y, p) in mask.enumerate_pixels() {
            let edge = x == 0 || y == 0 || x == 4 || y == 3;
            assert_eq!(p[0] == 0, edge, "pixel ({x},{y})");
        }
    }

    #[test]
    fn trim_handles_tiny_and_empty_masks() {
        let mut empty = LabelMask::new(0, 0);
        trim_border(&mut empty);

        let mut line = LabelMask::from_pixel(6, 2, Luma([1]));
        trim_border(&mut line);
        assert!(line.as_raw().iter().all(|&v| v == 0));

        let mut single = LabelMask::from_pixel(1, 1, Luma([4]));
        trim_border(&mut single);
        assert_eq!(single.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn small_components_are_removed_per_label() {
        // Label 1: one 4-pixel block and one isolated pixel.
        // Label 2: a 3-pixel diagonal (8-connected).
        let mask = label_mask_from_rows(&[
            &[1, 1, 0, 0, 0, 0],
            &[1, 1, 0, 2, 0, 0],
            &[0, 0, 0, 0, 2, 0],
            &[0, 1, 0, 0, 0, 2],
        ]);
        let out = remove_small_objects(&mask, 3.0);
        assert_eq!(out.get_pixel(0, 0)[0], 1);
        assert_eq!(out.get_pixel(1, 1)[0], 1);
        assert_eq!(out.get_pixel(1, 3)[0], 0, "isolated pixel removed");
        assert_eq!(out.get_pixel(3, 1)[0], 2, "diagonal run is one component");
        assert_eq!(out.get_pixel(5, 3)[0], 2);
    }

    #[test]
    fn adjacent_labels_are_not_merged_for_size() {
        // Two 2-pixel labels touching each other: each is a separate component.
        let mask = label_mask_from_rows(&[&[1, 1, 2, 2]]);
        let out = remove_small_objects(&mask, 3.0);
        assert!(out.as_raw().iter().all(|&v| v == 0));
    }

    #[test]
    fn size_threshold_is_inclusive() {
        let mask = label_mask_from_rows(&[&[5, 5, 5, 0, 6, 6]]);
        let out = remove_small_objects(&mask, 3.0);
        assert_eq!(out.as_raw(), &[5, 5, 5, 0, 0, 0]);

        let exact = remove_small_objects(&mask, 2.0);
        assert_eq!(exact.as_raw(), &[5, 5, 5, 0, 6, 6]);

        let between = remove_small_objects(&mask, 2.5);
        assert_eq!(between.as_raw(), &[5, 5, 5, 0, 0, 0]);
    }

    #[test]
    fn relabel_preserves_value_order() {
        let mask = label_mask_from_rows(&[&[0, 9, 0], &[4, 9, 20], &[0, 4, 0]]);
        let (out, forward) = relabel_sequential(&mask);
        assert_eq!(out.as_raw(), &[0, 2, 0, 1, 2, 3, 0, 1, 0]);
        assert_eq!(forward[&4], 1);
        assert_eq!(forward[&9], 2);
        assert_eq!(forward[&20], 3);
    }

    #[test]
    fn relabel_ignores_raster_position() {
        let mask = label_mask_from_rows(&[&[9, 0, 4]]);
        let (out, _) = relabel_sequential(&mask);
        assert_eq!(out.as_raw(), &[2, 0, 1]);
    }

    #[test]
    fn relabel_of_background_is_empty() {
        let (out, forward) = relabel_sequential(&LabelMask::new(3, 3));
        assert!(forward.is_empty());
        assert_eq!(max_label(&out), 0);
    }

    #[test]
    fn cleaned_masks_have_zero_border() {
        for seed in 0..20 {
            let mask = random_mask(seed, 40, 30, 25, 15);
            let clean = clean_mask(mask, 6.0);
            let (w, h) = clean.dimensions();
            for (x, y, p) in clean.enumerate_pixels() {
                if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                    assert_eq!(p[0], 0, "seed {seed} pixel ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn cleaned_labels_are_dense() {
        for seed in 0..20 {
            let mask = random_mask(seed, 40, 30, 25, 40);
            let clean = clean_mask(mask, 10.0);
            let top = max_label(&clean);
            let expected: BTreeSet<u32> = (1..=top).collect();
            assert_eq!(distinct_labels(&clean), expected, "seed {seed}");
        }
    }

    #[test]
    fn cleaned_components_meet_size_threshold() {
        let diameter = 12.0;
        for seed in 0..20 {
            let clean = clean_mask(random_mask(seed, 40, 30, 25, 10), diameter);
            let components = connected_components(&clean, Connectivity::Eight, Luma([0u32]));
            let sizes = label_areas(&components);
            for (id, &size) in sizes.iter().enumerate().skip(1) {
                assert!(
                    size as f32 >= diameter / 2.0,
                    "seed {seed}: component {id} has {size} px"
                );
            }
        }
    }

    #[test]
    fn disk_survives_cleaning_intact() {
        let mask = disk_label_mask(100, 100, &[([50.0, 50.0], 20.0)]);
        let area_before = label_areas(&mask)[1];
        let clean = clean_mask(mask, 40.0);
        assert_eq!(max_label(&clean), 1);
        assert_eq!(label_areas(&clean)[1], area_before);
    }

    #[test]
    fn gaps_from_removed_labels_are_closed() {
        let mask = label_mask_from_rows(&[
            &[0, 0, 0, 0, 0, 0, 0],
            &[0, 2, 2, 0, 7, 0, 0],
            &[0, 2, 2, 0, 0, 0, 0],
            &[0, 0, 0, 0, 5, 5, 0],
            &[0, 0, 0, 0, 5, 5, 0],
            &[0, 0, 0, 0, 0, 0, 0],
        ]);
        let clean = clean_mask(mask, 6.0);
        assert_eq!(distinct_labels(&clean), BTreeSet::from([1, 2]));
        assert_eq!(clean.get_pixel(1, 1)[0], 1);
        assert_eq!(clean.get_pixel(4, 1)[0], 0);
        assert_eq!(clean.get_pixel(4, 3)[0], 2);
    }
}
