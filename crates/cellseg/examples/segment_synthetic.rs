use cellseg::pipeline::{segment, PipelineConfig};
use cellseg::{extract_rois, load_model, write_label_mask, write_roi_archive, Diameter};
use cellseg::{max_label, IntensityImage};
use image::Luma;
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    let model_name = args.get(1).map(String::as_str).unwrap_or("threshold");

    // 4x3 grid of cells with growing radii on a dim background.
    let cells: Vec<([f32; 2], f32)> = (0..12)
        .map(|i| {
            let cx = 30.0 + 50.0 * (i % 4) as f32;
            let cy = 30.0 + 50.0 * (i / 4) as f32;
            ([cx, cy], 5.0 + 1.5 * i as f32)
        })
        .collect();
    let image = IntensityImage::from_fn(220, 170, |x, y| {
        let inside = cells.iter().any(|&(c, r)| {
            let (dx, dy) = (x as f32 - c[0], y as f32 - c[1]);
            dx * dx + dy * dy <= r * r
        });
        Luma([if inside { 1800.0 } else { 250.0 }])
    });

    let model = load_model(model_name)?;
    let out = segment(
        &image,
        model.as_ref(),
        Diameter::Auto,
        None,
        &PipelineConfig::default(),
    )?;
    let rois = extract_rois(&out.mask)?;
    println!(
        "{} raw labels -> {} cells, diameter {:.2} px, {} ROIs",
        out.n_raw_labels,
        max_label(&out.mask),
        out.diameter,
        rois.len()
    );

    if let Some(dir) = args.get(2) {
        let dir = Path::new(dir);
        write_label_mask(&out.mask, &dir.join("synthetic_mask.tif"))?;
        write_roi_archive(&dir.join("synthetic_rois.zip"), &rois)?;
        println!("Wrote mask and ROIs to {}", dir.display());
    }
    Ok(())
}
