use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use imageproc::region_labelling::{Connectivity, connected_components};
use std::collections::HashMap;

use crate::models::Mask;

/// Widen edges by `radius` pixels (square neighbourhood) so that small gaps
/// between region borders close up. A radius of 0 leaves the map unchanged.
pub fn thicken_edges(edges: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return edges.clone();
    }
    dilate(edges, Norm::LInf, radius)
}

/// Split an edge map into the regions the edges enclose.
///
/// Every 4-connected run of non-edge pixels becomes one mask. Regions with
/// fewer than `min_area` pixels are dropped. Masks come back ordered by the
/// component label, i.e. by the raster position of each region's first pixel.
pub fn find_regions(edges: &GrayImage, min_area: u64) -> Vec<Mask> {
    let (width, height) = edges.dimensions();

    // Non-edge pixels are the foreground we want to label
    let interior = GrayImage::from_fn(width, height, |x, y| {
        if edges.get_pixel(x, y)[0] > 0 { Luma([0u8]) } else { Luma([255u8]) }
    });
    let labeled = connected_components(&interior, Connectivity::Four, Luma([0u8]));

    let mut counts: HashMap<u32, u64> = HashMap::new();
    for label in labeled.pixels() {
        if label[0] != 0 {
            *counts.entry(label[0]).or_insert(0) += 1;
        }
    }

    let mut kept: Vec<u32> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_area)
        .map(|(label, _)| label)
        .collect();
    kept.sort_unstable();

    let slot: HashMap<u32, usize> = kept.iter().enumerate().map(|(i, l)| (*l, i)).collect();
    let mut masks: Vec<Mask> = kept.iter().map(|_| Mask::empty(width, height)).collect();

    for (x, y, label) in labeled.enumerate_pixels() {
        if let Some(&i) = slot.get(&label[0]) {
            masks[i].set(x, y, true);
        }
    }

    masks
}

/// Prompt points of a `points_per_side` × `points_per_side` grid, centred in each cell.
pub fn prompt_grid(width: u32, height: u32, points_per_side: u32) -> Vec<(u32, u32)> {
    if points_per_side == 0 || width == 0 || height == 0 {
        return Vec::new();
    }

    let n = points_per_side as f64;
    let mut points = Vec::with_capacity((points_per_side * points_per_side) as usize);
    for j in 0..points_per_side {
        for i in 0..points_per_side {
            let x = ((i as f64 + 0.5) * width as f64 / n) as u32;
            let y = ((j as f64 + 0.5) * height as f64 / n) as u32;
            points.push((x.min(width - 1), y.min(height - 1)));
        }
    }
    points
}

/// Share of the mask's bounding box covered by the mask.
pub fn fill_ratio(mask: &Mask) -> f32 {
    let Some((min_x, min_y, max_x, max_y)) = mask.bounds() else {
        return 0.0;
    };
    let box_area = (max_x - min_x + 1) as f64 * (max_y - min_y + 1) as f64;
    (mask.pixel_count() as f64 / box_area) as f32
}

/// Share of mask pixels that are not on the mask boundary.
pub fn interior_ratio(mask: &Mask) -> f32 {
    let total = mask.pixel_count();
    if total == 0 {
        return 0.0;
    }
    1.0 - (mask.boundary_pixel_count() as f64 / total as f64) as f32
}
