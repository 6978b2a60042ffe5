//! COCO uncompressed RLE decoding for masks returned by external segmenters.
//!
//! Format: {"size": [height, width], "counts": [run1, run2, ...]}
//! Counts alternate between 0s and 1s, starting with 0s, in COLUMN-MAJOR order.
use anyhow::{Result, bail};
use serde::Deserialize;

use crate::models::Mask;

#[derive(Debug, Clone, Deserialize)]
pub struct CocoRle {
    pub size: Vec<u32>,
    pub counts: Vec<u64>,
}

/// Decode RLE to a row-major mask of the expected `width` x `height`.
///
/// The declared size and the run total are checked before the mask is
/// allocated, so a malformed record fails instead of panicking.
pub fn decode_rle(rle: &CocoRle, width: u32, height: u32) -> Result<Mask> {
    let [rle_height, rle_width] = rle.size.as_slice() else {
        bail!("RLE size must be [height, width], got {:?}", rle.size);
    };
    if (*rle_width, *rle_height) != (width, height) {
        bail!(
            "RLE mask is {}x{}, image is {}x{}",
            rle_width,
            rle_height,
            width,
            height
        );
    }

    let total_pixels = width as u64 * height as u64;
    let Some(run_total) = rle.counts.iter().try_fold(0u64, |acc, &c| acc.checked_add(c)) else {
        bail!("RLE run lengths overflow");
    };
    if run_total != total_pixels {
        bail!(
            "RLE runs cover {} pixels, mask is {}x{} ({} pixels)",
            run_total,
            width,
            height,
            total_pixels
        );
    }

    let mut mask = Mask::empty(width, height);
    let mut position: u64 = 0;
    let mut value = false;

    // Every partial sum is bounded by run_total, so no addition below can overflow
    for &count in &rle.counts {
        if value {
            for p in position..position + count {
                // Column-major: consecutive positions walk down a column
                let col = (p / height as u64) as u32;
                let row = (p % height as u64) as u32;
                mask.set(col, row, true);
            }
        }
        position += count;
        value = !value;
    }

    Ok(mask)
}
