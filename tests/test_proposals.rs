//! Integration tests for region proposals.
//!
//! Tests cover:
//! - Tight boxes from masks and rejection of unusable masks
//! - COCO RLE decoding and external segmenter output parsing
//! - The built-in edge-region segmenter on synthetic images

mod common;

use common::*;
use image::{ImageBuffer, Rgb, RgbImage};
use std::path::Path;
use voclabel::ProposalParams;
use voclabel::proposal::command::parse_proposals;
use voclabel::proposal::rle::{CocoRle, decode_rle};
use voclabel::proposal::segments::thicken_edges;
use voclabel::proposal::{CommandEngine, EdgeRegionEngine, candidate_from_mask};

fn square_image(size: u32, min: u32, max: u32) -> RgbImage {
    ImageBuffer::from_fn(size, size, |x, y| {
        if (min..=max).contains(&x) && (min..=max).contains(&y) {
            Rgb([255u8, 255u8, 255u8])
        } else {
            Rgb([0u8, 0u8, 0u8])
        }
    })
}

#[test]
fn test_tight_box_around_mask() {
    let mut mask = Mask::empty(50, 40);
    mask.set(12, 7, true);
    mask.set(30, 22, true);
    mask.set(18, 35, true);

    let candidate = candidate_from_mask(mask, 3.0).expect("mask spans an area");

    assert_eq!(candidate.bbox, bbox(12, 7, 30, 35));
    assert_eq!(candidate.area, 3.0);
    assert!(candidate.mask.is_some());
}

#[test]
fn test_empty_and_degenerate_masks_are_dropped() {
    assert!(candidate_from_mask(Mask::empty(10, 10), 0.0).is_none());

    let mut line = Mask::empty(10, 10);
    for y in 2..8 {
        line.set(4, y, true);
    }
    assert!(candidate_from_mask(line, 6.0).is_none());
}

#[test]
fn test_adapter_keeps_engine_order_and_checks_size() -> anyhow::Result<()> {
    let image = RgbImage::new(64, 48);
    let adapter = stub_adapter(
        StubEngine::new().with_boxes("a.jpg", vec![bbox(1, 1, 10, 10), bbox(20, 5, 60, 40)]),
    );

    let candidates = adapter.propose(&image, Path::new("/data/a.jpg"))?;
    let boxes: Vec<BoxCoords> = candidates.iter().map(|c| c.bbox).collect();
    assert_eq!(boxes, vec![bbox(1, 1, 10, 10), bbox(20, 5, 60, 40)]);
    assert_eq!(candidates[0].area, 100.0);

    for c in &candidates {
        assert!(c.bbox.fits_within(64, 48));
    }
    Ok(())
}

#[test]
fn test_zero_proposals_is_not_an_error() -> anyhow::Result<()> {
    let image = RgbImage::new(16, 16);
    let adapter = stub_adapter(StubEngine::new());

    assert!(adapter.propose(&image, Path::new("none.jpg"))?.is_empty());
    Ok(())
}

#[test]
fn test_decode_rle_column_major() -> anyhow::Result<()> {
    // 2 rows x 3 columns; runs: 1 background, 2 foreground, 3 background
    let rle = CocoRle {
        size: vec![2, 3],
        counts: vec![1, 2, 3],
    };

    let mask = decode_rle(&rle, 3, 2)?;

    assert_eq!((mask.width(), mask.height()), (3, 2));
    assert!(mask.get(0, 1));
    assert!(mask.get(1, 0));
    assert_eq!(mask.pixel_count(), 2);
    Ok(())
}

#[test]
fn test_decode_rle_rejects_bad_lengths() {
    let short = CocoRle {
        size: vec![2, 3],
        counts: vec![1, 2],
    };
    assert!(decode_rle(&short, 3, 2).is_err());

    let flat = CocoRle {
        size: vec![6],
        counts: vec![6],
    };
    assert!(decode_rle(&flat, 6, 1).is_err());
}

#[test]
fn test_decode_rle_rejects_overflowing_runs() {
    let rle = CocoRle {
        size: vec![1, 1],
        counts: vec![u64::MAX, 2],
    };
    let err = decode_rle(&rle, 1, 1).unwrap_err();
    assert!(err.to_string().contains("overflow"));
}

#[test]
fn test_decode_rle_checks_size_before_allocating() {
    // A consistent run total for a huge declared size must not be decoded
    let rle = CocoRle {
        size: vec![100_000, 100_000],
        counts: vec![10_000_000_000],
    };
    let err = decode_rle(&rle, 640, 480).unwrap_err();
    assert!(err.to_string().contains("image is 640x480"));
}

#[test]
fn test_malformed_records_are_skipped_not_fatal() -> anyhow::Result<()> {
    let json = r#"[
        {"area": 1, "segmentation": {"size": [1, 1], "counts": [18446744073709551615, 2]}},
        {"area": 1, "segmentation": {"size": [100000, 100000], "counts": [10000000000]}},
        {"area": 1, "segmentation": {"size": [1, 1], "counts": [0, 1]}}
    ]"#;

    let proposals = parse_proposals(json, 1, 1)?;

    assert_eq!(proposals.len(), 1);
    assert!(proposals[0].mask.get(0, 0));
    Ok(())
}

#[test]
fn test_parse_segmenter_output() -> anyhow::Result<()> {
    let json = r#"[
        {"area": 4, "segmentation": {"size": [3, 3], "counts": [0, 2, 1, 2, 4]}, "predicted_iou": 0.97},
        {"area": 1, "segmentation": {"size": [3, 3], "counts": [1, 1]}},
        {"area": 2, "segmentation": {"size": [3, 3], "counts": [4, 2, 3]}, "stability_score": 0.9}
    ]"#;

    let proposals = parse_proposals(json, 3, 3)?;

    // The middle record covers 2 of 9 pixels and is skipped
    assert_eq!(proposals.len(), 2);
    assert_eq!(proposals[0].area, 4.0);
    assert_eq!(proposals[0].predicted_iou, Some(0.97));
    assert_eq!(proposals[0].mask.pixel_count(), 4);
    assert_eq!(proposals[1].stability_score, Some(0.9));
    Ok(())
}

#[test]
fn test_parse_segmenter_output_rejects_garbage() {
    assert!(parse_proposals("not json", 3, 3).is_err());
    assert!(parse_proposals(r#"{"area": 1}"#, 3, 3).is_err());
}

#[test]
fn test_command_engine_requires_checkpoint() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let missing = dir.path().join("sam_vit_b_01ec64.pth");

    let result = CommandEngine::new("segment", missing.clone(), ProposalParams::default());
    assert!(result.is_err());

    std::fs::write(&missing, b"weights")?;
    let engine = CommandEngine::new("segment", missing, ProposalParams::default())?;
    let args = engine.args_for(Path::new("img.jpg"));
    assert_eq!(args.last().map(String::as_str), Some("img.jpg"));
    assert!(args.contains(&"--points-per-side".to_string()));
    assert!(args.contains(&"8".to_string()));
    Ok(())
}

#[test]
fn test_builtin_engine_finds_bright_square() -> anyhow::Result<()> {
    let image = square_image(200, 60, 139);
    let adapter = RegionProposalAdapter::new(Box::new(EdgeRegionEngine::new(&ProposalParams::default())));

    let candidates = adapter.propose(&image, Path::new("square.png"))?;

    assert!(!candidates.is_empty());
    let square = candidates
        .iter()
        .find(|c| c.bbox.xmin <= 90 && c.bbox.ymin <= 90 && c.bbox.xmax >= 110 && c.bbox.ymax >= 110 && c.bbox.xmin >= 50)
        .expect("a candidate should cover the square");
    assert!(square.bbox.xmax <= 150 && square.bbox.ymax <= 150);

    for c in &candidates {
        assert!(c.bbox.xmin < c.bbox.xmax && c.bbox.ymin < c.bbox.ymax);
        assert!(c.bbox.fits_within(200, 200));
        assert!(c.area >= ProposalParams::default().min_mask_region_area as f64);
    }
    Ok(())
}

#[test]
fn test_builtin_engine_respects_min_region_area() -> anyhow::Result<()> {
    let image = square_image(100, 30, 69);
    let params = ProposalParams {
        min_mask_region_area: 1_000_000,
        ..ProposalParams::default()
    };
    let adapter = RegionProposalAdapter::new(Box::new(EdgeRegionEngine::new(&params)));

    assert!(adapter.propose(&image, Path::new("small.png"))?.is_empty());
    Ok(())
}

#[test]
fn test_builtin_engine_debug_dumps_steps() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");
    let engine = EdgeRegionEngine::new(&ProposalParams::default()).with_debug(debug_dir.clone())?;
    assert_eq!(
        engine.pipeline().step_names(),
        vec![
            "Grayscale Conversion",
            "Gaussian Blur",
            "Edge Detection",
            "Region Segmentation",
            "Prompt Grid",
            "Mask Quality"
        ]
    );
    let adapter = RegionProposalAdapter::new(Box::new(engine));

    adapter.propose(&square_image(120, 40, 79), Path::new("square.png"))?;

    assert!(debug_dir.join("image_001").join("00_input").join("01.png").is_file());
    assert!(debug_dir.join("image_001").join("03_edge_detection").is_dir());
    Ok(())
}

#[test]
fn test_debug_write_errors_do_not_fail_proposals() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");
    let engine = EdgeRegionEngine::new(&ProposalParams::default()).with_debug(debug_dir.clone())?;

    // Put a plain file where the debug directory was
    std::fs::remove_dir(&debug_dir)?;
    std::fs::write(&debug_dir, b"in the way")?;

    let adapter = RegionProposalAdapter::new(Box::new(engine));
    let candidates = adapter.propose(&square_image(200, 60, 139), Path::new("square.png"))?;

    assert!(!candidates.is_empty());
    assert!(debug_dir.is_file());
    Ok(())
}

#[test]
fn test_thicken_edges_widens_by_radius() {
    let mut edges = image::GrayImage::new(9, 9);
    edges.put_pixel(4, 4, image::Luma([255u8]));

    let lit = |img: &image::GrayImage| img.pixels().filter(|p| p[0] > 0).count();
    assert_eq!(lit(&thicken_edges(&edges, 0)), 1);
    assert_eq!(lit(&thicken_edges(&edges, 1)), 9);
    assert_eq!(lit(&thicken_edges(&edges, 2)), 25);
}
