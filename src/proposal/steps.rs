use anyhow::Result;
use image::DynamicImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use crate::pipeline::{MetadataValue, PipelineContext, PipelineData, PipelineStep};
use crate::proposal::segments;

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let gray = item.image.to_luma8();
                item.with_image(DynamicImage::ImageLuma8(gray))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Apply Gaussian blur
pub struct BlurStep {
    pub sigma: f32,
}

impl PipelineStep for BlurStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let blurred = gaussian_blur_f32(&item.image.to_luma8(), self.sigma);
                item.with_image(DynamicImage::ImageLuma8(blurred))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Gaussian Blur"
    }
}

/// Detect edges using Canny, then thicken them
pub struct EdgeDetectionStep {
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub dilation: u8,
}

impl PipelineStep for EdgeDetectionStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let edges = canny(&item.image.to_luma8(), self.low_threshold, self.high_threshold);
                let edges = segments::thicken_edges(&edges, self.dilation);
                item.with_image(DynamicImage::ImageLuma8(edges))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Edge Detection"
    }
}

/// Split the edge map into enclosed regions - one item per region
pub struct RegionSegmentationStep {
    pub min_mask_region_area: u64,
}

impl PipelineStep for RegionSegmentationStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let edges = item.image.to_luma8();
            for mask in segments::find_regions(&edges, self.min_mask_region_area) {
                let Some((min_x, min_y, max_x, max_y)) = mask.bounds() else {
                    continue;
                };
                let area = mask.pixel_count();

                // Keep the region crop as the working image so debug dumps are readable
                let cropped = item
                    .original
                    .crop_imm(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1);

                let region = PipelineData::from_region(cropped, item.original.clone(), mask)
                    .with_metadata("area", MetadataValue::Int(area as i64));
                result.push(region);
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Region Segmentation"
    }
}

/// Keep only regions hit by a point of the prompt grid
pub struct PromptGridStep {
    pub points_per_side: u32,
}

impl PipelineStep for PromptGridStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let Some(mask) = item.mask.clone() else {
                continue;
            };
            let grid = segments::prompt_grid(mask.width(), mask.height(), self.points_per_side);
            if grid.iter().any(|&(x, y)| mask.get(x, y)) {
                result.push(item);
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Prompt Grid"
    }
}

/// Score masks and drop those below the quality thresholds
pub struct MaskQualityStep {
    pub pred_iou_thresh: f32,
    pub stability_score_thresh: f32,
}

impl PipelineStep for MaskQualityStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let Some(mask) = item.mask.clone() else {
                continue;
            };
            let predicted_iou = segments::fill_ratio(&mask);
            let stability = segments::interior_ratio(&mask);

            if predicted_iou >= self.pred_iou_thresh && stability >= self.stability_score_thresh {
                result.push(
                    item.with_metadata("predicted_iou", MetadataValue::Float(predicted_iou))
                        .with_metadata("stability_score", MetadataValue::Float(stability)),
                );
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Mask Quality"
    }
}
