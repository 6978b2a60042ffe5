//! Review surface: showing ranked candidates and capturing a hand-drawn box.

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result, anyhow};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::models::{BoxCoords, CandidateRegion};
use crate::prompt::Prompter;
use crate::ranking::RankedCandidate;

/// End points of one pointer drag, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    pub start: (f64, f64),
    pub end: (f64, f64),
}

/// Where candidates are shown and manual boxes are drawn. Text goes through
/// the session's prompter so a surface never owns the conversation.
pub trait ReviewSurface {
    /// Show the ranked candidates over the image before the selection prompt.
    fn show_candidates(
        &mut self,
        prompter: &mut dyn Prompter,
        image_name: &str,
        image: &RgbImage,
        ranked: &[RankedCandidate],
    ) -> Result<()>;

    /// Let the annotator drag out one rectangle. `None` when they dismiss
    /// the surface without dragging.
    fn capture_drag(&mut self, prompter: &mut dyn Prompter, image_name: &str, image: &RgbImage) -> Result<Option<Drag>>;
}

/// Turn a drag into a region: each coordinate is truncated toward the
/// origin and clamped into the image. Corners may be given in any order.
/// A drag that collapses to a line or point yields `None`.
pub fn region_from_drag(drag: &Drag, width: u32, height: u32) -> Option<CandidateRegion> {
    if width == 0 || height == 0 {
        return None;
    }

    let to_pixel = |v: f64, limit: u32| -> u32 {
        if v.is_nan() || v <= 0.0 {
            0
        } else {
            (v.trunc() as u64).min(limit as u64 - 1) as u32
        }
    };

    let x1 = to_pixel(drag.start.0, width);
    let y1 = to_pixel(drag.start.1, height);
    let x2 = to_pixel(drag.end.0, width);
    let y2 = to_pixel(drag.end.1, height);

    let bbox = BoxCoords::new(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))?;
    Some(CandidateRegion::from_box(bbox))
}

/// Number of distinct overlay colours. Ranks past this repeat a colour and
/// can only be told apart by their drawn number.
pub const PALETTE_SIZE: usize = 6;

/// Colour for the overlay of a given rank
pub fn rank_color(rank: usize) -> Rgb<u8> {
    const PALETTE: [[u8; 3]; PALETTE_SIZE] = [
        [255, 0, 0],
        [0, 255, 0],
        [0, 0, 255],
        [255, 255, 0],
        [255, 0, 255],
        [0, 255, 255],
    ];
    Rgb(PALETTE[(rank.max(1) - 1) % PALETTE.len()])
}

pub fn color_name(rank: usize) -> &'static str {
    const NAMES: [&str; PALETTE_SIZE] = ["red", "green", "blue", "yellow", "magenta", "cyan"];
    NAMES[(rank.max(1) - 1) % NAMES.len()]
}

/// Load a TrueType/OpenType font for numbering overlays.
pub fn load_font(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
    FontVec::try_from_vec(data).map_err(|e| anyhow!("{} is not a usable font: {}", path.display(), e))
}

/// Draw each candidate as a 2px hollow rectangle in its rank colour. With a
/// font, `#<rank>` is written above the box (inside it at the image top).
pub fn render_overlay(image: &RgbImage, ranked: &[RankedCandidate], font: Option<&FontVec>) -> RgbImage {
    let mut canvas = image.clone();
    let scale = PxScale::from(20.0);

    for candidate in ranked {
        let b = candidate.region.bbox;
        let color = rank_color(candidate.rank);
        let outer = Rect::at(b.xmin as i32, b.ymin as i32).of_size(b.width() + 1, b.height() + 1);
        draw_hollow_rect_mut(&mut canvas, outer, color);
        if b.width() > 2 && b.height() > 2 {
            let inner = Rect::at(b.xmin as i32 + 1, b.ymin as i32 + 1).of_size(b.width() - 1, b.height() - 1);
            draw_hollow_rect_mut(&mut canvas, inner, color);
        }

        if let Some(font) = font {
            let text = format!("#{}", candidate.rank);
            let (_, text_h) = text_size(scale, font, &text);
            let text_y = if b.ymin > text_h { b.ymin - text_h } else { b.ymin + 2 };
            draw_text_mut(&mut canvas, color, b.xmin as i32 + 2, text_y as i32, scale, font, &text);
        }
    }
    canvas
}

/// Review surface for a terminal session: overlays are written as PNG files
/// the annotator opens in any viewer, and drags are typed as coordinates.
pub struct TerminalSurface {
    review_dir: PathBuf,
    font: Option<FontVec>,
}

impl TerminalSurface {
    pub fn new(review_dir: PathBuf) -> Self {
        Self { review_dir, font: None }
    }

    /// Number the overlay boxes using the font at `path`.
    pub fn with_font(mut self, path: &Path) -> Result<Self> {
        self.font = Some(load_font(path)?);
        Ok(self)
    }

    pub fn numbers_overlays(&self) -> bool {
        self.font.is_some()
    }

    pub fn overlay_path(&self, image_name: &str) -> PathBuf {
        let stem = Path::new(image_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_name.to_string());
        self.review_dir.join(format!("{}_candidates.png", stem))
    }

    pub fn save_overlay(&self, image_name: &str, image: &RgbImage, ranked: &[RankedCandidate]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.review_dir)
            .with_context(|| format!("failed to create review directory {}", self.review_dir.display()))?;
        let path = self.overlay_path(image_name);
        render_overlay(image, ranked, self.font.as_ref())
            .save(&path)
            .with_context(|| format!("failed to save overlay {}", path.display()))?;
        debug!("Candidate overlay written to {}", path.display());
        Ok(path)
    }
}

/// Parse "x1,y1,x2,y2"; anything else is `None`.
pub fn parse_drag(input: &str) -> Option<Drag> {
    let values: Vec<f64> = input
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match values.as_slice() {
        [x1, y1, x2, y2] => Some(Drag {
            start: (*x1, *y1),
            end: (*x2, *y2),
        }),
        _ => None,
    }
}

impl ReviewSurface for TerminalSurface {
    fn show_candidates(
        &mut self,
        prompter: &mut dyn Prompter,
        image_name: &str,
        image: &RgbImage,
        ranked: &[RankedCandidate],
    ) -> Result<()> {
        prompter.say("Candidate boxes proposed for this image:")?;
        for candidate in ranked {
            prompter.say(&format!(
                "  #{} [{}] box {} area {:.0}",
                candidate.rank,
                color_name(candidate.rank),
                candidate.region.bbox,
                candidate.region.area
            ))?;
        }

        // The listing above is enough to choose from, so a failed overlay only warns
        match self.save_overlay(image_name, image, ranked) {
            Ok(path) => prompter.say(&format!("Overlay: {}", path.display()))?,
            Err(e) => warn!("{:#}", e),
        }
        Ok(())
    }

    fn capture_drag(&mut self, prompter: &mut dyn Prompter, image_name: &str, image: &RgbImage) -> Result<Option<Drag>> {
        let (width, height) = image.dimensions();
        prompter.say(&format!(
            "Draw a region on {} ({}x{}) by entering the drag corners.",
            image_name, width, height
        ))?;

        loop {
            let answer = prompter.ask("Corners x1,y1,x2,y2 (Enter for none): ")?;
            if answer.trim().is_empty() {
                return Ok(None);
            }
            match parse_drag(&answer) {
                Some(drag) => return Ok(Some(drag)),
                None => prompter.say("Expected four numbers separated by commas.")?,
            }
        }
    }
}
