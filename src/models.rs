use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Axis-aligned rectangle in image pixel coordinates.
///
/// Coordinates are inclusive pixel indices, the same convention the mask
/// bounding boxes use: a single-pixel-wide column has `xmin == xmax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxCoords {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl BoxCoords {
    /// Build a rectangle, returning `None` unless `xmin < xmax` and `ymin < ymax`.
    pub fn new(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> Option<Self> {
        if xmin < xmax && ymin < ymax {
            Some(Self { xmin, ymin, xmax, ymax })
        } else {
            None
        }
    }

    pub fn width(&self) -> u32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> u32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Whether the rectangle lies inside an image of the given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.xmax < width && self.ymax < height
    }
}

impl fmt::Display for BoxCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// Boolean pixel-membership mask over an image's extent, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.bits[idx] = value;
        }
    }

    /// Number of member pixels.
    pub fn pixel_count(&self) -> u64 {
        self.bits.iter().filter(|b| **b).count() as u64
    }

    /// Tight box around the member pixels (min/max of member coordinates).
    ///
    /// `None` for an empty mask. The result may be degenerate (zero width or
    /// height); callers decide whether to keep it.
    pub fn bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut found = false;

        for y in 0..self.height {
            for x in 0..self.width {
                if self.bits[self.index(x, y)] {
                    found = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        found.then_some((min_x, min_y, max_x, max_y))
    }

    /// Count member pixels that touch a non-member 4-neighbour or the image edge.
    pub fn boundary_pixel_count(&self) -> u64 {
        let mut count = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.get(x, y) {
                    continue;
                }
                let on_edge = x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height;
                if on_edge
                    || !self.get(x - 1, y)
                    || !self.get(x + 1, y)
                    || !self.get(x, y - 1)
                    || !self.get(x, y + 1)
                {
                    count += 1;
                }
            }
        }
        count
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// A proposed region of interest for one image.
#[derive(Debug, Clone)]
pub struct CandidateRegion {
    pub bbox: BoxCoords,
    /// Ranking metric supplied by the proposal engine (pixel area for masks).
    pub area: f64,
    /// Pixel membership; `None` for manually drawn regions.
    pub mask: Option<Arc<Mask>>,
}

impl CandidateRegion {
    pub fn from_box(bbox: BoxCoords) -> Self {
        Self {
            bbox,
            area: bbox.area() as f64,
            mask: None,
        }
    }
}

/// A class name. Cloning shares the same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(Arc<str>);

impl Label {
    /// Labels are non-empty; returns `None` for an empty string.
    /// Whitespace and case are kept exactly as given.
    pub fn new(text: &str) -> Option<Self> {
        if text.is_empty() {
            None
        } else {
            Some(Self(Arc::from(text)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether two labels share the same allocation, not just the same text.
    pub fn ptr_eq(&self, other: &Label) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledBox {
    pub label: Label,
    pub bbox: BoxCoords,
}

/// Everything written to one annotation document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAnnotation {
    pub folder: String,
    pub filename: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub objects: Vec<LabeledBox>,
}

/// One image found in the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub filename: String,
}
