//! Skew correction for linear-code crops.
//!
//! # Algorithm
//!
//! 1. Collapse to grayscale
//! 2. Erode then dilate with a square window (removes speckle)
//! 3. Canny edge map
//! 4. Hough accumulator proposes polar lines; each line is walked across the
//!    edge map and split into segments, bridging short gaps
//! 5. The angle of the last segment found, `atan2(dy, dx)` in degrees
//! 6. Reframe onto a white square canvas, rotate about its center by that angle
//!
//! Segments are oriented left to right, so angles fall in (-90, 90].

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::frame::Image;
use crate::luminance::to_grayscale;
use crate::transform::{pad_to_square, rotate_about_center, InterpolationFilter};

const WHITE: [u8; 3] = [255, 255, 255];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskewConfig {
    /// Side of the square erosion/dilation window. Odd.
    pub kernel_size: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Minimum Hough votes for a line.
    pub vote_threshold: u32,
    /// Radius, in accumulator bins, of non-maximum suppression.
    pub suppression_radius: u32,
    /// Shortest segment kept, in pixels.
    pub min_line_length: f32,
    /// Longest run of non-edge pixels bridged inside one segment.
    pub max_line_gap: f32,
    pub filter: InterpolationFilter,
}

impl Default for DeskewConfig {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            canny_low: 50.0,
            canny_high: 200.0,
            vote_threshold: 50,
            suppression_radius: 8,
            min_line_length: 50.0,
            max_line_gap: 10.0,
            filter: InterpolationFilter::Bilinear,
        }
    }
}

/// A straight run of edge pixels, oriented left to right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: (f32, f32),
    pub end: (f32, f32),
}

impl LineSegment {
    fn new(a: (f32, f32), b: (f32, f32)) -> Self {
        if (b.0, b.1) < (a.0, a.1) {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }

    pub fn length(&self) -> f32 {
        let dx = self.end.0 - self.start.0;
        let dy = self.end.1 - self.start.1;
        (dx * dx + dy * dy).sqrt()
    }

    /// Direction in degrees, `atan2(dy, dx)`.
    pub fn angle_degrees(&self) -> f64 {
        let dx = (self.end.0 - self.start.0) as f64;
        let dy = (self.end.1 - self.start.1) as f64;
        dy.atan2(dx).to_degrees()
    }
}

/// Deskew result.
#[derive(Debug, Clone)]
pub struct Deskewed {
    pub image: Image,
    /// Rotation applied, in degrees. 0 when no segment was found.
    pub angle: f64,
    pub segment_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RotationCorrector {
    config: DeskewConfig,
}

impl RotationCorrector {
    pub fn new(config: DeskewConfig) -> Self {
        Self { config }
    }

    /// Straighten an image. Never fails; without segments the result is
    /// the image reframed onto a square canvas.
    pub fn deskew(&self, image: &Image) -> Image {
        self.deskew_with_angle(image).image
    }

    pub fn deskew_with_angle(&self, image: &Image) -> Deskewed {
        if image.is_empty() || !image.is_consistent() {
            return Deskewed {
                image: image.clone(),
                angle: 0.0,
                segment_count: 0,
            };
        }

        let segments = self.line_segments(image);
        let angle = segments.last().map(LineSegment::angle_degrees).unwrap_or(0.0);
        debug!(segments = segments.len(), angle, "deskew angle");

        let square = pad_to_square(image, WHITE);
        let rotated = rotate_about_center(&square, angle, self.config.filter, WHITE);

        Deskewed {
            image: rotated,
            angle,
            segment_count: segments.len(),
        }
    }

    /// Line segments found in the image, in the order they are examined.
    pub fn line_segments(&self, image: &Image) -> Vec<LineSegment> {
        let gray = to_grayscale(image);
        let radius = u8::try_from(self.config.kernel_size / 2).unwrap_or(u8::MAX);
        let opened = open_gray(&gray, radius);
        let edges = canny(&opened, self.config.canny_low, self.config.canny_high);

        let lines = detect_lines(
            &edges,
            LineDetectionOptions {
                vote_threshold: self.config.vote_threshold,
                suppression_radius: self.config.suppression_radius,
            },
        );
        trace!(lines = lines.len(), "hough lines");

        lines
            .iter()
            .flat_map(|line| {
                walk_line(
                    &edges,
                    line,
                    self.config.min_line_length,
                    self.config.max_line_gap,
                )
            })
            .collect()
    }
}

/// Grayscale opening (erode then dilate) with a square window of side
/// `2 * radius + 1`. Removes bright specks smaller than the window.
fn open_gray(image: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return image.clone();
    }
    let mask = Mask::square(radius);
    grayscale_dilate(&grayscale_erode(image, &mask), &mask)
}

/// Split a polar line into segments of edge pixels.
///
/// The line is `x*cos(θ) + y*sin(θ) = r`. It is sampled at unit steps; a
/// sample counts as an edge when the pixel under it, or one of its two
/// neighbours across the line, is set.
fn walk_line(edges: &GrayImage, line: &PolarLine, min_length: f32, max_gap: f32) -> Vec<LineSegment> {
    let (w, h) = edges.dimensions();
    let theta = (line.angle_in_degrees as f32).to_radians();
    let (sin, cos) = theta.sin_cos();
    let (x0, y0) = (line.r * cos, line.r * sin);
    let (dx, dy) = (-sin, cos);
    let reach = ((w as f32).hypot(h as f32)).ceil() as i64 + 1;

    let is_edge = |x: f32, y: f32| -> bool {
        [-1.0f32, 0.0, 1.0].iter().any(|k| {
            let px = (x + k * cos).round();
            let py = (y + k * sin).round();
            px >= 0.0
                && py >= 0.0
                && (px as u32) < w
                && (py as u32) < h
                && edges.get_pixel(px as u32, py as u32)[0] > 0
        })
    };

    let mut segments = Vec::new();
    let mut run: Option<((f32, f32), (f32, f32), i64)> = None;

    for t in -reach..=reach {
        let x = x0 + t as f32 * dx;
        let y = y0 + t as f32 * dy;
        if !is_edge(x, y) {
            continue;
        }

        let point = (x.round(), y.round());
        run = match run {
            Some((start, _, last_t)) if (t - last_t - 1) as f32 <= max_gap => Some((start, point, t)),
            Some((start, end, _)) => {
                push_if_long(&mut segments, start, end, min_length);
                Some((point, point, t))
            }
            None => Some((point, point, t)),
        };
    }
    if let Some((start, end, _)) = run {
        push_if_long(&mut segments, start, end, min_length);
    }

    segments
}

fn push_if_long(segments: &mut Vec<LineSegment>, start: (f32, f32), end: (f32, f32), min_length: f32) {
    let segment = LineSegment::new(start, end);
    if segment.length() >= min_length {
        segments.push(segment);
    }
}
