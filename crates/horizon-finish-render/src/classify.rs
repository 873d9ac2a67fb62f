//! Heuristic border classification.
//!
//! [`BorderClassifier`] decides whether a finished card face has a flat,
//! uniform-colour border that can simply be extended, or textured edge
//! artwork that has to be mirrored outward. It looks at a handful of edge
//! pixels only:
//!
//! ```text
//!        (w/2, 0)
//!   +-------*-------+
//!   |               |
//!   *  (0, h/3)     *  (w-1, h/3)
//!   |               |
//!   *  (0, 2h/3)    *  (w-1, 2h/3)
//!   |               |
//!   +-------*-------+
//!        (w/2, h-1)
//! ```
//!
//! Typical card templates (flat mats, rounded corners) are classified
//! correctly from those six samples. When the border is uniform but none of
//! the four corner pixels share its colour, the corners are assumed to be
//! cut or rounded, and each corner is measured by scanning inward along
//! both adjacent edges.

use tracing::debug;

use crate::logging::targets;
use crate::pixel_buffer::PixelBuffer;
use crate::similarity::ColourMatch;
use crate::types::{Argb, Corner};

/// Inset distances describing one cut corner.
///
/// A cut corner is reconstructed as the right triangle between the corner
/// point, the point `inset_x` pixels along the horizontal edge, and the
/// point `inset_y` pixels along the vertical edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CornerCut {
    /// Whether a cut line could be measured for this corner.
    pub cut: bool,
    /// Distance from the corner along the top or bottom edge.
    pub inset_x: u32,
    /// Distance from the corner along the left or right edge.
    pub inset_y: u32,
}

impl CornerCut {
    /// A corner that is not cut.
    pub const NONE: Self = Self {
        cut: false,
        inset_x: 0,
        inset_y: 0,
    };
}

/// The result of classifying an image's border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BorderClassification {
    /// Whether the edge samples all share one colour.
    pub uniform: bool,
    /// The sampled border colour, when uniform.
    pub border: Option<Argb>,
    /// Whether none of the corner pixels match the border colour.
    pub corners_cut: bool,
    /// Per-corner cut measurements, indexed by [`Corner::index`].
    pub corners: [CornerCut; 4],
}

impl BorderClassification {
    /// Classification for artwork without a uniform border.
    pub const TEXTURED: Self = Self {
        uniform: false,
        border: None,
        corners_cut: false,
        corners: [CornerCut::NONE; 4],
    };

    /// Measurements for a single corner.
    #[inline]
    pub fn corner(&self, corner: Corner) -> CornerCut {
        self.corners[corner.index()]
    }

    /// True if at least one corner has a measurable cut.
    pub fn any_corner_cut(&self) -> bool {
        self.corners.iter().any(|c| c.cut)
    }
}

/// Samples edge pixels to classify a card face's border.
#[derive(Debug, Clone, Copy, Default)]
pub struct BorderClassifier {
    metric: Option<ColourMatch>,
}

impl BorderClassifier {
    /// Create a classifier that picks its colour metric from the image.
    ///
    /// Images with transparency are compared with alpha included so a
    /// transparent corner never matches an opaque border.
    pub fn new() -> Self {
        Self { metric: None }
    }

    /// Create a classifier that always uses the given metric.
    pub fn with_metric(metric: ColourMatch) -> Self {
        Self {
            metric: Some(metric),
        }
    }

    /// Classify an image's border.
    ///
    /// Never fails: empty images are reported as textured.
    pub fn classify(&self, image: &PixelBuffer) -> BorderClassification {
        if image.is_empty() {
            return BorderClassification::TEXTURED;
        }

        let metric = self
            .metric
            .unwrap_or_else(|| ColourMatch::for_alpha(image.has_alpha()));
        let (w, h) = image.dimensions();

        let border = image.pixel(w / 2, 0);
        let samples = [
            (w / 2, h - 1),
            (0, h / 3),
            (w - 1, h / 3),
            (0, h * 2 / 3),
            (w - 1, h * 2 / 3),
        ];
        let uniform = samples
            .iter()
            .all(|&(x, y)| metric.matches(border, image.pixel(x, y)));

        if !uniform {
            debug!(target: targets::CLASSIFY, width = w, height = h, "textured border");
            return BorderClassification::TEXTURED;
        }

        let corner_points = [(0, 0), (w - 1, 0), (w - 1, h - 1), (0, h - 1)];
        let corners_cut = corner_points
            .iter()
            .all(|&(x, y)| !metric.matches(border, image.pixel(x, y)));

        let mut corners = [CornerCut::NONE; 4];
        if corners_cut {
            for corner in Corner::ALL {
                corners[corner.index()] = measure_corner(image, corner, border, metric);
            }
        }

        debug!(
            target: targets::CLASSIFY,
            width = w,
            height = h,
            border = ?border,
            corners_cut,
            "uniform border"
        );

        BorderClassification {
            uniform: true,
            border: Some(border),
            corners_cut,
            corners,
        }
    }
}

/// Classify with the default classifier.
#[inline]
pub fn classify(image: &PixelBuffer) -> BorderClassification {
    BorderClassifier::new().classify(image)
}

/// Classify with a fixed colour metric.
#[inline]
pub fn classify_with(image: &PixelBuffer, metric: ColourMatch) -> BorderClassification {
    BorderClassifier::with_metric(metric).classify(image)
}

/// Scan inward from a corner along both edges to find where the border
/// colour resumes.
fn measure_corner(image: &PixelBuffer, corner: Corner, border: Argb, metric: ColourMatch) -> CornerCut {
    let (w, h) = image.dimensions();
    let cap_x = w / 3;
    let cap_y = h / 3;

    let row = if corner.is_bottom() { h - 1 } else { 0 };
    let col = if corner.is_right() { w - 1 } else { 0 };

    let inset_x = (1..=cap_x).find(|&i| {
        let x = if corner.is_right() { w - 1 - i } else { i };
        metric.matches(border, image.pixel(x, row))
    });
    let inset_y = (1..=cap_y).find(|&i| {
        let y = if corner.is_bottom() { h - 1 - i } else { i };
        metric.matches(border, image.pixel(col, y))
    });

    match (inset_x, inset_y) {
        (Some(inset_x), Some(inset_y)) => CornerCut {
            cut: true,
            inset_x,
            inset_y,
        },
        _ => CornerCut::NONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_buffer::ImageBlendMode;
    use crate::types::PixelRect;

    fn framed(width: u32, height: u32, border: Argb, interior: Argb) -> PixelBuffer {
        let mut img = PixelBuffer::from_color(width, height, border);
        img.fill_rect(
            PixelRect::new(1, 1, width - 2, height - 2),
            interior,
            ImageBlendMode::Replace,
        );
        img
    }

    #[test]
    fn test_empty_image_is_textured() {
        let img = PixelBuffer::new(0, 0);
        assert_eq!(classify(&img), BorderClassification::TEXTURED);
    }

    #[test]
    fn test_single_pixel_is_uniform() {
        let img = PixelBuffer::from_color(1, 1, Argb::rgb(9, 9, 9));
        let c = classify(&img);
        assert!(c.uniform);
        assert!(!c.corners_cut);
    }

    #[test]
    fn test_uniform_frame() {
        let border = Argb::rgb(20, 40, 60);
        let img = framed(30, 40, border, Argb::rgb(200, 200, 200));
        let c = classify(&img);
        assert!(c.uniform);
        assert_eq!(c.border, Some(border));
        assert!(!c.corners_cut);
        assert!(!c.any_corner_cut());
    }

    #[test]
    fn test_one_off_edge_sample_breaks_uniformity() {
        let mut img = framed(30, 30, Argb::rgb(20, 40, 60), Argb::WHITE);
        img.set_pixel(29, 10, Argb::rgb(250, 0, 0));
        assert!(!classify(&img).uniform);
    }

    #[test]
    fn test_noise_within_threshold_is_uniform() {
        let mut img = framed(30, 30, Argb::rgb(100, 100, 100), Argb::WHITE);
        img.set_pixel(0, 10, Argb::rgb(103, 98, 101));
        assert!(classify(&img).uniform);
    }

    #[test]
    fn test_chamfered_corners() {
        let border = Argb::rgb(0, 0, 128);
        let mut img = PixelBuffer::from_color(60, 60, border);
        // Clear a 5px chamfer in every corner: pixels with x + y < 5
        for y in 0..5u32 {
            for x in 0..(5 - y) {
                img.set_pixel(x, y, Argb::WHITE);
                img.set_pixel(59 - x, y, Argb::WHITE);
                img.set_pixel(x, 59 - y, Argb::WHITE);
                img.set_pixel(59 - x, 59 - y, Argb::WHITE);
            }
        }

        let c = classify(&img);
        assert!(c.uniform);
        assert!(c.corners_cut);
        for corner in Corner::ALL {
            let cut = c.corner(corner);
            assert!(cut.cut, "{corner:?}");
            assert_eq!((cut.inset_x, cut.inset_y), (5, 5), "{corner:?}");
        }
    }

    #[test]
    fn test_one_matching_corner_means_not_cut() {
        let border = Argb::rgb(0, 0, 128);
        let mut img = PixelBuffer::from_color(30, 30, border);
        img.set_pixel(0, 0, Argb::WHITE);
        img.set_pixel(29, 0, Argb::WHITE);
        img.set_pixel(0, 29, Argb::WHITE);
        // bottom-right corner still matches the border

        let c = classify(&img);
        assert!(c.uniform);
        assert!(!c.corners_cut);
    }

    #[test]
    fn test_scan_is_capped() {
        let border = Argb::rgb(0, 0, 128);
        let mut img = PixelBuffer::from_color(9, 9, border);
        // Top row off-colour up to x = 3, which is past the cap of 9 / 3
        for x in 0..4 {
            for corner_y in [0u32, 8] {
                img.set_pixel(x, corner_y, Argb::WHITE);
                img.set_pixel(8 - x, corner_y, Argb::WHITE);
            }
        }
        for y in 0..2 {
            for corner_x in [0u32, 8] {
                img.set_pixel(corner_x, y, Argb::WHITE);
                img.set_pixel(corner_x, 8 - y, Argb::WHITE);
            }
        }

        let c = classify(&img);
        assert!(c.corners_cut);
        assert!(!c.any_corner_cut());
    }

    #[test]
    fn test_forced_metric() {
        let mut img = PixelBuffer::from_color(10, 10, Argb::rgb(0, 0, 0));
        img.set_pixel(0, 3, Argb::TRANSPARENT);
        img.set_has_alpha(true);
        assert!(!BorderClassifier::new().classify(&img).uniform);
        assert!(
            BorderClassifier::with_metric(ColourMatch::Rgb)
                .classify(&img)
                .uniform
        );
    }
}
