//! Flat-colour margin fill with corner reconstruction.
//!
//! When a card face has a uniform border, the bleed margin is simply more
//! border. Rounded or chamfered corners leave a notch that has to be closed
//! first, otherwise the notch would show up as a hole in the bleed. Each cut
//! corner is closed by painting the right triangle measured by the
//! [`BorderClassifier`](crate::BorderClassifier) in the border colour.

use tracing::trace;

use crate::classify::BorderClassification;
use crate::error::FinishResult;
use crate::logging::targets;
use crate::pixel_buffer::{ImageBlendMode, PixelBuffer};
use crate::types::{Argb, Corner, PixelRect};

/// How the margin and the corner notches are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// For opaque sources: the whole canvas is flooded with the border
    /// colour and cut corners are painted over the source.
    #[default]
    Solid,
    /// For sources with transparency: only the four margin strips get the
    /// border colour, preserving its alpha, so transparent regions of the
    /// source stay transparent.
    AlphaAware,
}

impl FillMode {
    /// The fill mode for a source with or without transparency.
    #[inline]
    pub fn for_alpha(has_alpha: bool) -> Self {
        if has_alpha {
            Self::AlphaAware
        } else {
            Self::Solid
        }
    }
}

/// Extends a uniform border into a margin and fills corner notches.
#[derive(Debug, Clone, Copy, Default)]
pub struct CornerInpainter {
    mode: FillMode,
}

impl CornerInpainter {
    pub fn new(mode: FillMode) -> Self {
        Self { mode }
    }

    /// The in-painter matching a source's transparency.
    pub fn for_image(image: &PixelBuffer) -> Self {
        Self::new(FillMode::for_alpha(image.has_alpha()))
    }

    #[inline]
    pub fn mode(&self) -> FillMode {
        self.mode
    }

    /// Build a `(w + 2m) x (h + 2m)` canvas with the source centred and the
    /// margin filled with `border`.
    ///
    /// # Errors
    ///
    /// Returns [`FinishError::InvalidMargin`](crate::FinishError::InvalidMargin)
    /// if the padded canvas is too large.
    pub fn fill(
        &self,
        image: &PixelBuffer,
        border: Argb,
        classification: &BorderClassification,
        margin: u32,
    ) -> FinishResult<PixelBuffer> {
        let (w, h) = image.dimensions();
        let (cw, ch) = image.bleed_dimensions(margin)?;
        let m = margin as i64;

        let mut canvas = match self.mode {
            FillMode::Solid => {
                let mut canvas = PixelBuffer::from_color(cw, ch, border.opaque());
                canvas.set_has_alpha(image.has_alpha());
                canvas.draw(image, m, m, ImageBlendMode::Normal);
                canvas
            }
            FillMode::AlphaAware => {
                let mut canvas = PixelBuffer::new(cw, ch);
                let strips = [
                    PixelRect::new(0, 0, cw, margin),
                    PixelRect::new(0, m + h as i64, cw, margin),
                    PixelRect::new(0, m, margin, h),
                    PixelRect::new(m + w as i64, m, margin, h),
                ];
                for strip in strips {
                    canvas.fill_rect(strip, border, ImageBlendMode::Replace);
                }
                canvas.draw(image, m, m, ImageBlendMode::Normal);
                canvas
            }
        };

        if classification.corners_cut {
            paint_corners(&mut canvas, classification, (m, m), (w, h), border);
        }
        Ok(canvas)
    }
}

/// Paint every cut corner triangle of a `size` image placed at `origin`.
pub fn paint_corners(
    canvas: &mut PixelBuffer,
    classification: &BorderClassification,
    origin: (i64, i64),
    size: (u32, u32),
    color: Argb,
) {
    let (ox, oy) = (origin.0 as f32, origin.1 as f32);
    let (w, h) = (size.0 as f32, size.1 as f32);

    for corner in Corner::ALL {
        let cut = classification.corner(corner);
        if !cut.cut {
            continue;
        }

        // Corner point on the pixel grid edge, and directions into the image
        let (cx, dx) = if corner.is_right() { (ox + w, -1.0) } else { (ox, 1.0) };
        let (cy, dy) = if corner.is_bottom() { (oy + h, -1.0) } else { (oy, 1.0) };

        let triangle = [
            (cx, cy),
            (cx + dx * cut.inset_x as f32, cy),
            (cx, cy + dy * cut.inset_y as f32),
        ];
        trace!(
            target: targets::SYNTH,
            ?corner,
            inset_x = cut.inset_x,
            inset_y = cut.inset_y,
            "painting corner"
        );
        fill_polygon(canvas, &triangle, color, ImageBlendMode::Normal);
    }
}

/// Scanline polygon fill.
///
/// A pixel is painted when its centre lies inside the polygon or on its
/// boundary.
pub fn fill_polygon(canvas: &mut PixelBuffer, points: &[(f32, f32)], color: Argb, mode: ImageBlendMode) {
    let n = points.len();
    if n < 3 || canvas.is_empty() {
        return;
    }
    let (w, h) = canvas.dimensions();

    let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_y = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
    let y_start = (min_y - 0.5).ceil().max(0.0) as u32;
    let y_end = ((max_y - 0.5).floor() + 1.0).clamp(0.0, h as f32) as u32;

    let mut nodes: Vec<f32> = Vec::with_capacity(n);
    for y in y_start..y_end {
        let yf = y as f32 + 0.5;
        nodes.clear();
        for i in 0..n {
            let j = (i + 1) % n;
            let (xi, yi) = points[i];
            let (xj, yj) = points[j];
            if (yi < yf && yj >= yf) || (yj < yf && yi >= yf) {
                let t = (yf - yi) / (yj - yi);
                nodes.push(xi + t * (xj - xi));
            }
        }
        nodes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        for pair in nodes.chunks_exact(2) {
            let x_start = (pair[0] - 0.5).ceil().max(0.0);
            let x_end = ((pair[1] - 0.5).floor() + 1.0).min(w as f32);
            if x_end <= x_start {
                continue;
            }
            for x in x_start as u32..x_end as u32 {
                canvas.blend_pixel(x, y, color, mode);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{CornerCut, classify};

    fn chamfered(size: u32, inset: u32, border: Argb, notch: Argb) -> PixelBuffer {
        let mut img = PixelBuffer::from_color(size, size, border);
        let last = size - 1;
        for y in 0..inset {
            for x in 0..(inset - y) {
                img.set_pixel(x, y, notch);
                img.set_pixel(last - x, y, notch);
                img.set_pixel(x, last - y, notch);
                img.set_pixel(last - x, last - y, notch);
            }
        }
        img
    }

    #[test]
    fn test_fill_mode_for_alpha() {
        assert_eq!(FillMode::for_alpha(false), FillMode::Solid);
        assert_eq!(FillMode::for_alpha(true), FillMode::AlphaAware);
    }

    #[test]
    fn test_fill_polygon_triangle() {
        let mut canvas = PixelBuffer::new(10, 10);
        fill_polygon(
            &mut canvas,
            &[(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)],
            Argb::WHITE,
            ImageBlendMode::Replace,
        );
        for y in 0..10 {
            for x in 0..10 {
                let expected = if x + y < 4 { Argb::WHITE } else { Argb::TRANSPARENT };
                assert_eq!(canvas.get_pixel(x, y), Some(expected), "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_fill_polygon_clips() {
        let mut canvas = PixelBuffer::new(4, 4);
        fill_polygon(
            &mut canvas,
            &[(-5.0, -5.0), (20.0, -5.0), (20.0, 20.0), (-5.0, 20.0)],
            Argb::WHITE,
            ImageBlendMode::Replace,
        );
        assert!(canvas.as_raw().chunks(4).all(|p| p == [255, 255, 255, 255]));
    }

    #[test]
    fn test_solid_fill_closes_notches() {
        let border = Argb::rgb(30, 60, 90);
        let img = chamfered(40, 5, border, Argb::WHITE);
        let c = classify(&img);
        assert!(c.corners_cut);

        let out = CornerInpainter::for_image(&img).fill(&img, border, &c, 8).unwrap();
        assert_eq!(out.dimensions(), (56, 56));
        assert!(!out.has_alpha());
        for (x, y) in [(0, 0), (8, 8), (12, 8), (47, 8), (8, 47), (47, 47), (55, 55)] {
            assert_eq!(out.get_pixel(x, y), Some(border), "({x}, {y})");
        }
    }

    #[test]
    fn test_alpha_aware_keeps_interior_transparency() {
        let border = Argb::rgb(200, 10, 10);
        let mut img = PixelBuffer::from_color(20, 20, border);
        img.set_has_alpha(true);
        img.set_pixel(10, 10, Argb::TRANSPARENT);
        let c = classify(&img);
        assert!(c.uniform);

        let out = CornerInpainter::new(FillMode::AlphaAware).fill(&img, border, &c, 4).unwrap();
        assert!(out.has_alpha());
        assert_eq!(out.get_pixel(0, 0), Some(border));
        assert_eq!(out.get_pixel(27, 13), Some(border));
        assert_eq!(out.get_pixel(14, 14), Some(Argb::TRANSPARENT));
    }

    #[test]
    fn test_alpha_aware_fills_transparent_corners() {
        let border = Argb::rgb(0, 128, 0);
        let mut img = chamfered(30, 4, border, Argb::TRANSPARENT);
        img.set_has_alpha(true);
        let c = classify(&img);
        assert!(c.corners_cut);

        let out = CornerInpainter::for_image(&img).fill(&img, border, &c, 3).unwrap();
        assert_eq!(out.get_pixel(3, 3), Some(border));
        assert_eq!(out.get_pixel(32, 32), Some(border));
    }

    #[test]
    fn test_uncut_corner_is_left_alone() {
        let border = Argb::rgb(0, 0, 0);
        let mut c = BorderClassification::TEXTURED;
        c.uniform = true;
        c.corners_cut = true;
        c.corners[Corner::TopLeft.index()] = CornerCut {
            cut: true,
            inset_x: 2,
            inset_y: 2,
        };

        let mut canvas = PixelBuffer::new(6, 6);
        paint_corners(&mut canvas, &c, (0, 0), (6, 6), border);
        assert_eq!(canvas.get_pixel(0, 0), Some(border));
        assert_eq!(canvas.get_pixel(5, 0), Some(Argb::TRANSPARENT));
        assert_eq!(canvas.get_pixel(5, 5), Some(Argb::TRANSPARENT));
    }
}
