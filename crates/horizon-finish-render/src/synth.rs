//! Bleed margin synthesis.
//!
//! [`BorderSynthesizer`] is the entry point used when a sheet is rendered
//! with a bleed margin but its artwork was drawn without one. It classifies
//! the border and either extends it as flat colour (closing any rounded
//! corners first) or mirrors the edge artwork outward.
//!
//! [`cut_corners`] is the opposite finishing step: it trims a face to a
//! rounded rectangle, leaving transparent corners.

use std::borrow::Cow;

use rayon::prelude::*;
use tracing::debug;

use crate::classify::{BorderClassification, BorderClassifier};
use crate::error::{FinishError, FinishResult};
use crate::inpaint::CornerInpainter;
use crate::logging::{PerfSpan, span_names, targets};
use crate::mirror::MirrorTiler;
use crate::pixel_buffer::PixelBuffer;

/// Samples per axis when antialiasing rounded corners.
const CORNER_SUPERSAMPLE: u32 = 4;

/// Which synthesis path to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BleedStrategy {
    /// Classify the border and pick a path.
    #[default]
    Auto,
    /// Always extend as flat colour.
    SolidFill,
    /// Always mirror the edge artwork.
    Mirror,
}

/// Synthesizes bleed margins around finished card faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct BorderSynthesizer {
    classifier: BorderClassifier,
    tiler: MirrorTiler,
}

impl BorderSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific classifier.
    pub fn with_classifier(mut self, classifier: BorderClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Use a specific mirror tiler.
    pub fn with_tiler(mut self, tiler: MirrorTiler) -> Self {
        self.tiler = tiler;
        self
    }

    /// Add a `margin` pixel bleed on every side of `image`.
    ///
    /// Returns the input unchanged when `margin` is zero. The optional
    /// `template` is only used when the edge art is mirrored.
    ///
    /// # Errors
    ///
    /// Returns [`FinishError::InvalidDimensions`] if the image is empty, or
    /// [`FinishError::InvalidMargin`] if the padded canvas would be too
    /// large.
    pub fn synthesize<'a>(
        &self,
        image: &'a PixelBuffer,
        template: Option<&PixelBuffer>,
        margin: u32,
    ) -> FinishResult<Cow<'a, PixelBuffer>> {
        self.synthesize_with(image, template, margin, BleedStrategy::Auto)
    }

    /// Like [`synthesize`](Self::synthesize) with an explicit strategy.
    pub fn synthesize_with<'a>(
        &self,
        image: &'a PixelBuffer,
        template: Option<&PixelBuffer>,
        margin: u32,
        strategy: BleedStrategy,
    ) -> FinishResult<Cow<'a, PixelBuffer>> {
        image.require_non_empty()?;
        if margin == 0 {
            return Ok(Cow::Borrowed(image));
        }
        image.bleed_dimensions(margin)?;
        let _span = PerfSpan::new(span_names::SYNTHESIZE);

        let classification = match strategy {
            BleedStrategy::Mirror => BorderClassification::TEXTURED,
            _ => self.classifier.classify(image),
        };
        let solid = match strategy {
            BleedStrategy::Auto => classification.uniform,
            BleedStrategy::SolidFill => true,
            BleedStrategy::Mirror => false,
        };

        let out = if solid {
            let border = classification
                .border
                .unwrap_or_else(|| image.pixel(image.width() / 2, 0));
            let inpainter = CornerInpainter::for_image(image);
            debug!(
                target: targets::SYNTH,
                margin,
                mode = ?inpainter.mode(),
                corners_cut = classification.corners_cut,
                "solid fill"
            );
            inpainter.fill(image, border, &classification, margin)?
        } else {
            debug!(
                target: targets::SYNTH,
                margin,
                template = template.is_some(),
                "mirror"
            );
            self.tiler.extend(image, template, margin)?
        };
        Ok(Cow::Owned(out))
    }
}

/// Add a bleed margin with the default synthesizer.
pub fn synthesize<'a>(
    image: &'a PixelBuffer,
    template: Option<&PixelBuffer>,
    margin: u32,
) -> FinishResult<Cow<'a, PixelBuffer>> {
    BorderSynthesizer::new().synthesize(image, template, margin)
}

/// Trim an image to a rounded rectangle with corner radius `radius` pixels.
///
/// Pixels outside the rounded rectangle become transparent; edge pixels are
/// antialiased. A radius of zero (or less) returns the image unchanged. The
/// radius is limited to half the shorter side.
pub fn cut_corners(image: &PixelBuffer, radius: f64) -> Cow<'_, PixelBuffer> {
    if !(radius > 0.0) || image.is_empty() {
        return Cow::Borrowed(image);
    }

    let (w, h) = image.dimensions();
    let r = radius.min(w.min(h) as f64 / 2.0);
    debug!(target: targets::SYNTH, width = w, height = h, radius = r, "cutting corners");

    let mut out = image.clone();
    out.set_has_alpha(true);

    let row_bytes = w as usize * 4;
    out.as_raw_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                let coverage = corner_coverage(x, y as u32, w, h, r);
                if coverage == 1.0 {
                    continue;
                }
                let a = &mut row[x as usize * 4 + 3];
                *a = (*a as f64 * coverage).round() as u8;
            }
        });
    Cow::Owned(out)
}

/// Fraction of a pixel inside a `w x h` rounded rectangle.
fn corner_coverage(x: u32, y: u32, w: u32, h: u32, r: f64) -> f64 {
    let (wf, hf) = (w as f64, h as f64);
    let (xf, yf) = (x as f64, y as f64);

    let in_corner_x = xf < r || xf + 1.0 > wf - r;
    let in_corner_y = yf < r || yf + 1.0 > hf - r;
    if !(in_corner_x && in_corner_y) {
        return 1.0;
    }

    let n = CORNER_SUPERSAMPLE;
    let step = 1.0 / n as f64;
    let mut inside = 0u32;
    for j in 0..n {
        let py = yf + (j as f64 + 0.5) * step;
        let cy = py.clamp(r, hf - r);
        for i in 0..n {
            let px = xf + (i as f64 + 0.5) * step;
            let cx = px.clamp(r, wf - r);
            let (dx, dy) = (px - cx, py - cy);
            if dx * dx + dy * dy <= r * r {
                inside += 1;
            }
        }
    }
    inside as f64 / (n * n) as f64
}

impl From<&BorderClassification> for BleedStrategy {
    fn from(c: &BorderClassification) -> Self {
        if c.uniform {
            BleedStrategy::SolidFill
        } else {
            BleedStrategy::Mirror
        }
    }
}

/// Check a point-unit radius before converting it.
pub(crate) fn validate_radius(radius: f64) -> FinishResult<f64> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(FinishError::InvalidRadius(radius));
    }
    Ok(radius)
}
