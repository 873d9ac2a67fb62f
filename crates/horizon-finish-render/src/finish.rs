//! Finish styles and render targets.
//!
//! A sheet is finished in one of three ways: left square, trimmed to rounded
//! corners, or given a bleed margin. [`FinishStyle`] selects among them and
//! works in points so the same style applies at any resolution.
//!
//! [`RenderTarget`] captures how much quality a render needs, and decides
//! the resampling filter and whether mip-maps are used when scaling
//! artwork.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;

use crate::error::{FinishError, FinishResult};
use crate::logging::targets;
use crate::mipmap::MipmapCache;
use crate::pixel_buffer::{PixelBuffer, ResizeFilter};
use crate::synth::{BorderSynthesizer, cut_corners, validate_radius};

/// Points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Convert a length in points to pixels at `dpi`.
///
/// # Errors
///
/// Fails with [`FinishError::InvalidMargin`] for a negative or non-finite
/// length, and [`FinishError::InvalidResolution`] for a resolution that is
/// not a positive finite number.
pub fn points_to_pixels(points: f64, dpi: f64) -> FinishResult<f64> {
    if !points.is_finite() || points < 0.0 {
        return Err(FinishError::InvalidMargin(points));
    }
    validate_dpi(dpi)?;
    Ok(points * dpi / POINTS_PER_INCH)
}

pub(crate) fn validate_dpi(dpi: f64) -> FinishResult<f64> {
    if !dpi.is_finite() || dpi <= 0.0 {
        return Err(FinishError::InvalidResolution(dpi));
    }
    Ok(dpi)
}

// ============================================================================
// RENDER TARGET
// ============================================================================

/// The quality level a render is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderTarget {
    /// Interactive feedback while editing; speed over quality.
    FastPreview,
    /// Normal on-screen preview.
    #[default]
    Preview,
    /// Image export.
    Export,
    /// Printing; full resolution, best filter.
    Print,
}

impl RenderTarget {
    pub const ALL: [RenderTarget; 4] = [
        RenderTarget::FastPreview,
        RenderTarget::Preview,
        RenderTarget::Export,
        RenderTarget::Print,
    ];

    /// The configuration name of this target.
    pub fn name(self) -> &'static str {
        match self {
            RenderTarget::FastPreview => "fast-preview",
            RenderTarget::Preview => "preview",
            RenderTarget::Export => "export",
            RenderTarget::Print => "print",
        }
    }

    /// Look up a target by configuration name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Interpolation used when scaling artwork for this target.
    pub fn resize_filter(self) -> ResizeFilter {
        match self {
            RenderTarget::FastPreview => ResizeFilter::Nearest,
            RenderTarget::Preview => ResizeFilter::Triangle,
            RenderTarget::Export => ResizeFilter::CatmullRom,
            RenderTarget::Print => ResizeFilter::Lanczos3,
        }
    }

    /// Whether scaling starts from a cached mip-map level.
    ///
    /// Print resamples from the master so no detail is lost to earlier
    /// halving steps.
    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, RenderTarget::Print)
    }

    /// Scale `master` to `width` pixels wide, keeping its aspect ratio.
    ///
    /// # Errors
    ///
    /// Fails with [`FinishError::InvalidDimensions`] if the master is empty
    /// or `width` is zero.
    pub fn resample(
        self,
        cache: &MipmapCache,
        master: &Arc<PixelBuffer>,
        width: u32,
    ) -> FinishResult<Arc<PixelBuffer>> {
        master.require_non_empty()?;
        if width == 0 {
            return Err(FinishError::InvalidDimensions {
                width,
                height: master.height(),
            });
        }

        let source = if self.uses_mipmaps() {
            cache.variant(master, width)
        } else {
            Arc::clone(master)
        };
        if source.width() == width {
            return Ok(source);
        }

        let height = ((master.height() as f64 * width as f64 / master.width() as f64).round()
            as u32)
            .max(1);
        debug!(
            target: targets::FINISH,
            target_name = self.name(),
            from_width = source.width(),
            to_width = width,
            to_height = height,
            "resampling"
        );
        Ok(Arc::new(source.resize(width, height, self.resize_filter())))
    }
}

// ============================================================================
// FINISH STYLE
// ============================================================================

/// How the edges of a finished face are treated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FinishStyle {
    /// Leave the face as rendered.
    #[default]
    Square,
    /// Trim to rounded corners of the given radius in points.
    Round { radius_pt: f64 },
    /// Add a bleed margin of the given width in points.
    Margin { bleed_pt: f64 },
}

impl FinishStyle {
    /// The configuration name of this style.
    pub fn name(&self) -> &'static str {
        match self {
            FinishStyle::Square => "square",
            FinishStyle::Round { .. } => "round",
            FinishStyle::Margin { .. } => "margin",
        }
    }

    /// Build a style from its configuration name and point sizes.
    pub fn from_name(name: &str, radius_pt: f64, bleed_pt: f64) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "square" => Some(FinishStyle::Square),
            "round" => Some(FinishStyle::Round { radius_pt }),
            "margin" => Some(FinishStyle::Margin { bleed_pt }),
            _ => None,
        }
    }

    /// Check the style's sizes are usable.
    pub fn validate(&self) -> FinishResult<()> {
        match *self {
            FinishStyle::Square => Ok(()),
            FinishStyle::Round { radius_pt } => validate_radius(radius_pt).map(|_| ()),
            FinishStyle::Margin { bleed_pt } => points_to_pixels(bleed_pt, 72.0).map(|_| ()),
        }
    }

    /// Apply the style to a face rendered at `dpi`.
    ///
    /// `template` is forwarded to bleed synthesis and ignored otherwise.
    pub fn apply<'a>(
        &self,
        image: &'a PixelBuffer,
        template: Option<&PixelBuffer>,
        dpi: f64,
    ) -> FinishResult<Cow<'a, PixelBuffer>> {
        self.apply_with(&BorderSynthesizer::new(), image, template, dpi)
    }

    /// Like [`apply`](Self::apply) with a configured synthesizer.
    pub fn apply_with<'a>(
        &self,
        synthesizer: &BorderSynthesizer,
        image: &'a PixelBuffer,
        template: Option<&PixelBuffer>,
        dpi: f64,
    ) -> FinishResult<Cow<'a, PixelBuffer>> {
        validate_dpi(dpi)?;
        debug!(target: targets::FINISH, style = self.name(), dpi, "applying finish");

        match *self {
            FinishStyle::Square => Ok(Cow::Borrowed(image)),
            FinishStyle::Round { radius_pt } => {
                let radius_px = validate_radius(radius_pt)? * dpi / POINTS_PER_INCH;
                Ok(cut_corners(image, radius_px))
            }
            FinishStyle::Margin { bleed_pt } => {
                let margin = points_to_pixels(bleed_pt, dpi)?.round();
                if margin > f64::from(u32::MAX) {
                    return Err(FinishError::InvalidMargin(bleed_pt));
                }
                synthesizer.synthesize(image, template, margin as u32)
            }
        }
    }
}
