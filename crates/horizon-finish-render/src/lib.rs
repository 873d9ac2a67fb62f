//! Edge finishing for rendered card faces.
//!
//! This crate takes a finished, rasterized face with no extra margin and
//! prepares it for print: it can synthesize a bleed margin around the
//! artwork, trim it to rounded corners, and scale it efficiently through a
//! mip-map cache.
//!
//! # Adding a Bleed Margin
//!
//! [`synthesize`] inspects the border and picks a strategy. Flat borders
//! are extended as solid colour (rounded corners are closed first); any
//! other edge art is mirrored outward.
//!
//! ```no_run
//! use horizon_finish_render::{PixelBuffer, synthesize};
//!
//! # fn example() -> horizon_finish_render::FinishResult<()> {
//! let face = PixelBuffer::from_file("front.png")?;
//!
//! // 9pt bleed at 300 dpi
//! let bled = synthesize(&face, None, 38)?;
//! assert_eq!(bled.width(), face.width() + 76);
//! bled.save("front-bleed.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Finishing in Points
//!
//! [`FinishStyle`] expresses the same operations in points:
//!
//! ```no_run
//! use horizon_finish_render::{FinishStyle, PixelBuffer};
//!
//! # fn example() -> horizon_finish_render::FinishResult<()> {
//! let face = PixelBuffer::from_file("front.png")?;
//! let rounded = FinishStyle::Round { radius_pt: 9.0 }.apply(&face, None, 300.0)?;
//! rounded.save("front-rounded.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Scaling Through Mip-maps
//!
//! ```no_run
//! use std::sync::Arc;
//! use horizon_finish_render::{MipmapCache, PixelBuffer, RenderTarget};
//!
//! # fn example() -> horizon_finish_render::FinishResult<()> {
//! let cache = MipmapCache::with_defaults();
//! let portrait = Arc::new(PixelBuffer::from_file("portrait.png")?);
//! let thumb = RenderTarget::Preview.resample(&cache, &portrait, 120)?;
//! assert_eq!(thumb.width(), 120);
//! # Ok(())
//! # }
//! ```

mod classify;
mod error;
mod finish;
mod inpaint;
mod mipmap;
mod mirror;
mod pixel_buffer;
mod similarity;
mod synth;
mod types;

pub mod logging;

// Core types
pub use error::{FinishError, FinishResult};
pub use pixel_buffer::{ImageBlendMode, ImageId, PixelBuffer, ResizeFilter};
pub use types::{Argb, Corner, PixelRect};

// Border analysis
pub use classify::{
    BorderClassification, BorderClassifier, CornerCut, classify, classify_with,
};
pub use similarity::{
    ColourMatch, SIMILARITY_THRESHOLD, rgb_distance_sq, similar, similar_with_alpha,
};

// Synthesis
pub use inpaint::{CornerInpainter, FillMode, fill_polygon, paint_corners};
pub use mirror::MirrorTiler;
pub use synth::{BleedStrategy, BorderSynthesizer, cut_corners, synthesize};

// Scaling and finishing
pub use finish::{FinishStyle, POINTS_PER_INCH, RenderTarget, points_to_pixels};
pub use mipmap::{MipmapCache, MipmapCacheConfig, MipmapCacheStats, MipmapChain};
