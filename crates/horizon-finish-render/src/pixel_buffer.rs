//! CPU-side pixel buffer for finishing operations.
//!
//! This module provides [`PixelBuffer`], an owned RGBA raster with an
//! explicit transparency flag. Finished card faces, templates, bleed
//! canvases and mip-map levels are all `PixelBuffer`s.
//!
//! # Example
//!
//! ```ignore
//! use horizon_finish_render::{Argb, PixelBuffer, ResizeFilter};
//!
//! let face = PixelBuffer::from_file("front.png")?;
//! let thumb = face.resize(face.width() / 4, face.height() / 4, ResizeFilter::CatmullRom);
//! thumb.save("front-thumb.png")?;
//!
//! let mat = PixelBuffer::from_color(750, 1050, Argb::rgb(32, 64, 128));
//! assert!(!mat.has_alpha());
//! ```
//!
//! # Identity
//!
//! Every buffer carries an [`ImageId`]. Caches such as
//! [`MipmapCache`](crate::MipmapCache) key on identity rather than content,
//! so cloning a buffer or touching it mutably assigns a new id.

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::error::{FinishError, FinishResult};
use crate::types::{Argb, PixelRect};

/// Counter for unique image ids.
static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one pixel buffer's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(u64);

impl ImageId {
    fn next() -> Self {
        Self(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Resampling filter for resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFilter {
    /// Nearest neighbor interpolation. Fast but pixelated.
    Nearest,
    /// Bilinear interpolation. Balanced speed and quality.
    #[default]
    Triangle,
    /// Catmull-Rom bicubic interpolation. Good quality.
    CatmullRom,
    /// Lanczos interpolation with window size 3. High quality.
    Lanczos3,
}

impl ResizeFilter {
    fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            ResizeFilter::Nearest => image::imageops::FilterType::Nearest,
            ResizeFilter::Triangle => image::imageops::FilterType::Triangle,
            ResizeFilter::CatmullRom => image::imageops::FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Blend mode for drawing one buffer onto another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageBlendMode {
    /// Standard source-over alpha blending.
    #[default]
    Normal,
    /// Direct replacement, ignoring destination.
    Replace,
}

/// An owned RGBA pixel buffer with a transparency flag.
///
/// Pixels are stored as straight-alpha RGBA8. Buffers created as opaque
/// keep alpha at 255 everywhere and report `has_alpha() == false`; the
/// flag decides which corner-fill mode bleed synthesis uses and which
/// format [`into_dynamic_image`](Self::into_dynamic_image) produces.
pub struct PixelBuffer {
    pixels: RgbaImage,
    has_alpha: bool,
    id: ImageId,
}

impl PixelBuffer {
    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    /// Create a new fully transparent buffer.
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_rgba_image(RgbaImage::new(width, height), true)
    }

    /// Create a buffer filled with a single colour.
    ///
    /// The buffer is opaque when the colour is.
    pub fn from_color(width: u32, height: u32, color: Argb) -> Self {
        let pixels = RgbaImage::from_pixel(width, height, color.into());
        Self::from_rgba_image(pixels, !color.is_opaque())
    }

    /// Wrap an existing RGBA image.
    #[inline]
    pub fn from_rgba_image(pixels: RgbaImage, has_alpha: bool) -> Self {
        Self {
            pixels,
            has_alpha,
            id: ImageId::next(),
        }
    }

    /// Create a buffer from a `DynamicImage`, keeping its transparency flag.
    pub fn from_dynamic_image(img: &DynamicImage) -> Self {
        Self::from_rgba_image(img.to_rgba8(), img.color().has_alpha())
    }

    /// Create a buffer from raw RGBA pixel data.
    ///
    /// The data must be exactly `width * height * 4` bytes in row-major
    /// order.
    pub fn from_rgba(data: &[u8], width: u32, height: u32) -> FinishResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(FinishError::ImageLoad(format!(
                "invalid data size: expected {} bytes, got {}",
                expected,
                data.len()
            )));
        }
        let rgba = RgbaImage::from_raw(width, height, data.to_vec()).ok_or_else(|| {
            FinishError::ImageLoad("failed to create image from raw data".to_string())
        })?;
        Ok(Self::from_rgba_image(rgba, true))
    }

    /// Create an opaque buffer from raw RGB pixel data.
    pub fn from_rgb(data: &[u8], width: u32, height: u32) -> FinishResult<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(FinishError::ImageLoad(format!(
                "invalid data size: expected {} bytes, got {}",
                expected,
                data.len()
            )));
        }
        let rgb = image::RgbImage::from_raw(width, height, data.to_vec()).ok_or_else(|| {
            FinishError::ImageLoad("failed to create image from raw data".to_string())
        })?;
        Ok(Self::from_dynamic_image(&DynamicImage::ImageRgb8(rgb)))
    }

    /// Load an image from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> FinishResult<Self> {
        let img = image::open(path.as_ref())
            .map_err(|e| FinishError::ImageLoad(format!("{}: {}", path.as_ref().display(), e)))?;
        Ok(Self::from_dynamic_image(&img))
    }

    /// Decode an image from encoded bytes in memory.
    pub fn from_bytes(bytes: &[u8]) -> FinishResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| FinishError::ImageLoad(format!("failed to decode image: {}", e)))?;
        Ok(Self::from_dynamic_image(&img))
    }

    // ========================================================================
    // PROPERTIES
    // ========================================================================

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Dimensions as a (width, height) tuple.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// True if either dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Whether the buffer may contain non-opaque pixels.
    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Set the transparency flag.
    #[inline]
    pub fn set_has_alpha(&mut self, has_alpha: bool) {
        self.has_alpha = has_alpha;
    }

    /// Identity of this buffer's content.
    #[inline]
    pub fn id(&self) -> ImageId {
        self.id
    }

    /// Estimated memory footprint (4 bytes per pixel).
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.width() as usize * self.height() as usize * 4
    }

    /// Bounds of the buffer as a rectangle at the origin.
    #[inline]
    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width(), self.height())
    }

    /// Ensure the buffer has a non-zero size.
    pub fn require_non_empty(&self) -> FinishResult<()> {
        if self.is_empty() {
            return Err(FinishError::dimensions(self.width(), self.height()));
        }
        Ok(())
    }

    /// Size of this buffer with a `margin` pixel border on every side.
    ///
    /// Fails with [`FinishError::InvalidMargin`] when the padded canvas
    /// would not fit in `u32` dimensions or in addressable memory.
    pub fn bleed_dimensions(&self, margin: u32) -> FinishResult<(u32, u32)> {
        let padded = margin.checked_mul(2).and_then(|pad| {
            let w = self.width().checked_add(pad)?;
            let h = self.height().checked_add(pad)?;
            (w as usize)
                .checked_mul(h as usize)?
                .checked_mul(4)
                .map(|_| (w, h))
        });
        padded.ok_or(FinishError::InvalidMargin(f64::from(margin)))
    }

    // ========================================================================
    // PIXEL ACCESS
    // ========================================================================

    /// Get the colour at the given coordinates.
    ///
    /// Returns `None` if the coordinates are out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Argb> {
        self.pixels.get_pixel_checked(x, y).map(|p| Argb::from(*p))
    }

    /// Get the colour at in-bounds coordinates.
    #[inline]
    pub(crate) fn pixel(&self, x: u32, y: u32) -> Argb {
        Argb::from(*self.pixels.get_pixel(x, y))
    }

    /// Set the colour at the given coordinates.
    ///
    /// Does nothing if the coordinates are out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Argb) {
        if x >= self.width() || y >= self.height() {
            return;
        }
        self.touch();
        self.pixels.put_pixel(x, y, color.into());
    }

    /// Fill the whole buffer with one colour.
    pub fn fill(&mut self, color: Argb) {
        self.touch();
        let px: Rgba<u8> = color.into();
        for p in self.pixels.pixels_mut() {
            *p = px;
        }
    }

    /// Fill a rectangle, clipped to the buffer.
    pub fn fill_rect(&mut self, rect: PixelRect, color: Argb, mode: ImageBlendMode) {
        let Some(clip) = rect.intersect(&self.bounds()) else {
            return;
        };
        self.touch();
        for y in clip.y..clip.bottom() {
            for x in clip.x..clip.right() {
                let (x, y) = (x as u32, y as u32);
                let dst = *self.pixels.get_pixel(x, y);
                self.pixels
                    .put_pixel(x, y, blend_pixels(dst, color.into(), mode));
            }
        }
    }

    /// Composite one colour onto the pixel at in-bounds coordinates.
    #[inline]
    pub(crate) fn blend_pixel(&mut self, x: u32, y: u32, color: Argb, mode: ImageBlendMode) {
        let dst = *self.pixels.get_pixel(x, y);
        self.pixels
            .put_pixel(x, y, blend_pixels(dst, color.into(), mode));
    }

    /// Draw another buffer onto this one at (x, y), clipped to the bounds.
    pub fn draw(&mut self, other: &PixelBuffer, x: i64, y: i64, mode: ImageBlendMode) {
        let target = PixelRect::new(x, y, other.width(), other.height());
        let Some(clip) = target.intersect(&self.bounds()) else {
            return;
        };
        self.touch();
        for dy in clip.y..clip.bottom() {
            for dx in clip.x..clip.right() {
                let src = *other.pixels.get_pixel((dx - x) as u32, (dy - y) as u32);
                let (dx, dy) = (dx as u32, dy as u32);
                let dst = *self.pixels.get_pixel(dx, dy);
                self.pixels.put_pixel(dx, dy, blend_pixels(dst, src, mode));
            }
        }
    }

    /// Raw RGBA bytes, row-major.
    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Mutable raw RGBA bytes, row-major.
    #[inline]
    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        self.touch();
        &mut self.pixels
    }

    /// Borrow the underlying RGBA image.
    #[inline]
    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.pixels
    }

    // ========================================================================
    // GEOMETRIC TRANSFORMS
    // ========================================================================

    /// Resize to exact dimensions.
    #[must_use]
    pub fn resize(&self, width: u32, height: u32, filter: ResizeFilter) -> Self {
        let resized =
            image::imageops::resize(&self.pixels, width, height, filter.to_image_filter());
        Self::from_rgba_image(resized, self.has_alpha)
    }

    /// Crop a region, clamped to the buffer bounds.
    #[must_use]
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width());
        let y = y.min(self.height());
        let width = width.min(self.width() - x);
        let height = height.min(self.height() - y);
        let view = image::imageops::crop_imm(&self.pixels, x, y, width, height).to_image();
        Self::from_rgba_image(view, self.has_alpha)
    }

    /// Mirror along the vertical axis.
    #[must_use]
    pub fn flip_horizontal(&self) -> Self {
        Self::from_rgba_image(image::imageops::flip_horizontal(&self.pixels), self.has_alpha)
    }

    /// Mirror along the horizontal axis.
    #[must_use]
    pub fn flip_vertical(&self) -> Self {
        Self::from_rgba_image(image::imageops::flip_vertical(&self.pixels), self.has_alpha)
    }

    // ========================================================================
    // EXPORT
    // ========================================================================

    /// Convert to a `DynamicImage`: RGB8 when opaque, RGBA8 otherwise.
    pub fn into_dynamic_image(self) -> DynamicImage {
        let rgba = DynamicImage::ImageRgba8(self.pixels);
        if self.has_alpha {
            rgba
        } else {
            DynamicImage::ImageRgb8(rgba.to_rgb8())
        }
    }

    /// Consume the buffer and return the RGBA image.
    #[inline]
    pub fn into_rgba_image(self) -> RgbaImage {
        self.pixels
    }

    /// Save to a file; the format follows the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> FinishResult<()> {
        self.clone()
            .into_dynamic_image()
            .save(path.as_ref())
            .map_err(|e| FinishError::ImageSave(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Encode as PNG.
    pub fn to_png(&self) -> FinishResult<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.clone()
            .into_dynamic_image()
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| FinishError::ImageSave(format!("failed to encode PNG: {}", e)))?;
        Ok(buffer.into_inner())
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Content is about to change: give the buffer a new identity.
    #[inline]
    fn touch(&mut self) {
        self.id = ImageId::next();
    }
}

impl Clone for PixelBuffer {
    fn clone(&self) -> Self {
        Self::from_rgba_image(self.pixels.clone(), self.has_alpha)
    }
}

impl PartialEq for PixelBuffer {
    /// Buffers compare equal when their pixels and transparency flag match;
    /// identity is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.has_alpha == other.has_alpha && self.pixels == other.pixels
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("has_alpha", &self.has_alpha)
            .field("id", &self.id.0)
            .finish()
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Blend two straight-alpha pixels according to the blend mode.
pub(crate) fn blend_pixels(dst: Rgba<u8>, src: Rgba<u8>, mode: ImageBlendMode) -> Rgba<u8> {
    let [sr, sg, sb, sa] = src.0;
    let [dr, dg, db, da] = dst.0;

    match mode {
        ImageBlendMode::Replace => src,
        ImageBlendMode::Normal => {
            if sa == 0xFF {
                return src;
            }
            if sa == 0 {
                return dst;
            }

            let src_a = sa as f32 / 255.0;
            let dst_a = da as f32 / 255.0;
            let out_a = src_a + dst_a * (1.0 - src_a);
            if out_a <= 0.0 {
                return Rgba([0, 0, 0, 0]);
            }

            let blend = |s: u8, d: u8| -> u8 {
                let v = (s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a;
                v.round().clamp(0.0, 255.0) as u8
            };

            Rgba([
                blend(sr, dr),
                blend(sg, dg),
                blend(sb, db),
                (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_transparent() {
        let buf = PixelBuffer::new(4, 3);
        assert_eq!(buf.dimensions(), (4, 3));
        assert!(buf.has_alpha());
        assert_eq!(buf.get_pixel(0, 0), Some(Argb::TRANSPARENT));
        assert_eq!(buf.get_pixel(4, 0), None);
    }

    #[test]
    fn test_from_color_opacity_flag() {
        let opaque = PixelBuffer::from_color(2, 2, Argb::rgb(10, 20, 30));
        assert!(!opaque.has_alpha());

        let translucent = PixelBuffer::from_color(2, 2, Argb::new(0x80, 10, 20, 30));
        assert!(translucent.has_alpha());
    }

    #[test]
    fn test_clone_gets_new_identity() {
        let a = PixelBuffer::new(2, 2);
        let b = a.clone();
        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn test_mutation_changes_identity() {
        let mut buf = PixelBuffer::new(2, 2);
        let before = buf.id();
        buf.set_pixel(1, 1, Argb::WHITE);
        assert_ne!(before, buf.id());
        assert_eq!(buf.get_pixel(1, 1), Some(Argb::WHITE));
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut buf = PixelBuffer::new(4, 4);
        buf.fill_rect(PixelRect::new(-2, -2, 4, 4), Argb::WHITE, ImageBlendMode::Replace);
        assert_eq!(buf.get_pixel(0, 0), Some(Argb::WHITE));
        assert_eq!(buf.get_pixel(1, 1), Some(Argb::WHITE));
        assert_eq!(buf.get_pixel(2, 2), Some(Argb::TRANSPARENT));
    }

    #[test]
    fn test_draw_source_over() {
        let mut base = PixelBuffer::from_color(4, 4, Argb::rgb(0, 0, 255));
        let mut overlay = PixelBuffer::new(2, 2);
        overlay.set_pixel(0, 0, Argb::rgb(255, 0, 0));

        base.draw(&overlay, 1, 1, ImageBlendMode::Normal);
        assert_eq!(base.get_pixel(1, 1), Some(Argb::rgb(255, 0, 0)));
        // Transparent overlay pixels leave the destination alone
        assert_eq!(base.get_pixel(2, 2), Some(Argb::rgb(0, 0, 255)));
    }

    #[test]
    fn test_blend_half_alpha() {
        let out = blend_pixels(
            Rgba([0, 0, 0, 255]),
            Rgba([255, 255, 255, 128]),
            ImageBlendMode::Normal,
        );
        assert_eq!(out.0[3], 255);
        assert!((out.0[0] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_flip_and_crop() {
        let mut buf = PixelBuffer::new(3, 2);
        buf.set_pixel(0, 0, Argb::WHITE);

        let h = buf.flip_horizontal();
        assert_eq!(h.get_pixel(2, 0), Some(Argb::WHITE));
        let v = buf.flip_vertical();
        assert_eq!(v.get_pixel(0, 1), Some(Argb::WHITE));

        let c = buf.crop(1, 0, 10, 10);
        assert_eq!(c.dimensions(), (2, 2));
    }

    #[test]
    fn test_resize_keeps_flag() {
        let buf = PixelBuffer::from_color(8, 8, Argb::rgb(1, 2, 3));
        let small = buf.resize(4, 2, ResizeFilter::CatmullRom);
        assert_eq!(small.dimensions(), (4, 2));
        assert!(!small.has_alpha());
    }

    #[test]
    fn test_png_roundtrip_keeps_opacity() {
        let buf = PixelBuffer::from_color(5, 5, Argb::rgb(200, 100, 50));
        let png = buf.to_png().unwrap();
        let decoded = PixelBuffer::from_bytes(&png).unwrap();
        assert!(!decoded.has_alpha());
        assert_eq!(decoded.get_pixel(2, 2), Some(Argb::rgb(200, 100, 50)));
    }

    #[test]
    fn test_from_rgba_invalid_size() {
        let data = vec![255, 0, 0, 255];
        assert!(PixelBuffer::from_rgba(&data, 2, 2).is_err());
    }

    #[test]
    fn test_from_rgb_is_opaque() {
        let data = [255, 0, 0, 0, 255, 0, 0, 0, 255, 10, 20, 30];
        let buf = PixelBuffer::from_rgb(&data, 2, 2).unwrap();
        assert!(!buf.has_alpha());
        assert_eq!(buf.get_pixel(0, 0), Some(Argb::rgb(255, 0, 0)));
        assert_eq!(buf.get_pixel(1, 0), Some(Argb::rgb(0, 255, 0)));
        assert_eq!(buf.get_pixel(0, 1), Some(Argb::rgb(0, 0, 255)));
        assert_eq!(buf.get_pixel(1, 1), Some(Argb::rgb(10, 20, 30)));

        assert!(PixelBuffer::from_rgb(&data[..9], 2, 2).is_err());
    }

    #[test]
    fn test_bleed_dimensions() {
        let buf = PixelBuffer::new(10, 20);
        assert_eq!(buf.bleed_dimensions(0).unwrap(), (10, 20));
        assert_eq!(buf.bleed_dimensions(5).unwrap(), (20, 30));
        assert!(matches!(
            buf.bleed_dimensions(u32::MAX / 2 + 1),
            Err(FinishError::InvalidMargin(_))
        ));
        assert!(buf.bleed_dimensions(u32::MAX / 2 - 5).is_err());
    }

    #[test]
    fn test_require_non_empty() {
        assert!(PixelBuffer::new(0, 5).require_non_empty().is_err());
        assert!(PixelBuffer::new(1, 1).require_non_empty().is_ok());
    }
}
