//! Basic pixel-space types: packed colours, integer rectangles and corners.

use image::Rgba;

/// A packed 32-bit colour sample in `0xAARRGGBB` order.
///
/// Channels are straight (not premultiplied) 8-bit values, the same layout
/// the sheet renderer produces for its finished card faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Argb(pub u32);

impl Argb {
    /// Create a colour from 8-bit channels.
    #[inline]
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Create an opaque colour from 8-bit RGB channels.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(0xFF, r, g, b)
    }

    /// Alpha channel.
    #[inline]
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red channel.
    #[inline]
    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel.
    #[inline]
    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel.
    #[inline]
    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Check whether the colour is fully opaque.
    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.alpha() == 0xFF
    }

    /// Return the same colour with a different alpha.
    #[inline]
    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self((self.0 & 0x00FF_FFFF) | ((alpha as u32) << 24))
    }

    /// Return the same colour forced to full opacity.
    #[inline]
    pub const fn opaque(self) -> Self {
        self.with_alpha(0xFF)
    }

    pub const TRANSPARENT: Self = Self(0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(0xFF, 0xFF, 0xFF);
}

impl From<Rgba<u8>> for Argb {
    #[inline]
    fn from(p: Rgba<u8>) -> Self {
        let [r, g, b, a] = p.0;
        Self::new(a, r, g, b)
    }
}

impl From<Argb> for Rgba<u8> {
    #[inline]
    fn from(c: Argb) -> Self {
        Rgba([c.red(), c.green(), c.blue(), c.alpha()])
    }
}

impl From<Argb> for [u8; 4] {
    #[inline]
    fn from(c: Argb) -> Self {
        [c.red(), c.green(), c.blue(), c.alpha()]
    }
}

/// An integer rectangle in pixel coordinates.
///
/// The origin may be negative; drawing operations clip to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> i64 {
        self.x + self.width as i64
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> i64 {
        self.y + self.height as i64
    }

    /// Check if the rectangle covers no pixels.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersect with another rectangle.
    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

/// One of the four corners of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    /// All corners, clockwise from the top left.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Index into per-corner arrays (clockwise from the top left).
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomRight => 2,
            Corner::BottomLeft => 3,
        }
    }

    /// True for the two corners on the right edge.
    #[inline]
    pub const fn is_right(self) -> bool {
        matches!(self, Corner::TopRight | Corner::BottomRight)
    }

    /// True for the two corners on the bottom edge.
    #[inline]
    pub const fn is_bottom(self) -> bool {
        matches!(self, Corner::BottomRight | Corner::BottomLeft)
    }
}
