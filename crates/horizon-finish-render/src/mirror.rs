//! Mirror tiling for artwork without a flat border.
//!
//! Textured edges are extended by reflecting the source across each of its
//! four edges (and diagonally across the corners), so the synthesized bleed
//! continues the artwork without a visible seam:
//!
//! ```text
//!   +----+--------+----+
//!   | NW |   N    | NE |     N/S: flipped vertically
//!   +----+--------+----+     W/E: flipped horizontally
//!   | W  | centre | E  |     corners: flipped both ways
//!   +----+--------+----+
//!   | SW |   S    | SE |
//!   +----+--------+----+
//! ```
//!
//! When the margin is wider or taller than the source a single reflection
//! is not enough; the source is then tiled as a grid of alternately flipped
//! copies centred on the original, clipped to the canvas.

use std::borrow::Cow;

use image::Rgba;
use rayon::prelude::*;
use tracing::debug;

use crate::error::FinishResult;
use crate::logging::{PerfSpan, span_names, targets};
use crate::pixel_buffer::{ImageBlendMode, PixelBuffer, ResizeFilter, blend_pixels};
use crate::types::PixelRect;

/// One placement of (part of) the source on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tile {
    /// Destination rectangle, before clipping.
    dest: PixelRect,
    /// Top-left of the source region.
    src_x: u32,
    src_y: u32,
    flip_h: bool,
    flip_v: bool,
}

impl Tile {
    #[inline]
    fn source_x(&self, x: i64) -> u32 {
        let k = (x - self.dest.x) as u32;
        self.src_x + if self.flip_h { self.dest.width - 1 - k } else { k }
    }

    #[inline]
    fn source_y(&self, y: i64) -> u32 {
        let k = (y - self.dest.y) as u32;
        self.src_y + if self.flip_v { self.dest.height - 1 - k } else { k }
    }
}

/// Extends artwork outward by mirroring it.
#[derive(Debug, Clone, Copy)]
pub struct MirrorTiler {
    template_filter: ResizeFilter,
}

impl Default for MirrorTiler {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorTiler {
    pub fn new() -> Self {
        Self {
            template_filter: ResizeFilter::CatmullRom,
        }
    }

    /// Set the filter used to fit a template to the primary image's size.
    pub fn with_template_filter(mut self, filter: ResizeFilter) -> Self {
        self.template_filter = filter;
        self
    }

    /// Build a `(w + 2m) x (h + 2m)` canvas with the image centred and the
    /// margin mirrored from it.
    ///
    /// A template, if given, is mirrored into the margin first and the
    /// image drawn over it, so translucent edge art picks up the template
    /// underneath.
    ///
    /// # Errors
    ///
    /// Returns [`FinishError::InvalidMargin`](crate::FinishError::InvalidMargin)
    /// if the padded canvas is too large.
    pub fn extend(
        &self,
        image: &PixelBuffer,
        template: Option<&PixelBuffer>,
        margin: u32,
    ) -> FinishResult<PixelBuffer> {
        let (w, h) = image.dimensions();
        let (cw, ch) = image.bleed_dimensions(margin)?;
        let mut canvas = PixelBuffer::new(cw, ch);

        let mut has_alpha = image.has_alpha();
        if let Some(template) = template {
            has_alpha |= template.has_alpha();
            let fitted = if template.dimensions() == (w, h) {
                Cow::Borrowed(template)
            } else {
                debug!(
                    target: targets::MIRROR,
                    from_width = template.width(),
                    from_height = template.height(),
                    to_width = w,
                    to_height = h,
                    "resampling template"
                );
                Cow::Owned(template.resize(w, h, self.template_filter))
            };
            self.tile_into(&mut canvas, &fitted, margin, false);
        }

        self.tile_into(&mut canvas, image, margin, true);
        canvas.set_has_alpha(has_alpha);
        Ok(canvas)
    }

    /// Mirror `image` into a caller-owned canvas.
    ///
    /// The image's top-left lands at `(margin, margin)`. Tiles are composited
    /// source-over and clipped to the canvas. With `blit_center` false the
    /// image itself is not drawn, only its reflections.
    pub fn tile_into(
        &self,
        canvas: &mut PixelBuffer,
        image: &PixelBuffer,
        margin: u32,
        blit_center: bool,
    ) {
        if image.is_empty() || canvas.is_empty() {
            return;
        }
        let _span = PerfSpan::new(span_names::MIRROR);

        let (w, h) = image.dimensions();
        let tiles = if margin <= w && margin <= h {
            reflection_plan(w, h, margin, blit_center)
        } else {
            grid_plan(w, h, margin, blit_center)
        };
        debug!(
            target: targets::MIRROR,
            width = w,
            height = h,
            margin,
            tiles = tiles.len(),
            "tiling"
        );

        let bounds = canvas.bounds();
        let clipped: Vec<(Tile, PixelRect)> = tiles
            .into_iter()
            .filter_map(|tile| tile.dest.intersect(&bounds).map(|clip| (tile, clip)))
            .collect();

        let row_tiles = tiles_by_row(&clipped, canvas.height());

        let src = image.as_rgba_image();
        let row_bytes = canvas.width() as usize * 4;
        canvas
            .as_raw_mut()
            .par_chunks_mut(row_bytes)
            .zip(row_tiles.par_iter())
            .enumerate()
            .for_each(|(y, (row, indices))| {
                let y = y as i64;
                for &i in indices {
                    let (tile, clip) = &clipped[i];
                    let sy = tile.source_y(y);
                    for x in clip.x..clip.right() {
                        let s = *src.get_pixel(tile.source_x(x), sy);
                        let i = x as usize * 4;
                        let d = Rgba([row[i], row[i + 1], row[i + 2], row[i + 3]]);
                        row[i..i + 4].copy_from_slice(&blend_pixels(d, s, ImageBlendMode::Normal).0);
                    }
                }
            });
    }
}

/// Indices of the clipped tiles crossing each canvas row, in plan order.
fn tiles_by_row(clipped: &[(Tile, PixelRect)], height: u32) -> Vec<Vec<usize>> {
    let mut rows = vec![Vec::new(); height as usize];
    for (i, (_, clip)) in clipped.iter().enumerate() {
        for y in clip.y.max(0)..clip.bottom().min(height as i64) {
            rows[y as usize].push(i);
        }
    }
    rows
}

/// Eight single reflections plus the centre, for margins no larger than
/// the image.
fn reflection_plan(w: u32, h: u32, m: u32, blit_center: bool) -> Vec<Tile> {
    let mi = m as i64;
    let right = mi + w as i64;
    let bottom = mi + h as i64;
    let (far_x, far_y) = (w - m, h - m);

    let tile = |x: i64, y: i64, tw: u32, th: u32, src_x: u32, src_y: u32, flip_h: bool, flip_v: bool| Tile {
        dest: PixelRect::new(x, y, tw, th),
        src_x,
        src_y,
        flip_h,
        flip_v,
    };

    let mut tiles = Vec::with_capacity(9);
    if m > 0 {
        tiles.extend([
            tile(0, 0, m, m, 0, 0, true, true),
            tile(mi, 0, w, m, 0, 0, false, true),
            tile(right, 0, m, m, far_x, 0, true, true),
            tile(0, mi, m, h, 0, 0, true, false),
            tile(right, mi, m, h, far_x, 0, true, false),
            tile(0, bottom, m, m, 0, far_y, true, true),
            tile(mi, bottom, w, m, 0, far_y, false, true),
            tile(right, bottom, m, m, far_x, far_y, true, true),
        ]);
    }
    if blit_center {
        tiles.push(tile(mi, mi, w, h, 0, 0, false, false));
    }
    tiles
}

/// A `(2xn + 1) x (2yn + 1)` grid of whole copies, flipped on odd offsets
/// from the centre.
fn grid_plan(w: u32, h: u32, m: u32, blit_center: bool) -> Vec<Tile> {
    let xn = (m / w + 1) as i64;
    let yn = (m / h + 1) as i64;
    let mut tiles = Vec::with_capacity(((2 * xn + 1) * (2 * yn + 1)) as usize);

    for row in -yn..=yn {
        for col in -xn..=xn {
            if row == 0 && col == 0 && !blit_center {
                continue;
            }
            tiles.push(Tile {
                dest: PixelRect::new(
                    m as i64 + col * w as i64,
                    m as i64 + row * h as i64,
                    w,
                    h,
                ),
                src_x: 0,
                src_y: 0,
                flip_h: col % 2 != 0,
                flip_v: row % 2 != 0,
            });
        }
    }
    tiles
}
