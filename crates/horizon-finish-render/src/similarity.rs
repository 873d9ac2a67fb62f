//! Colour similarity tests used when sampling card borders.
//!
//! Scanned art and lossy exports rarely produce a perfectly flat border,
//! so two samples are treated as "the same colour" when their squared
//! channel distance is within [`SIMILARITY_THRESHOLD`] (about 6 units on a
//! single channel).

use crate::types::Argb;

/// Maximum squared channel distance for two colours to be similar.
pub const SIMILARITY_THRESHOLD: i32 = 36;

/// Which channels take part in a similarity test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColourMatch {
    /// Compare red, green and blue only.
    #[default]
    Rgb,
    /// Compare alpha as well as red, green and blue.
    Argb,
}

impl ColourMatch {
    /// The metric appropriate for a source with or without transparency.
    #[inline]
    pub fn for_alpha(has_alpha: bool) -> Self {
        if has_alpha { Self::Argb } else { Self::Rgb }
    }

    /// Test two colours with this metric.
    #[inline]
    pub fn matches(self, a: Argb, b: Argb) -> bool {
        match self {
            Self::Rgb => similar(a, b),
            Self::Argb => similar_with_alpha(a, b),
        }
    }
}

#[inline]
fn channel_delta(a: u8, b: u8) -> i32 {
    let d = a as i32 - b as i32;
    d * d
}

/// Squared RGB distance between two colours.
#[inline]
pub fn rgb_distance_sq(a: Argb, b: Argb) -> i32 {
    channel_delta(a.red(), b.red())
        + channel_delta(a.green(), b.green())
        + channel_delta(a.blue(), b.blue())
}

/// True if two colours are within the RGB similarity threshold.
#[inline]
pub fn similar(a: Argb, b: Argb) -> bool {
    rgb_distance_sq(a, b) <= SIMILARITY_THRESHOLD
}

/// True if two colours are within the threshold with alpha included.
#[inline]
pub fn similar_with_alpha(a: Argb, b: Argb) -> bool {
    rgb_distance_sq(a, b) + channel_delta(a.alpha(), b.alpha()) <= SIMILARITY_THRESHOLD
}
