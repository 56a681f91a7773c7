// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel values, color formats, opacity and blend modes.
//!
//! Buffers always hold [`Color32`] values. A [`ColorFormat`] says what the
//! panel expects: it drives memory budgets (bytes per pixel) and whether a
//! buffer carries meaningful alpha.

/// Opacity in `0..=255`.
pub type Opa = u8;

/// Fully transparent.
pub const OPA_TRANSP: Opa = 0;
/// Lowest opacity that is still drawn; anything below is skipped.
pub const OPA_MIN: Opa = 2;
/// Half opacity.
pub const OPA_50: Opa = 128;
/// Fully opaque.
pub const OPA_COVER: Opa = 255;

/// A straight-alpha RGBA pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color32 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color32 {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::opaque(0xff, 0xff, 0xff);

    /// Creates a pixel from its channels.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque pixel.
    #[inline]
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, OPA_COVER)
    }

    /// Returns the same color with alpha scaled by `opa`.
    #[inline]
    #[must_use]
    pub const fn with_opa(self, opa: Opa) -> Self {
        Self {
            a: mul_opa(self.a, opa),
            ..self
        }
    }
}

/// Multiplies two opacities, rounding to nearest.
#[inline]
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "the product of two u8 values divided by 255 fits in u8"
)]
pub const fn mul_opa(a: Opa, b: Opa) -> Opa {
    ((a as u16 * b as u16 + 127) / 255) as u8
}

/// The pixel format a display or layer is declared with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    /// 16-bit RGB.
    Rgb565,
    /// 24-bit RGB.
    Rgb888,
    /// 32-bit RGB with an unused byte.
    #[default]
    Xrgb8888,
    /// 32-bit RGB with alpha.
    Argb8888,
}

impl ColorFormat {
    /// Bytes a pixel of this format occupies in a panel buffer.
    #[inline]
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgb565 => 2,
            Self::Rgb888 => 3,
            Self::Xrgb8888 | Self::Argb8888 => 4,
        }
    }

    /// Whether pixels of this format carry alpha.
    #[inline]
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Argb8888)
    }
}

/// How a composited layer combines with what is below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source over destination.
    #[default]
    Normal,
    /// Channels are added and saturated.
    Additive,
    /// Source channels are subtracted from the destination.
    Subtractive,
    /// Channels are multiplied.
    Multiply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_multiplication_rounds() {
        assert_eq!(mul_opa(OPA_COVER, OPA_COVER), OPA_COVER);
        assert_eq!(mul_opa(OPA_COVER, OPA_50), OPA_50);
        assert_eq!(mul_opa(OPA_50, OPA_50), 64);
        assert_eq!(mul_opa(OPA_TRANSP, OPA_COVER), OPA_TRANSP);
    }

    #[test]
    fn only_argb_has_alpha() {
        assert!(ColorFormat::Argb8888.has_alpha());
        assert!(!ColorFormat::Xrgb8888.has_alpha());
        assert_eq!(ColorFormat::Rgb565.bytes_per_pixel(), 2);
    }
}
