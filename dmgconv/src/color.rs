//! Color types and utilities for tile extraction.
//!
//! This module contains color-related functionality including:
//! - packing `image` pixels into raw 32-bit ARGB values and back
//! - perceptual luminance and RGB distance
//! - the two classification strategies mapping a pixel to a 2-bit shade

use std::rc::Rc;

use image::Rgba;

use crate::error::{ConversionError, Result};
use crate::palette::Palette;

/// Number of shades a 2bpp pixel can address
pub const SHADES: usize = 4;

/// Luminance weights for red, green and blue
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Pack an RGBA pixel into a raw `0xAARRGGBB` value
pub fn to_argb(pixel: Rgba<u8>) -> u32 {
    let [r, g, b, a] = pixel.0;
    u32::from_be_bytes([a, r, g, b])
}

/// Unpack a raw `0xAARRGGBB` value into an RGBA pixel
pub fn from_argb(argb: u32) -> Rgba<u8> {
    let [a, r, g, b] = argb.to_be_bytes();
    Rgba([r, g, b, a])
}

/// The RGB part of a raw ARGB value
pub fn rgb_of(argb: u32) -> [u8; 3] {
    let [_, r, g, b] = argb.to_be_bytes();
    [r, g, b]
}

/// Perceptual luminance of an RGB triple, in `0.0..=255.0`
pub fn luminance([r, g, b]: [u8; 3]) -> f32 {
    LUMA_WEIGHTS[0] * r as f32 + LUMA_WEIGHTS[1] * g as f32 + LUMA_WEIGHTS[2] * b as f32
}

/// Euclidean distance between two colors in RGB space
pub fn rgb_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let dr = a[0] as f64 - b[0] as f64;
    let dg = a[1] as f64 - b[1] as f64;
    let db = a[2] as f64 - b[2] as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Strategy used to turn a pixel into a 2-bit shade index
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Classification {
    /// Alpha weighted luminance, bucketed into four shades
    #[default]
    Grayscale,
    /// Exact lookup in a palette; unmatched pixels are an error
    PixelPerfect(Rc<Palette>),
}

impl Classification {
    /// Classify a raw ARGB pixel into a shade index in `0..4`
    pub fn classify(&self, pixel: u32) -> Result<u8> {
        match self {
            Classification::Grayscale => Ok(grayscale_shade(pixel)),
            Classification::PixelPerfect(palette) => palette
                .position_of(pixel)
                .map(|i| (i % SHADES) as u8)
                .ok_or(ConversionError::NoPaletteMatch { pixel }),
        }
    }
}

/// Bucket the alpha weighted luminance of a pixel into one of four shades
pub fn grayscale_shade(pixel: u32) -> u8 {
    let [a, r, g, b] = pixel.to_be_bytes();
    let gray = luminance([r, g, b]) * (a as f32 / 255.0);
    // Truncation keeps 255 in the top bucket: 4 * 255 / 256 < 4
    ((SHADES as f32 * gray) / 256.0) as u8
}
