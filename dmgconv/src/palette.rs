//! Color palettes: parsing, extraction from images, brightness sorting and
//! nearest-color requantization.
//!
//! Palette entries are hex strings. A leading `0x` or one marker character
//! such as `#` or `$` is accepted, case does not matter, and only the
//! trailing six digits are used as the RGB value of the entry. Longer
//! entries keep their full text for exact pixel matching, so an entry
//! extracted from an image (`aarrggbb`) matches that pixel including its
//! alpha.

use image::RgbaImage;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::color::{luminance, rgb_distance, rgb_of, to_argb, SHADES};
use crate::error::{ConversionError, Result};

/// Number of digits of an RGB hex value
const RGB_DIGITS: usize = 6;

/// A single palette entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteColor {
    hex: String,
    rgb: [u8; 3],
}

impl Serialize for PaletteColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.hex.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PaletteColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entry = String::deserialize(deserializer)?;
        PaletteColor::parse(&entry).map_err(serde::de::Error::custom)
    }
}

impl PaletteColor {
    /// Parse a hex color entry such as `#9BBC0F`, `$306230`, `0x8bac0f` or
    /// `ff0f380f`
    pub fn parse(entry: &str) -> Result<Self> {
        let trimmed = entry.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or_else(|| strip_marker(trimmed));

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConversionError::InvalidPaletteEntry(entry.to_string()));
        }

        let hex = digits.to_ascii_lowercase();
        let tail = &hex[hex.len().saturating_sub(RGB_DIGITS)..];
        let padded = format!("{:0>width$}", tail, width = RGB_DIGITS);
        let bytes = hex::decode(padded)
            .map_err(|_| ConversionError::InvalidPaletteEntry(entry.to_string()))?;

        Ok(PaletteColor {
            hex,
            rgb: [bytes[0], bytes[1], bytes[2]],
        })
    }

    /// Entry for a raw ARGB pixel, keeping the alpha digits
    pub fn from_argb(argb: u32) -> Self {
        PaletteColor {
            hex: format!("{:08x}", argb),
            rgb: rgb_of(argb),
        }
    }

    /// Normalized (lowercase, marker stripped) hex text of the entry
    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn rgb(&self) -> [u8; 3] {
        self.rgb
    }

    /// Opaque ARGB value of the entry
    pub fn argb(&self) -> u32 {
        let [r, g, b] = self.rgb;
        u32::from_be_bytes([0xff, r, g, b])
    }

    pub fn luminance(&self) -> f32 {
        luminance(self.rgb)
    }

    /// Whether a raw ARGB pixel is exactly this entry
    ///
    /// The pixel's eight digit hex form, alpha included, must be a suffix of
    /// the entry. A plain RGB entry (six digits or fewer) also matches the
    /// opaque pixel of the same color. Translucent and fully transparent
    /// pixels therefore only match entries that spell out their alpha, such
    /// as those extracted from an image: `e0f8d0` does not match
    /// `0x00e0f8d0`.
    pub fn matches(&self, pixel: u32) -> bool {
        if self.hex.ends_with(&format!("{:08x}", pixel)) {
            return true;
        }
        self.hex.len() <= RGB_DIGITS && pixel >> 24 == 0xff && rgb_of(pixel) == self.rgb
    }
}

/// Drop one leading marker character such as `#`, `$` or `&`
fn strip_marker(entry: &str) -> &str {
    let mut chars = entry.chars();
    match chars.next() {
        Some(marker) if !marker.is_ascii_hexdigit() => chars.as_str(),
        _ => entry,
    }
}

/// An ordered list of palette entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    colors: Vec<PaletteColor>,
}

impl Palette {
    pub fn new(colors: Vec<PaletteColor>) -> Self {
        Palette { colors }
    }

    /// Parse a comma separated list of hex colors
    pub fn parse(list: &str) -> Result<Self> {
        let colors = list
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(PaletteColor::parse)
            .collect::<Result<Vec<_>>>()?;

        if colors.is_empty() {
            return Err(ConversionError::EmptyPalette);
        }
        Ok(Palette { colors })
    }

    /// Collect the distinct raw colors of an image, in first-seen order
    pub fn from_image(image: &RgbaImage) -> Self {
        let colors = image
            .pixels()
            .map(|p| to_argb(*p))
            .unique()
            .map(PaletteColor::from_argb)
            .collect();
        Palette { colors }
    }

    pub fn colors(&self) -> &[PaletteColor] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Keep at most the first `max` entries
    pub fn truncated(mut self, max: usize) -> Self {
        self.colors.truncate(max);
        self
    }

    /// Sort the entries by luminance
    ///
    /// The default order is brightest first, which is shade 0 on the DMG.
    /// With `reverse` set the exact reverse (darkest first) is returned.
    /// Duplicate entries are collapsed.
    pub fn sorted_by_brightness(&self, reverse: bool) -> Self {
        let mut colors: Vec<PaletteColor> = self
            .colors
            .iter()
            .unique_by(|c| c.hex.clone())
            .sorted_by(|a, b| a.luminance().total_cmp(&b.luminance()))
            .cloned()
            .collect();
        if !reverse {
            colors.reverse();
        }
        Palette { colors }
    }

    /// Index of the first of the four addressable entries matching a pixel
    pub fn position_of(&self, pixel: u32) -> Option<usize> {
        self.colors
            .iter()
            .take(SHADES)
            .position(|c| c.matches(pixel))
    }

    /// Entry closest to an RGB color; ties go to the earliest entry
    pub fn nearest(&self, rgb: [u8; 3]) -> Option<&PaletteColor> {
        let mut best: Option<(&PaletteColor, f64)> = None;
        for color in self.colors.iter() {
            let distance = rgb_distance(rgb, color.rgb);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((color, distance));
            }
        }
        best.map(|(color, _)| color)
    }

    /// Replace every pixel with its nearest palette entry, alpha ignored
    pub fn requantize(&self, image: &RgbaImage) -> Result<RgbaImage> {
        if self.colors.is_empty() {
            return Err(ConversionError::EmptyPalette);
        }

        let mut out = RgbaImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            let [r, g, b, _] = pixel.0;
            if let Some(color) = self.nearest([r, g, b]) {
                let [nr, ng, nb] = color.rgb;
                out.put_pixel(x, y, image::Rgba([nr, ng, nb, 0xff]));
            }
        }
        Ok(out)
    }
}

/// Hex strings of the distinct raw colors in an image
pub fn extract_palette(image: &RgbaImage) -> Vec<String> {
    Palette::from_image(image)
        .colors
        .into_iter()
        .map(|c| c.hex)
        .collect()
}
