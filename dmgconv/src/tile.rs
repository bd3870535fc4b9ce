//! The 8x8 tile and its 2bpp encoding.

use std::cell::OnceCell;
use std::hash::{Hash, Hasher};

use image::{GenericImageView, Rgba, RgbaImage};

use crate::color::{from_argb, to_argb, Classification};
use crate::error::Result;

/// Width and height of a tile in pixels
pub const TILE_DIMENSION: u32 = 8;
/// Number of pixels in a single tile
pub const TILE_PIXELS: usize = (TILE_DIMENSION * TILE_DIMENSION) as usize;
/// Size of an encoded tile: two bit planes per row
pub const TILE_BYTES: usize = 2 * TILE_DIMENSION as usize;

/// Check that both dimensions are multiples of the tile size
pub fn is_tile_aligned(width: u32, height: u32) -> bool {
    width % TILE_DIMENSION == 0 && height % TILE_DIMENSION == 0
}

/// A single 8x8 tile
///
/// Equality and hashing only look at the raw ARGB pixels; the assigned
/// index and the classification never take part.
#[derive(Debug, Clone)]
pub struct Tile {
    pixels: [u32; TILE_PIXELS],
    classification: Classification,
    index: u8,
    encoded: OnceCell<[u8; TILE_BYTES]>,
}

impl Tile {
    /// Create a grayscale tile from row-major ARGB pixels
    pub fn new(pixels: [u32; TILE_PIXELS]) -> Self {
        Tile {
            pixels,
            classification: Classification::default(),
            index: 0,
            encoded: OnceCell::new(),
        }
    }

    /// Cut the tile whose top-left corner is at `x`,`y` out of an image
    ///
    /// The region must lie inside the image.
    pub fn from_region<I>(image: &I, x: u32, y: u32) -> Self
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        let mut pixels = [0u32; TILE_PIXELS];
        for ty in 0..TILE_DIMENSION {
            for tx in 0..TILE_DIMENSION {
                pixels[(ty * TILE_DIMENSION + tx) as usize] = to_argb(image.get_pixel(x + tx, y + ty));
            }
        }
        Tile::new(pixels)
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.set_classification(classification);
        self
    }

    /// Change the classification used by `encode`
    pub fn set_classification(&mut self, classification: Classification) {
        self.classification = classification;
        self.encoded = OnceCell::new();
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn set_index(&mut self, index: u8) {
        self.index = index;
    }

    /// Row-major raw ARGB pixels
    pub fn pixels(&self) -> &[u32; TILE_PIXELS] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y * TILE_DIMENSION + x) as usize]
    }

    /// Compare against another pixel buffer: dimensions, then every pixel
    pub fn matches<I>(&self, other: &I) -> bool
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        if other.dimensions() != (TILE_DIMENSION, TILE_DIMENSION) {
            return false;
        }
        other
            .pixels()
            .all(|(x, y, pixel)| to_argb(pixel) == self.pixel(x, y))
    }

    /// Encode the tile into the 16 byte DMG 2bpp format
    ///
    /// Each row yields two bytes: the plane holding bit 0 of every shade
    /// index, then the plane holding bit 1. The leftmost pixel is the most
    /// significant bit of both bytes. Rows go top to bottom.
    pub fn encode(&self) -> Result<[u8; TILE_BYTES]> {
        if let Some(bytes) = self.encoded.get() {
            return Ok(*bytes);
        }

        let mut bytes = [0u8; TILE_BYTES];
        for y in 0..TILE_DIMENSION as usize {
            for x in 0..TILE_DIMENSION as usize {
                let shade = self
                    .classification
                    .classify(self.pixels[y * TILE_DIMENSION as usize + x])?;
                if shade & 1 == 1 {
                    bytes[y * 2] |= 1 << (7 - x);
                }
                if shade & 2 == 2 {
                    bytes[y * 2 + 1] |= 1 << (7 - x);
                }
            }
        }

        let _ = self.encoded.set(bytes);
        Ok(bytes)
    }

    /// Render the tile back into an 8x8 image
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(TILE_DIMENSION, TILE_DIMENSION, |x, y| from_argb(self.pixel(x, y)))
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.pixels == other.pixels
    }
}

impl Eq for Tile {}

impl Hash for Tile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pixels.hash(state);
    }
}
