//! Error type shared by every stage of the conversion.

use std::io;

use thiserror::Error;

/// Errors that can occur during tile conversion
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Image dimensions {width}x{height} are not multiples of the 8x8 tile size")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Input images cover {pixels} pixels but the tileset only holds {capacity}")]
    AreaExceeded { pixels: u64, capacity: u64 },

    #[error("Tileset holds {tiles} tiles but the maximum is {capacity}")]
    CapacityExceeded { tiles: usize, capacity: usize },

    #[error("Pixel {pixel:08x} does not match any entry of the color palette")]
    NoPaletteMatch { pixel: u32 },

    #[error("Invalid color value for {0:?}")]
    InvalidPaletteEntry(String),

    #[error("Color palette is empty")]
    EmptyPalette,

    #[error("No tile found for the layout region at {x},{y}")]
    NoMatchingTile { x: u32, y: u32 },

    #[error("Gave up generating a distinct fill tile after {attempts} attempts")]
    FillExhausted { attempts: usize },

    #[error("Failed to read image: {0}")]
    ImageReadError(#[from] image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
