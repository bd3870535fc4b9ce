//! Converts images into the tile-based 2bpp graphics format of the DMG
//! Game Boy: 8x8 tiles, four shades, plus one-byte-per-tile tile-maps.

pub mod artifact;
pub mod color;
pub mod config;
pub mod error;
pub mod imgconv;
pub mod palette;
pub mod rng;
pub mod tile;
pub mod tilemap;
pub mod tileset;

pub use config::Config;
pub use error::{ConversionError, Result};
pub use imgconv::{ComposeOptions, Converter, OutputOptions, OutputSummary, PaletteSource};
pub use palette::{Palette, PaletteColor};
pub use tile::Tile;
pub use tilemap::{TileMap, TileMapResolver};
pub use tileset::{BuildMode, TileSet, TileSetBuilder};
