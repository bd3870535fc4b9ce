//! Resolving layout images into tile-maps against a finalized tileset.

use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;
use log::info;

use crate::artifact::write_file;
use crate::error::{ConversionError, Result};
use crate::tile::{is_tile_aligned, Tile, TILE_DIMENSION, TILE_PIXELS};
use crate::tileset::TileSet;

/// One tile index per 8x8 region of a layout, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    pub width_in_tiles: u32,
    pub height_in_tiles: u32,
    pub indices: Vec<u8>,
}

impl TileMap {
    pub fn bytes(&self) -> &[u8] {
        &self.indices
    }

    /// Write the raw index bytes, one per region
    pub fn write(&self, path: &Path) -> Result<()> {
        write_file(path, &self.indices)?;
        info!(
            "Wrote {}x{} tile-map to {}",
            self.width_in_tiles,
            self.height_in_tiles,
            path.display()
        );
        Ok(())
    }
}

/// Looks up layout regions in a tileset
///
/// When several tiles share the same pixels the one furthest into the
/// tileset wins. Early slots (tile 0, the sprite region) are often blank or
/// collide with background tiles by accident and must not be referenced.
pub struct TileMapResolver {
    lookup: HashMap<[u32; TILE_PIXELS], u8>,
}

impl TileMapResolver {
    pub fn new(tileset: &TileSet) -> Self {
        let mut lookup = HashMap::with_capacity(tileset.len());
        // Later duplicates overwrite earlier ones
        for tile in tileset.tiles() {
            lookup.insert(*tile.pixels(), tile.index());
        }
        TileMapResolver { lookup }
    }

    /// Index of the last tile matching the given pixels
    pub fn find(&self, tile: &Tile) -> Option<u8> {
        self.lookup.get(tile.pixels()).copied()
    }

    /// Map every 8x8 region of a layout image to a tile index
    pub fn resolve(&self, layout: &RgbaImage) -> Result<TileMap> {
        let (width, height) = layout.dimensions();
        if !is_tile_aligned(width, height) {
            return Err(ConversionError::InvalidDimensions { width, height });
        }

        let mut indices = Vec::with_capacity(((width / TILE_DIMENSION) * (height / TILE_DIMENSION)) as usize);
        for y in (0..height).step_by(TILE_DIMENSION as usize) {
            for x in (0..width).step_by(TILE_DIMENSION as usize) {
                let region = Tile::from_region(layout, x, y);
                let index = self
                    .find(&region)
                    .ok_or(ConversionError::NoMatchingTile { x, y })?;
                indices.push(index);
            }
        }

        Ok(TileMap {
            width_in_tiles: width / TILE_DIMENSION,
            height_in_tiles: height / TILE_DIMENSION,
            indices,
        })
    }
}
