//! Configuration for the tile conversion process

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tile::TILE_PIXELS;

/// Configuration for the tile conversion process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Width of the tileset grid in tiles
    pub tileset_width_in_tiles: u32,
    /// Height of the tileset grid in tiles
    pub tileset_height_in_tiles: u32,
    /// Number of tiles reserved for sprites at the start of the tileset
    pub sprite_region_size: usize,
    /// Directory receiving the composed tileset image
    pub output_dir: PathBuf,
    /// File name of the composed tileset image
    pub tileset_file_name: String,
    /// Extension given to tile-map files
    pub tilemap_extension: String,
    /// Attempts allowed to generate one distinct fill tile
    pub fill_max_attempts: usize,
    /// Seed for fill tiles, taken from the clock when unset
    pub fill_seed: Option<u64>,
    /// Output JSON manifest path (optional)
    pub output_json: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tileset_width_in_tiles: 16,
            tileset_height_in_tiles: 24,
            sprite_region_size: 128,
            output_dir: PathBuf::from("."),
            tileset_file_name: "tileset.png".to_string(),
            tilemap_extension: "tlm".to_string(),
            fill_max_attempts: 10_000,
            fill_seed: None,
            output_json: None,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Get the number of tiles the tileset grid can hold
    pub fn capacity(&self) -> usize {
        (self.tileset_width_in_tiles as usize).saturating_mul(self.tileset_height_in_tiles as usize)
    }

    /// Get the number of pixels the tileset grid can hold
    pub fn capacity_pixels(&self) -> u64 {
        (self.capacity() as u64).saturating_mul(TILE_PIXELS as u64)
    }

    /// Where the composed tileset image is written
    pub fn tileset_path(&self) -> PathBuf {
        self.output_dir.join(&self.tileset_file_name)
    }

    /// Tile-map file written for a layout image: same place, new extension
    pub fn tilemap_path(&self, layout: &Path) -> PathBuf {
        layout.with_extension(&self.tilemap_extension)
    }
}
