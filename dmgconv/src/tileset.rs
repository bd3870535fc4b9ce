//! Building an ordered tile collection out of source images.
//!
//! A tileset is either composed from several images (sprites, background,
//! window), optionally padded with synthetic tiles, or loaded as-is from an
//! existing tileset image. In both cases the images are cut into 8x8 tiles in
//! row-major order, optionally deduplicated, and finally indexed.

use std::path::Path;

use image::{imageops, RgbaImage};
use itertools::Itertools;
use log::{debug, info, warn};

use crate::artifact::write_file;
use crate::color::Classification;
use crate::config::Config;
use crate::error::{ConversionError, Result};
use crate::palette::Palette;
use crate::rng::Rng;
use crate::tile::{is_tile_aligned, Tile, TILE_BYTES, TILE_DIMENSION, TILE_PIXELS};

/// How a tileset is assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Compose a new tileset from several images, checked against the
    /// grid capacity; `fill` pads the sprite region and the grid with
    /// random distinct tiles
    Compose { fill: bool },
    /// Read the tiles of an existing tileset image unchanged
    LoadExisting,
}

/// Cut an image into 8x8 tiles, rows top to bottom, tiles left to right
pub fn scan(image: &RgbaImage) -> Result<Vec<Tile>> {
    let (width, height) = image.dimensions();
    if !is_tile_aligned(width, height) {
        return Err(ConversionError::InvalidDimensions { width, height });
    }

    let mut tiles = Vec::with_capacity(((width / TILE_DIMENSION) * (height / TILE_DIMENSION)) as usize);
    for y in (0..height).step_by(TILE_DIMENSION as usize) {
        for x in (0..width).step_by(TILE_DIMENSION as usize) {
            tiles.push(Tile::from_region(image, x, y));
        }
    }
    Ok(tiles)
}

/// Lay tiles out row by row in a grid `width_in_tiles` wide
///
/// The grid grows beyond `height_in_tiles` rows when there are more tiles
/// than it can hold. Empty slots stay fully transparent.
pub fn recompose(tiles: &[Tile], width_in_tiles: u32, height_in_tiles: u32) -> RgbaImage {
    let width_in_tiles = width_in_tiles.max(1);
    let rows = (tiles.len() as u32).div_ceil(width_in_tiles).max(height_in_tiles);
    let mut image = RgbaImage::new(width_in_tiles * TILE_DIMENSION, rows * TILE_DIMENSION);

    for (i, tile) in tiles.iter().enumerate() {
        let ox = (i as u32 % width_in_tiles) * TILE_DIMENSION;
        let oy = (i as u32 / width_in_tiles) * TILE_DIMENSION;
        imageops::replace(&mut image, &tile.to_image(), ox as i64, oy as i64);
    }
    image
}

/// A finalized, indexed collection of tiles
#[derive(Debug, Clone)]
pub struct TileSet {
    tiles: Vec<Tile>,
    width_in_tiles: u32,
    height_in_tiles: u32,
}

impl TileSet {
    /// Wrap tiles laid out on a grid and assign their indices
    pub fn new(tiles: Vec<Tile>, width_in_tiles: u32, height_in_tiles: u32) -> Self {
        let mut tileset = TileSet {
            tiles,
            width_in_tiles,
            height_in_tiles,
        };
        tileset.assign_indices();
        tileset
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Drop every tile whose pixels repeat an earlier tile, keeping the order
    /// of first occurrences, then re-index. Returns the number removed.
    pub fn dedup(&mut self) -> usize {
        let before = self.tiles.len();
        self.tiles = dedup_tiles(std::mem::take(&mut self.tiles));
        self.assign_indices();
        before - self.tiles.len()
    }

    /// Number each tile by its position; indices wrap past 255
    pub fn assign_indices(&mut self) {
        for (position, tile) in self.tiles.iter_mut().enumerate() {
            tile.set_index((position % 256) as u8);
        }
    }

    /// Use the same classification for every tile
    pub fn set_classification(&mut self, classification: Classification) {
        for tile in self.tiles.iter_mut() {
            tile.set_classification(classification.clone());
        }
    }

    /// Encode every tile, 16 bytes each, in collection order
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.tiles.len() * TILE_BYTES);
        for tile in self.tiles.iter() {
            bytes.extend_from_slice(&tile.encode()?);
        }
        Ok(bytes)
    }

    /// Write the raw 2bpp tile data; nothing is written if any tile fails
    pub fn write_binary(&self, path: &Path) -> Result<()> {
        let bytes = self.encode()?;
        write_file(path, &bytes)?;
        info!("Wrote {} tiles ({} bytes) to {}", self.tiles.len(), bytes.len(), path.display());
        Ok(())
    }

    /// Render the tiles back onto the tileset grid
    pub fn recompose(&self) -> RgbaImage {
        recompose(&self.tiles, self.width_in_tiles, self.height_in_tiles)
    }
}

fn dedup_tiles(tiles: Vec<Tile>) -> Vec<Tile> {
    tiles.into_iter().unique().collect()
}

/// Assembles a `TileSet` from source images
pub struct TileSetBuilder<'a> {
    config: &'a Config,
    mode: BuildMode,
    unique: bool,
    rng: Rng,
}

impl<'a> TileSetBuilder<'a> {
    pub fn new(config: &'a Config, mode: BuildMode) -> Self {
        let rng = config.fill_seed.map_or_else(Rng::from_clock, Rng::new);
        TileSetBuilder {
            config,
            mode,
            unique: false,
            rng,
        }
    }

    /// Keep only the first occurrence of each distinct tile
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Scan the images in order and produce the indexed tileset
    pub fn build(mut self, images: &[RgbaImage]) -> Result<TileSet> {
        match self.mode {
            BuildMode::Compose { fill } => self.compose(images, fill),
            BuildMode::LoadExisting => self.load_existing(images),
        }
    }

    fn compose(&mut self, images: &[RgbaImage], fill: bool) -> Result<TileSet> {
        // Validate every image before scanning any of them
        let mut pixels: u64 = 0;
        for image in images.iter() {
            let (width, height) = image.dimensions();
            if !is_tile_aligned(width, height) {
                return Err(ConversionError::InvalidDimensions { width, height });
            }
            pixels += width as u64 * height as u64;
        }

        let capacity_pixels = self.config.capacity_pixels();
        if pixels > capacity_pixels {
            if self.unique {
                warn!(
                    "Input images cover {} pixels, more than the {} a tileset holds; relying on unique tiles",
                    pixels, capacity_pixels
                );
            } else {
                return Err(ConversionError::AreaExceeded {
                    pixels,
                    capacity: capacity_pixels,
                });
            }
        }

        let mut tiles = Vec::new();
        let mut palette = Palette::default();
        for (i, image) in images.iter().enumerate() {
            palette = Palette::from_image(image);
            let mut region = scan(image)?;
            debug!("Image {} yields {} tiles", i, region.len());

            if fill && i == 0 {
                let before = region.len();
                while region.len() < self.config.sprite_region_size {
                    let tile = self.random_distinct_tile(&region, &palette)?;
                    region.push(tile);
                }
                info!("Filled sprite region with {} tiles", region.len() - before);
            }
            tiles.extend(region);
        }

        if self.unique {
            let before = tiles.len();
            tiles = dedup_tiles(tiles);
            info!("Removed {} duplicate tiles", before - tiles.len());
        }

        if fill {
            let before = tiles.len();
            while tiles.len() < self.config.capacity() {
                let tile = self.random_distinct_tile(&tiles, &palette)?;
                tiles.push(tile);
            }
            info!("Filled tileset with {} tiles", tiles.len() - before);
        }

        if tiles.len() > self.config.capacity() {
            return Err(ConversionError::CapacityExceeded {
                tiles: tiles.len(),
                capacity: self.config.capacity(),
            });
        }

        info!("Composed tileset of {} tiles", tiles.len());
        Ok(TileSet::new(
            tiles,
            self.config.tileset_width_in_tiles,
            self.config.tileset_height_in_tiles,
        ))
    }

    fn load_existing(&mut self, images: &[RgbaImage]) -> Result<TileSet> {
        let mut tiles = Vec::new();
        for image in images.iter() {
            tiles.extend(scan(image)?);
        }
        let width_in_tiles = images
            .first()
            .map_or(self.config.tileset_width_in_tiles, |image| image.width() / TILE_DIMENSION);
        let height_in_tiles = (tiles.len() as u32).div_ceil(width_in_tiles.max(1));

        let mut tileset = TileSet::new(tiles, width_in_tiles, height_in_tiles);
        info!("Loaded {} tiles", tileset.len());
        if self.unique {
            let removed = tileset.dedup();
            info!("Removed {} duplicate tiles, {} remain", removed, tileset.len());
        }
        Ok(tileset)
    }

    /// Draw random tiles until one differs from every tile in `existing`
    ///
    /// Pixels are drawn from the palette when it has entries, otherwise from
    /// the whole ARGB range.
    fn random_distinct_tile(&mut self, existing: &[Tile], palette: &Palette) -> Result<Tile> {
        let attempts = self.config.fill_max_attempts;
        for _ in 0..attempts {
            let mut pixels = [0u32; TILE_PIXELS];
            for pixel in pixels.iter_mut() {
                *pixel = if palette.is_empty() {
                    self.rng.next_u32()
                } else {
                    palette.colors()[self.rng.below(palette.len())].argb()
                };
            }
            let tile = Tile::new(pixels);
            if !existing.contains(&tile) {
                return Ok(tile);
            }
        }
        Err(ConversionError::FillExhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn seeded_config() -> Config {
        Config {
            fill_seed: Some(1234),
            ..Config::default()
        }
    }

    /// Every tile of the image gets its own gradient so no two repeat
    fn distinct_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let tile = (y / 8) * (width / 8) + x / 8;
            Rgba([(tile % 256) as u8, (tile / 256) as u8, ((x % 8) * 8 + y % 8) as u8, 255])
        })
    }

    #[test]
    fn test_scan_row_major() {
        let image = distinct_image(24, 16);
        let tiles = scan(&image).unwrap();
        assert_eq!(tiles.len(), 6);
        for (i, tile) in tiles.iter().enumerate() {
            assert_eq!(tile.pixel(0, 0) >> 16 & 0xff, i as u32);
        }
    }

    #[test]
    fn test_scan_rejects_unaligned_image() {
        let image = RgbaImage::new(12, 8);
        assert!(matches!(
            scan(&image),
            Err(ConversionError::InvalidDimensions { width: 12, height: 8 })
        ));
    }

    #[test]
    fn test_recompose_round_trip() {
        let image = distinct_image(32, 24);
        let tiles = scan(&image).unwrap();
        let recomposed = recompose(&tiles, 4, 3);
        assert_eq!(recomposed, image);
        assert_eq!(scan(&recomposed).unwrap(), tiles);
    }

    #[test]
    fn test_recompose_grows_and_leaves_slots_transparent() {
        let tiles = scan(&distinct_image(24, 8)).unwrap();
        let image = recompose(&tiles, 2, 1);
        assert_eq!(image.dimensions(), (16, 16));
        assert_eq!(*image.get_pixel(8, 8), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_indices_wrap_past_255() {
        let tiles = scan(&distinct_image(8 * 20, 8 * 15)).unwrap();
        let tileset = TileSet::new(tiles, 20, 15);
        assert_eq!(tileset.tiles()[255].index(), 255);
        assert_eq!(tileset.tiles()[256].index(), 0);
        assert_eq!(tileset.tiles()[299].index(), 43);
    }

    #[test]
    fn test_compose_without_dedup_keeps_duplicates() {
        let config = seeded_config();
        let image = RgbaImage::from_pixel(16, 8, BLACK);
        let tileset = TileSetBuilder::new(&config, BuildMode::Compose { fill: false })
            .build(&[image])
            .unwrap();
        assert_eq!(tileset.len(), 2);
    }

    #[test]
    fn test_compose_unique_keeps_first_occurrence() {
        let config = seeded_config();
        let first = RgbaImage::from_fn(24, 8, |x, _| if x < 8 || x >= 16 { BLACK } else { WHITE });
        let second = RgbaImage::from_pixel(8, 8, WHITE);
        let tileset = TileSetBuilder::new(&config, BuildMode::Compose { fill: false })
            .unique(true)
            .build(&[first, second])
            .unwrap();

        assert_eq!(tileset.len(), 2);
        assert_eq!(tileset.tiles()[0].pixel(0, 0), 0xff00_0000);
        assert_eq!(tileset.tiles()[1].pixel(0, 0), 0xffff_ffff);
        assert_eq!(tileset.tiles()[1].index(), 1);
    }

    #[test]
    fn test_compose_rejects_unaligned_images() {
        let config = seeded_config();
        let result = TileSetBuilder::new(&config, BuildMode::Compose { fill: false })
            .build(&[RgbaImage::new(8, 8), RgbaImage::new(8, 10)]);
        assert!(matches!(result, Err(ConversionError::InvalidDimensions { width: 8, height: 10 })));
    }

    #[test]
    fn test_compose_area_check() {
        let config = Config {
            tileset_width_in_tiles: 2,
            tileset_height_in_tiles: 1,
            ..seeded_config()
        };
        let image = RgbaImage::from_pixel(24, 8, BLACK);

        let result = TileSetBuilder::new(&config, BuildMode::Compose { fill: false })
            .build(std::slice::from_ref(&image));
        assert!(matches!(result, Err(ConversionError::AreaExceeded { pixels: 192, capacity: 128 })));

        // Unique mode only warns and succeeds once duplicates are gone
        let tileset = TileSetBuilder::new(&config, BuildMode::Compose { fill: false })
            .unique(true)
            .build(&[image])
            .unwrap();
        assert_eq!(tileset.len(), 1);
    }

    #[test]
    fn test_compose_capacity_check_after_dedup() {
        let config = Config {
            tileset_width_in_tiles: 2,
            tileset_height_in_tiles: 1,
            ..seeded_config()
        };
        let result = TileSetBuilder::new(&config, BuildMode::Compose { fill: false })
            .unique(true)
            .build(&[distinct_image(24, 8)]);
        assert!(matches!(result, Err(ConversionError::CapacityExceeded { tiles: 3, capacity: 2 })));
    }

    #[test]
    fn test_fill_pads_sprite_region_and_grid() {
        let config = Config {
            tileset_width_in_tiles: 4,
            tileset_height_in_tiles: 4,
            sprite_region_size: 6,
            ..seeded_config()
        };
        let sprites = RgbaImage::from_fn(16, 8, |x, _| if x < 8 { BLACK } else { WHITE });
        let background = RgbaImage::from_fn(8, 8, |x, _| if x % 2 == 0 { BLACK } else { WHITE });
        let stripes = Tile::from_region(&background, 0, 0);

        let tileset = TileSetBuilder::new(&config, BuildMode::Compose { fill: true })
            .build(&[sprites, background])
            .unwrap();
        assert_eq!(tileset.len(), 16);

        let tiles = tileset.tiles();
        // Sprite region: two source tiles then four distinct fill tiles
        for i in 2..6 {
            assert!(!tiles[..i].contains(&tiles[i]));
        }
        // Background tile sits right after the sprite region
        assert_eq!(tiles[6], stripes);
        // Grid fill tiles are distinct and drawn from the known colors
        for i in 7..16 {
            assert!(!tiles[..i].contains(&tiles[i]));
            assert!(tiles[i]
                .pixels()
                .iter()
                .all(|p| *p == 0xff00_0000 || *p == 0xffff_ffff));
        }
    }

    #[test]
    fn test_fill_is_bounded() {
        let config = Config {
            tileset_width_in_tiles: 2,
            tileset_height_in_tiles: 1,
            sprite_region_size: 0,
            fill_max_attempts: 50,
            ..seeded_config()
        };
        // A single-color palette can never yield a second distinct tile
        let image = RgbaImage::from_pixel(8, 8, BLACK);
        let result = TileSetBuilder::new(&config, BuildMode::Compose { fill: true }).build(&[image]);
        assert!(matches!(result, Err(ConversionError::FillExhausted { attempts: 50 })));
    }

    #[test]
    fn test_fill_is_reproducible_with_seed() {
        let config = Config {
            tileset_width_in_tiles: 4,
            tileset_height_in_tiles: 2,
            sprite_region_size: 0,
            ..seeded_config()
        };
        let image = RgbaImage::from_fn(8, 8, |x, _| if x % 2 == 0 { BLACK } else { WHITE });
        let build = || {
            TileSetBuilder::new(&config, BuildMode::Compose { fill: true })
                .build(std::slice::from_ref(&image))
                .unwrap()
        };
        assert_eq!(build().tiles(), build().tiles());
    }

    #[test]
    fn test_load_existing_and_dedup() {
        let config = seeded_config();
        let image = RgbaImage::from_fn(24, 16, |x, y| if (x / 8 + y / 8) % 2 == 0 { BLACK } else { WHITE });

        let tileset = TileSetBuilder::new(&config, BuildMode::LoadExisting)
            .build(std::slice::from_ref(&image))
            .unwrap();
        assert_eq!(tileset.len(), 6);
        assert_eq!(tileset.recompose(), image);

        let tileset = TileSetBuilder::new(&config, BuildMode::LoadExisting)
            .unique(true)
            .build(&[image])
            .unwrap();
        assert_eq!(tileset.len(), 2);
        assert_eq!(tileset.tiles()[0].pixel(0, 0), 0xff00_0000);
        assert_eq!(tileset.tiles()[1].index(), 1);
    }

    #[test]
    fn test_black_tile_writes_zero_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiles.2bpp");
        let config = seeded_config();
        let tileset = TileSetBuilder::new(&config, BuildMode::LoadExisting)
            .build(&[RgbaImage::from_pixel(8, 8, BLACK)])
            .unwrap();

        tileset.write_binary(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn test_failed_encoding_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiles.2bpp");
        let config = seeded_config();
        let mut tileset = TileSetBuilder::new(&config, BuildMode::LoadExisting)
            .build(&[RgbaImage::from_pixel(8, 8, BLACK)])
            .unwrap();
        let palette = Palette::parse("ffffff").unwrap();
        tileset.set_classification(Classification::PixelPerfect(std::rc::Rc::new(palette)));

        assert!(matches!(
            tileset.write_binary(&path),
            Err(ConversionError::NoPaletteMatch { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_rewrite_replaces_whole_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiles.2bpp");
        std::fs::write(&path, vec![0xaa; 64]).unwrap();

        let config = seeded_config();
        let tileset = TileSetBuilder::new(&config, BuildMode::LoadExisting)
            .build(&[RgbaImage::from_pixel(8, 8, BLACK)])
            .unwrap();
        tileset.write_binary(&path).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![0u8; 16]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
