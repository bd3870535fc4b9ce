//! Image conversion module tying the tile pipeline together
//!
//! This module runs the three conversions the tool offers: composing a
//! tileset image from source images, requantizing an image to a palette, and
//! turning a tileset image into DMG 2bpp data plus tile-maps.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::RgbaImage;
use log::info;
use serde::Serialize;

use crate::artifact::write_file;
use crate::color::{Classification, SHADES};
use crate::config::Config;
use crate::error::{ConversionError, Result};
use crate::palette::Palette;
use crate::tilemap::TileMapResolver;
use crate::tileset::{BuildMode, TileSetBuilder};

/// Where the palette of a conversion comes from
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteSource {
    /// A palette given by the user
    Explicit(Palette),
    /// The distinct colors of the image itself
    Detect,
}

/// Options for composing a tileset image
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    pub fill: bool,
    pub unique: bool,
    /// Requantize the composed image to this palette before saving
    pub palette: Option<PaletteSource>,
}

/// Options for writing 2bpp data from a tileset image
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Classify pixels by palette; grayscale when unset
    pub palette: Option<PaletteSource>,
    /// Sort the palette by brightness; `Some(true)` gives darkest first
    pub sort_palette: Option<bool>,
    pub unique: bool,
    /// Layout images to resolve into tile-maps
    pub tilemaps: Vec<PathBuf>,
}

/// Summary of an output run, also written as the JSON manifest
#[derive(Debug, Clone, Serialize)]
pub struct OutputSummary {
    pub tileset: PathBuf,
    pub binary: PathBuf,
    pub tile_count: usize,
    pub classification: &'static str,
    pub palette: Option<Palette>,
    pub tilemaps: Vec<PathBuf>,
}

/// Read an image from disk as RGBA
pub fn read_image(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

/// Main struct for the conversion process
pub struct Converter {
    config: Config,
}

impl Converter {
    /// Create a new converter with the given configuration
    pub fn new(config: Config) -> Self {
        Converter { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compose a tileset from sprite, background and window images and save
    /// it as `tileset_file_name` in the output directory
    pub fn create_tileset(&self, sources: &[PathBuf], options: &ComposeOptions) -> Result<PathBuf> {
        let images = sources
            .iter()
            .map(|path| read_image(path))
            .collect::<Result<Vec<_>>>()?;

        let tileset = TileSetBuilder::new(&self.config, BuildMode::Compose { fill: options.fill })
            .unique(options.unique)
            .build(&images)?;

        let mut preview = tileset.recompose();
        if let Some(source) = &options.palette {
            let palette = match source {
                PaletteSource::Explicit(palette) => palette.clone(),
                PaletteSource::Detect => Palette::from_image(&preview).truncated(SHADES),
            };
            info!("Converting tileset to {} colors", palette.len());
            preview = palette.requantize(&preview)?;
        }

        let path = self.config.tileset_path();
        preview.save(&path)?;
        info!("Wrote tileset image to {}", path.display());
        Ok(path)
    }

    /// Requantize an image to a palette and save it
    pub fn convert(&self, input: &Path, output: &Path, palette: &Palette) -> Result<()> {
        let image = read_image(input)?;
        palette.requantize(&image)?.save(output)?;
        info!("Wrote converted image to {}", output.display());
        Ok(())
    }

    /// Turn a tileset image into 2bpp data and resolve the given layouts
    pub fn output(&self, tileset_path: &Path, output: &Path, options: &OutputOptions) -> Result<OutputSummary> {
        let image = read_image(tileset_path)?;
        let mut tileset = TileSetBuilder::new(&self.config, BuildMode::LoadExisting)
            .build(std::slice::from_ref(&image))?;

        let palette = options.palette.as_ref().map(|source| {
            let palette = resolve_palette(source, &image);
            match options.sort_palette {
                Some(reverse) => palette.sorted_by_brightness(reverse),
                None => palette,
            }
        });
        if let Some(palette) = &palette {
            if palette.is_empty() {
                return Err(ConversionError::EmptyPalette);
            }
            tileset.set_classification(Classification::PixelPerfect(Rc::new(palette.clone())));
        }

        if options.unique {
            tileset.dedup();
        }
        tileset.write_binary(output)?;

        let mut tilemaps = Vec::with_capacity(options.tilemaps.len());
        if !options.tilemaps.is_empty() {
            let resolver = TileMapResolver::new(&tileset);
            for layout_path in options.tilemaps.iter() {
                let layout = read_image(layout_path)?;
                let tilemap = resolver.resolve(&layout)?;
                let path = self.config.tilemap_path(layout_path);
                tilemap.write(&path)?;
                tilemaps.push(path);
            }
        }

        let summary = OutputSummary {
            tileset: tileset_path.to_path_buf(),
            binary: output.to_path_buf(),
            tile_count: tileset.len(),
            classification: if palette.is_some() { "pixel-perfect" } else { "grayscale" },
            palette,
            tilemaps,
        };

        if let Some(json_path) = &self.config.output_json {
            self.write_json_file(json_path, &summary)?;
        }
        Ok(summary)
    }

    /// Write the JSON manifest file
    fn write_json_file(&self, path: &Path, summary: &OutputSummary) -> Result<()> {
        let json = serde_json::to_vec_pretty(summary)?;
        write_file(path, &json)?;
        info!("Wrote manifest to {}", path.display());
        Ok(())
    }
}

fn resolve_palette(source: &PaletteSource, image: &RgbaImage) -> Palette {
    match source {
        PaletteSource::Explicit(palette) => palette.clone(),
        PaletteSource::Detect => Palette::from_image(image),
    }
}
