use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use dmgconv::{ComposeOptions, Config, Converter, OutputOptions, Palette, PaletteSource};

/// Converts .png files to 2bpp files for the DMG Game Boy.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory receiving the composed tileset image
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Seed for randomly generated fill tiles
    #[arg(long)]
    seed: Option<u64>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generates a tileset image from sprite, background and window images
    CreateTileset {
        sprites: PathBuf,
        background: PathBuf,
        window: PathBuf,

        /// Fill the sprite region and the rest of the tileset with random distinct tiles
        #[arg(short, long)]
        fill: bool,

        /// Keep only distinct tiles
        #[arg(short, long)]
        unique: bool,

        /// Convert the tileset to these colors; detect them from the image when no list is given
        #[arg(short = 'c', long, num_args = 0..=1, value_name = "HEXCOLOR,...")]
        palette: Option<Option<String>>,
    },

    /// Converts an image to the given colors
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Comma separated hex colors
        colors: String,
    },

    /// Generates a Game Boy 2bpp file from a tileset image
    Output {
        tileset: PathBuf,
        output: PathBuf,

        /// Match pixels against these colors (first 4 are used); detect them from the image when no list is given
        #[arg(short = 'c', long, num_args = 0..=1, value_name = "HEXCOLOR,...")]
        palette: Option<Option<String>>,

        /// Sort the palette by brightness, brightest first
        #[arg(long, requires = "palette")]
        sort_palette: bool,

        /// Reverse the sorted palette, darkest first
        #[arg(long, requires = "sort_palette")]
        reverse: bool,

        /// Keep only distinct tiles
        #[arg(short, long)]
        unique: bool,

        /// Layout images to turn into tile-maps
        #[arg(short, long, num_args = 1..)]
        tilemaps: Vec<PathBuf>,
    },
}

fn palette_source(option: Option<Option<String>>) -> Result<Option<PaletteSource>> {
    Ok(match option {
        None => None,
        Some(None) => Some(PaletteSource::Detect),
        Some(Some(colors)) => Some(PaletteSource::Explicit(
            Palette::parse(&colors).with_context(|| format!("Invalid color palette {:?}", colors))?,
        )),
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(seed) = args.seed {
        config.fill_seed = Some(seed);
    }

    let converter = Converter::new(config);
    match args.command {
        Command::CreateTileset {
            sprites,
            background,
            window,
            fill,
            unique,
            palette,
        } => {
            let options = ComposeOptions {
                fill,
                unique,
                palette: palette_source(palette)?,
            };
            converter
                .create_tileset(&[sprites, background, window], &options)
                .context("Failed to create tileset")?;
        }
        Command::Convert { input, output, colors } => {
            let palette = Palette::parse(&colors)
                .with_context(|| format!("Invalid color palette {:?}", colors))?;
            converter
                .convert(&input, &output, &palette)
                .with_context(|| format!("Failed to convert {}", input.display()))?;
        }
        Command::Output {
            tileset,
            output,
            palette,
            sort_palette,
            reverse,
            unique,
            tilemaps,
        } => {
            let options = OutputOptions {
                palette: palette_source(palette)?,
                sort_palette: sort_palette.then_some(reverse),
                unique,
                tilemaps,
            };
            let summary = converter
                .output(&tileset, &output, &options)
                .with_context(|| format!("Failed to convert tileset {}", tileset.display()))?;
            info!(
                "Converted {} tiles, {} tile-map(s)",
                summary.tile_count,
                summary.tilemaps.len()
            );
        }
    }

    Ok(())
}
