//! starpop — pop groups of same-coloured stars in the terminal.

mod app;
mod board;
mod error;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use board::{BoardConfig, DEFAULT_COLORS, DEFAULT_COLS, DEFAULT_ROWS};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Options derived from CLI that affect the game (board shape, dealing, animation).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub board: BoardConfig,
    /// Seed for dealing; restarts keep drawing from the same generator.
    pub seed: Option<u64>,
    pub no_animation: bool,
    pub removal_ms: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|err| {
        warn!(%err, "theme not loaded, using One Dark");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    let config = GameConfig {
        board: BoardConfig {
            rows: args.rows,
            cols: args.cols,
            colors: args.colors,
        },
        seed: args.seed,
        no_animation: args.no_animation,
        removal_ms: args.removal_ms,
    };
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// Log to `path` if given; the terminal belongs to the UI. `RUST_LOG` overrides the `info` default.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
    Ok(())
}

/// Pop-the-stars puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "starpop",
    version,
    about = "Pop groups of two or more same-coloured stars. Bigger groups score more; the game ends when no group is left.",
    long_about = "starpop is a tile-elimination puzzle for the terminal.\n\n\
        Select a star: if it touches at least one star of the same colour (up, down, left, right), \
        the whole connected group pops. Stars above fall down and empty columns close to the left.\n\n\
        Each pop scores size*size*5 + combo*2, where combo counts every pop this game.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor   Enter / Space  Pop   Mouse click  Pop\n  R              Restart       Q / Esc        Quit"
)]
pub struct Args {
    /// Board height in cells (1 to 1024).
    #[arg(long, default_value_t = DEFAULT_ROWS, value_parser = board_side(), value_name = "ROWS")]
    pub rows: usize,

    /// Board width in cells (1 to 1024).
    #[arg(long, default_value_t = DEFAULT_COLS, value_parser = board_side(), value_name = "COLS")]
    pub cols: usize,

    /// Number of star colours (1 to 6).
    #[arg(long, default_value_t = DEFAULT_COLORS, value_parser = clap::value_parser!(u8).range(1..=6), value_name = "N")]
    pub colors: u8,

    /// Seed for a reproducible deal (and the deals after each restart).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Pop instantly instead of fading the group out.
    #[arg(long)]
    pub no_animation: bool,

    /// Duration of the pop fade in ms.
    #[arg(long, default_value_t = 220, value_name = "MS")]
    pub removal_ms: u32,

    /// Write logs to this file (set RUST_LOG=debug for every move).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

fn board_side() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..=ui::MAX_BOARD_SIDE as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
