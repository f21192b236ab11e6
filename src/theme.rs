//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One glyph per tile colour, drawn in that colour.
pub const TILE_GLYPHS: [char; 6] = ['★', '✦', '✧', '✪', '☆', '✯'];

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Tile colours (index 0..=5): green, yellow, red, blue, magenta, cyan.
    pub tiles: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, combo).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text and key help.
    pub inactive_fg: Color,
    /// Background behind the group under the cursor.
    pub selected_bg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const ONEDARK_TILES: [Color; 6] = [
    Color::Rgb(0x98, 0xC3, 0x79), // green
    Color::Rgb(0xE5, 0xC0, 0x7B), // yellow
    Color::Rgb(0xE0, 0x6C, 0x75), // red
    Color::Rgb(0x61, 0xAF, 0xEF), // blue
    Color::Rgb(0xC6, 0x78, 0xDD), // magenta
    Color::Rgb(0x56, 0xB6, 0xC2), // cyan
];

const HIGH_CONTRAST_TILES: [Color; 6] = [
    Color::Rgb(0x00, 0xFF, 0x00),
    Color::Rgb(0xFF, 0xFF, 0x00),
    Color::Rgb(0xFF, 0x00, 0x00),
    Color::Rgb(0x00, 0x88, 0xFF),
    Color::Rgb(0xFF, 0x00, 0xFF),
    Color::Rgb(0x00, 0xFF, 0xFF),
];

// Avoids red/green pairs.
const COLORBLIND_TILES: [Color; 6] = [
    Color::Rgb(0x00, 0x77, 0xBB), // blue
    Color::Rgb(0xEE, 0x77, 0x33), // orange
    Color::Rgb(0x00, 0x99, 0x88), // teal
    Color::Rgb(0xCC, 0x33, 0x11), // red
    Color::Rgb(0xEE, 0x33, 0x77), // magenta
    Color::Rgb(0xBB, 0xBB, 0x00), // yellow
];

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// One Dark defaults (same hex values as onedark.theme).
    pub fn onedark_default() -> Self {
        Self {
            tiles: ONEDARK_TILES,
            bg: Color::Rgb(0x28, 0x2C, 0x34),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
            selected_bg: Color::Rgb(0x3E, 0x44, 0x52),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    /// `palette` then overrides the tile colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => self.tiles = HIGH_CONTRAST_TILES,
            crate::Palette::Colorblind => self.tiles = COLORBLIND_TILES,
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let base = Self::onedark_default();
        // Keys follow onedark.theme; anything missing keeps the One Dark value.
        Self {
            tiles: [
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(base.tiles[0]),
                get("cpu_mid").or_else(|| get("title")).unwrap_or(base.tiles[1]),
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(base.tiles[2]),
                get("cpu_box").unwrap_or(base.tiles[3]),
                get("net_box").unwrap_or(base.tiles[4]),
                get("hi_fg").or_else(|| get("proc_misc")).unwrap_or(base.tiles[5]),
            ],
            bg: get("main_bg").unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            inactive_fg: get("inactive_fg").unwrap_or(base.inactive_fg),
            selected_bg: get("selected_bg").unwrap_or(base.selected_bg),
        }
    }

    /// Colour for tile colour index (wraps past 6).
    #[inline]
    pub fn tile_color(&self, index: u8) -> Color {
        self.tiles[(index as usize) % self.tiles.len()]
    }

    #[inline]
    pub fn tile_glyph(index: u8) -> char {
        TILE_GLYPHS[(index as usize) % TILE_GLYPHS.len()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Palette;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(matches!(parse_hex("#12345"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#GGHHII"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[main_bg]="#31353F""##);
        assert_eq!(map.get("main_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_file_overrides_some_keys() {
        let map = parse_theme_file(
            "# comment\ntheme[cpu_box]='#0000FF'\ntheme[main_fg]=\"#FFF\"\nnot a theme line\n",
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.tiles[3], Color::Rgb(0, 0, 255));
        assert_eq!(theme.main_fg, Color::Rgb(255, 255, 255));
        assert_eq!(theme.tiles[0], ONEDARK_TILES[0]);
    }

    #[test]
    fn test_missing_file_uses_palette_defaults() {
        let theme = Theme::load(
            Some(Path::new("/nonexistent/starpop.theme")),
            Palette::Colorblind,
        )
        .unwrap();
        assert_eq!(theme.tiles, COLORBLIND_TILES);
        assert_eq!(theme.bg, Theme::onedark_default().bg);
    }

    #[test]
    fn test_tile_lookup_wraps() {
        let theme = Theme::default();
        assert_eq!(theme.tile_color(7), theme.tiles[1]);
        assert_eq!(Theme::tile_glyph(0), '★');
        assert_eq!(Theme::tile_glyph(6), '★');
    }
}
