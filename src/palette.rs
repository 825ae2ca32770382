use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Detail slices start this many colors into the palette so they do not
/// repeat the first aggregate slices.
pub const DETAIL_COLOR_OFFSET: usize = 2;

pub const DEFAULT_COLORS: [&str; 19] = [
    "#e64cc2", "#4c94e6", "#ffc658", "#ff7850", "#c71585", "#1abc9c", "#3498db", "#f39c12",
    "#2ecc71", "#e74c3c", "#9b59b6", "#34495e", "#d35400", "#27ae60", "#2980b9", "#8e44ad",
    "#c0392b", "#7f8c8d", "#e67e22",
];

/// A `#rrggbb` display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidColor {
            value: value.to_string(),
        };
        let hex_part = value.trim().strip_prefix('#').ok_or_else(invalid)?;
        let bytes = hex::decode(hex_part).map_err(|_| invalid())?;
        match bytes.as_slice() {
            [r, g, b] => Ok(Self {
                r: *r,
                g: *g,
                b: *b,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", hex::encode([self.r, self.g, self.b]))
    }
}

impl TryFrom<String> for Color {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Fixed, non-empty, ordered color list assigned cyclically by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Result<Self> {
        if colors.is_empty() {
            return Err(CoreError::EmptyPalette);
        }
        Ok(Self { colors })
    }

    /// Parses a comma-separated list such as `#ff0000,#00ff00`.
    pub fn parse_list(list: &str) -> Result<Self> {
        let colors = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Color::parse)
            .collect::<Result<Vec<_>>>()?;
        Self::new(colors)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn color_for(&self, position: usize) -> Color {
        self.colors[position % self.colors.len()]
    }

    pub fn detail_color_for(&self, slot: usize) -> Color {
        self.color_for(slot + DETAIL_COLOR_OFFSET)
    }
}

impl Default for Palette {
    fn default() -> Self {
        let colors = DEFAULT_COLORS
            .iter()
            .filter_map(|c| Color::parse(c).ok())
            .collect();
        Self { colors }
    }
}
