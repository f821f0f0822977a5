use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid hex color '{0}', expected #rrggbb")]
pub struct ColorError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ColorError(s.to_string()));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorError(s.to_string()));
        Ok(Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Ten-step purple–green diverging scheme.
pub const PURPLE_GREEN: [Color; 10] = [
    Color::rgb(0x40, 0x00, 0x4b),
    Color::rgb(0x76, 0x2a, 0x83),
    Color::rgb(0x99, 0x70, 0xab),
    Color::rgb(0xc2, 0xa5, 0xcf),
    Color::rgb(0xe7, 0xd4, 0xe8),
    Color::rgb(0xd9, 0xf0, 0xd3),
    Color::rgb(0xa6, 0xdb, 0xa0),
    Color::rgb(0x5a, 0xae, 0x61),
    Color::rgb(0x1b, 0x78, 0x37),
    Color::rgb(0x00, 0x44, 0x1b),
];

pub const NO_DATA: Color = Color::rgb(0xcc, 0xcc, 0xcc);
