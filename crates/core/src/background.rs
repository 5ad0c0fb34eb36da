//! Replacement background selection.
//!
//! [`BackgroundSpec`] is a tagged variant: a solid colour and a background
//! image can never be active at the same time, and "transparent" is its own
//! case rather than a sentinel colour value.

use crate::asset::ImageAsset;
use crate::error::{AppError, Result};
use std::fmt;
use std::str::FromStr;

/// An opaque sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff);
    pub const BLACK: Self = Self::new(0x00, 0x00, 0x00);
    pub const RED: Self = Self::new(0xff, 0x00, 0x00);
    pub const GREEN: Self = Self::new(0x00, 0xff, 0x00);
    pub const BLUE: Self = Self::new(0x00, 0x00, 0xff);
    pub const YELLOW: Self = Self::new(0xfa, 0xcc, 0x15);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb`, `rrggbb`, `#rgb` or `rgb`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidColor`] for anything else.
    pub fn from_hex(input: &str) -> Result<Self> {
        let hex = input.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(AppError::InvalidColor(input.to_string()));
        }

        let channel = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|_| AppError::InvalidColor(input.to_string()))
        };

        match hex.len() {
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Ok(Self::new(
                channel(&hex[0..1])? * 17,
                channel(&hex[1..2])? * 17,
                channel(&hex[2..3])? * 17,
            )),
            _ => Err(AppError::InvalidColor(input.to_string())),
        }
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// What is painted behind the cut-out foreground.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BackgroundSpec {
    /// Nothing: the exported raster keeps the foreground's transparency.
    #[default]
    Transparent,
    /// Fill the whole output with one colour.
    SolidColor(Rgb),
    /// Stretch an image over the whole output.
    Image(ImageAsset),
}

impl BackgroundSpec {
    pub fn color(&self) -> Option<Rgb> {
        match self {
            Self::SolidColor(c) => Some(*c),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&ImageAsset> {
        match self {
            Self::Image(asset) => Some(asset),
            _ => None,
        }
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Transparent)
    }
}

/// One entry of the fixed colour palette. `color: None` is the transparent swatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swatch {
    pub label: &'static str,
    pub color: Option<Rgb>,
}

impl Swatch {
    /// Whether this swatch is the current selection.
    pub fn is_selected(&self, current: &BackgroundSpec) -> bool {
        match (self.color, current) {
            (None, BackgroundSpec::Transparent) => true,
            (Some(c), BackgroundSpec::SolidColor(current)) => c == *current,
            _ => false,
        }
    }
}

/// Background colours offered in the toolbar.
pub const PALETTE: [Swatch; 7] = [
    Swatch { label: "transparent", color: None },
    Swatch { label: "#ffffff", color: Some(Rgb::WHITE) },
    Swatch { label: "#000000", color: Some(Rgb::BLACK) },
    Swatch { label: "#ff0000", color: Some(Rgb::RED) },
    Swatch { label: "#00ff00", color: Some(Rgb::GREEN) },
    Swatch { label: "#0000ff", color: Some(Rgb::BLUE) },
    Swatch { label: "#facc15", color: Some(Rgb::YELLOW) },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(Rgb::from_hex("#ff0000").unwrap(), Rgb::RED);
        assert_eq!(Rgb::from_hex("FACC15").unwrap(), Rgb::YELLOW);
        assert_eq!(Rgb::from_hex("#fff").unwrap(), Rgb::WHITE);
        assert_eq!("#00f".parse::<Rgb>().unwrap(), Rgb::BLUE);
    }

    #[test]
    fn rejects_malformed_hex() {
        for bad in ["", "#ff00", "#gg0000", "transparent", "#ff00000", "#ééé"] {
            assert!(Rgb::from_hex(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn palette_labels_match_colours() {
        for swatch in PALETTE.iter().skip(1) {
            assert_eq!(swatch.color.unwrap().to_hex(), swatch.label);
        }
        assert_eq!(PALETTE[0].color, None);
    }

    #[test]
    fn swatch_selection_tracks_current_spec() {
        let red = PALETTE[3];
        assert!(red.is_selected(&BackgroundSpec::SolidColor(Rgb::RED)));
        assert!(!red.is_selected(&BackgroundSpec::Transparent));
        assert!(PALETTE[0].is_selected(&BackgroundSpec::Transparent));
    }
}
