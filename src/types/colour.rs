//! Colour type and parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CamoError, Result};

/// An opaque RGB colour value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    /// Create a new colour from RGB components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// White.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Parse a hex colour string.
    ///
    /// Supports formats:
    /// - `#RGB` (3 digits, expanded to 6)
    /// - `#RRGGBB` (6 digits)
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let hex = s.strip_prefix('#').unwrap_or(s);

        if !hex.is_ascii() {
            return Err(invalid_hex(s));
        }

        match hex.len() {
            3 => {
                // #RGB -> #RRGGBB
                let digits = hex
                    .chars()
                    .map(parse_hex_digit)
                    .collect::<Result<Vec<u8>>>()?;
                let expand = |d: u8| d << 4 | d;
                Ok(Self::rgb(expand(digits[0]), expand(digits[1]), expand(digits[2])))
            }
            6 => {
                let r = parse_hex_byte(&hex[0..2])?;
                let g = parse_hex_byte(&hex[2..4])?;
                let b = parse_hex_byte(&hex[4..6])?;
                Ok(Self::rgb(r, g, b))
            }
            _ => Err(invalid_hex(s)),
        }
    }

    /// Lower-case hex without the leading `#`, as used in file names.
    pub fn hex_digits(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Convert to an RGB array.
    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Build from an RGB array.
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        Self::rgb(rgb[0], rgb[1], rgb[2])
    }

    /// Squared Euclidean distance in channel space.
    pub fn dist_sq(self, other: Colour) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    /// Sum of the three channels, the brightness key used for ordering.
    pub fn channel_sum(self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }

    /// Whether dark text reads better than light text on this colour.
    pub fn is_bright(self) -> bool {
        self.r as f32 * 0.299 + self.g as f32 * 0.587 + self.b as f32 * 0.114 > 186.0
    }

    /// Per-channel integer mean (truncating) of a set of colours.
    ///
    /// Returns `None` for an empty set.
    pub fn mean<I: IntoIterator<Item = Colour>>(colours: I) -> Option<Colour> {
        let mut sum = [0u64; 3];
        let mut count = 0u64;
        for c in colours {
            sum[0] += c.r as u64;
            sum[1] += c.g as u64;
            sum[2] += c.b as u64;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(Colour::rgb(
            (sum[0] / count) as u8,
            (sum[1] / count) as u8,
            (sum[2] / count) as u8,
        ))
    }
}

impl FromStr for Colour {
    type Err = CamoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.hex_digits())
    }
}

impl Serialize for Colour {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Colour {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Colour::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

fn invalid_hex(s: &str) -> CamoError {
    CamoError::Parse {
        message: format!("Invalid hex colour: {}", s),
        help: Some("Use #RGB or #RRGGBB format".to_string()),
    }
}

/// Parse a single hex digit.
fn parse_hex_digit(c: char) -> Result<u8> {
    c.to_digit(16)
        .map(|d| d as u8)
        .ok_or_else(|| CamoError::Parse {
            message: format!("Invalid hex digit: {}", c),
            help: None,
        })
}

/// Parse a two-character hex byte.
fn parse_hex_byte(s: &str) -> Result<u8> {
    u8::from_str_radix(s, 16).map_err(|_| CamoError::Parse {
        message: format!("Invalid hex byte: {}", s),
        help: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_6digit() {
        let c = Colour::from_hex("#FF0000").unwrap();
        assert_eq!(c, Colour::rgb(255, 0, 0));

        let c = Colour::from_hex("#1a1a2e").unwrap();
        assert_eq!(c, Colour::rgb(0x1a, 0x1a, 0x2e));
    }

    #[test]
    fn test_from_hex_3digit() {
        let c = Colour::from_hex("#ABC").unwrap();
        assert_eq!(c, Colour::rgb(0xAA, 0xBB, 0xCC));
    }

    #[test]
    fn test_from_hex_no_hash() {
        let c = Colour::from_hex("00ff00").unwrap();
        assert_eq!(c, Colour::rgb(0, 255, 0));
    }

    #[test]
    fn test_from_hex_invalid() {
        assert!(Colour::from_hex("#GGG").is_err());
        assert!(Colour::from_hex("#12345").is_err());
        assert!(Colour::from_hex("#FF000080").is_err());
        assert!(Colour::from_hex("").is_err());
        assert!(Colour::from_hex("#é12").is_err());
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(Colour::rgb(255, 0, 171).to_string(), "#ff00ab");
        assert_eq!(Colour::rgb(255, 0, 171).hex_digits(), "ff00ab");
    }

    #[test]
    fn test_dist_sq() {
        assert_eq!(Colour::BLACK.dist_sq(Colour::WHITE), 3 * 255 * 255);
        assert_eq!(Colour::rgb(10, 20, 30).dist_sq(Colour::rgb(13, 16, 30)), 25);
    }

    #[test]
    fn test_mean_truncates() {
        let mean = Colour::mean([Colour::rgb(255, 0, 0), Colour::rgb(0, 0, 255)]).unwrap();
        assert_eq!(mean, Colour::rgb(127, 0, 127));
        assert_eq!(Colour::mean(Vec::new()), None);
    }

    #[test]
    fn test_is_bright() {
        assert!(Colour::WHITE.is_bright());
        assert!(!Colour::rgb(0, 0, 255).is_bright());
    }

    #[test]
    fn test_serde_round_trip_through_yaml() {
        let c: Colour = serde_yaml::from_str("'#336699'").unwrap();
        assert_eq!(c, Colour::rgb(0x33, 0x66, 0x99));

        let yaml = serde_yaml::to_string(&c).unwrap();
        let back: Colour = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_serde_rejects_bad_hex() {
        assert!(serde_yaml::from_str::<Colour>("'#zzzzzz'").is_err());
    }
}
