//! Color values for `color` components.
//!
//! Components store colors in their native string form and hand out a
//! structured [`Color`] on read.

use std::fmt;

use super::value::Value;

/// RGBA color with channels in the 0.0-1.0 range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

const NAMED: &[(&str, Color)] = &[
    ("black", Color::BLACK),
    ("white", Color::WHITE),
    ("red", Color::rgb(255, 0, 0)),
    ("green", Color::rgb(0, 128, 0)),
    ("lime", Color::rgb(0, 255, 0)),
    ("blue", Color::rgb(0, 0, 255)),
    ("yellow", Color::rgb(255, 255, 0)),
    ("cyan", Color::rgb(0, 255, 255)),
    ("magenta", Color::rgb(255, 0, 255)),
    ("gray", Color::rgb(128, 128, 128)),
    ("grey", Color::rgb(128, 128, 128)),
    ("orange", Color::rgb(255, 165, 0)),
    ("purple", Color::rgb(128, 0, 128)),
    ("transparent", Color::TRANSPARENT),
];

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Color {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Create color from RGB values (0-255)
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::new(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0, 1.0)
    }

    /// Gray level in the 0.0-1.0 range.
    pub fn gray(level: f64) -> Self {
        let level = level.clamp(0.0, 1.0);
        Color::new(level, level, level, 1.0)
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`, `rgba(r, g, b, a)`
    /// and a handful of CSS color names.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return Self::from_hex(hex);
        }
        let lower = text.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::from_css_args(args);
        }
        NAMED
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, color)| *color)
    }

    /// Build a color from an arbitrary value. Strings are parsed, lists are
    /// read as `[red, green, blue, alpha?]` channels, a single number is a
    /// gray level. Anything unparsable is black.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Color(c) => *c,
            Value::String(s) => Self::parse(s).unwrap_or(Self::BLACK),
            Value::Number(n) => Self::gray(*n),
            Value::List(items) => {
                let channel = |i: usize, default: f64| {
                    items
                        .get(i)
                        .map(Value::to_number)
                        .filter(|n| !n.is_nan())
                        .unwrap_or(default)
                        .clamp(0.0, 1.0)
                };
                Color::new(channel(0, 0.0), channel(1, 0.0), channel(2, 0.0), channel(3, 1.0))
            }
            Value::Null | Value::Bool(_) => Self::BLACK,
        }
    }

    /// CSS serialisation. `hex` forces `#rrggbb` (alpha dropped), otherwise
    /// `rgb(...)` or `rgba(...)` depending on alpha.
    pub fn to_css(&self, hex: bool) -> String {
        let [r, g, b] = [self.red, self.green, self.blue].map(to_byte);
        if hex {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else if self.alpha >= 1.0 {
            format!("rgb({r},{g},{b})")
        } else {
            format!("rgba({r},{g},{b},{})", self.alpha)
        }
    }

    fn from_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => Some(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => {
                let mut color = Self::rgb(byte(0)?, byte(2)?, byte(4)?);
                color.alpha = byte(6)? as f64 / 255.0;
                Some(color)
            }
            _ => None,
        }
    }

    fn from_css_args(args: &str) -> Option<Self> {
        let parts: Vec<f64> = args
            .split(',')
            .map(|p| p.trim().parse::<f64>().ok())
            .collect::<Option<_>>()?;
        match parts.as_slice() {
            [r, g, b] => Some(Color::new(*r / 255.0, *g / 255.0, *b / 255.0, 1.0)),
            [r, g, b, a] => Some(Color::new(*r / 255.0, *g / 255.0, *b / 255.0, *a)),
            _ => None,
        }
    }
}

fn to_byte(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::parse("#ff0000"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("#F00"), Some(Color::rgb(255, 0, 0)));
        let translucent = Color::parse("#00ff0080").unwrap();
        assert!((translucent.alpha - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(Color::parse("#12"), None);
        assert_eq!(Color::parse("#zzzzzz"), None);
    }

    #[test]
    fn test_parse_css_functions_and_names() {
        assert_eq!(Color::parse("rgb(0, 0, 255)"), Some(Color::rgb(0, 0, 255)));
        assert_eq!(
            Color::parse("rgba(255,255,255,0.5)"),
            Some(Color::new(1.0, 1.0, 1.0, 0.5))
        );
        assert_eq!(Color::parse("Orange"), Some(Color::rgb(255, 165, 0)));
        assert_eq!(Color::parse("not a color"), None);
    }

    #[test]
    fn test_to_css() {
        let color = Color::rgb(18, 52, 86);
        assert_eq!(color.to_css(true), "#123456");
        assert_eq!(color.to_css(false), "rgb(18,52,86)");
        assert_eq!(Color::new(1.0, 0.0, 0.0, 0.25).to_css(false), "rgba(255,0,0,0.25)");
    }

    #[test]
    fn test_from_value() {
        assert_eq!(Color::from_value(&Value::from("#ffffff")), Color::WHITE);
        assert_eq!(Color::from_value(&Value::from(vec![1.0, 0.0, 0.0])), Color::rgb(255, 0, 0));
        assert_eq!(Color::from_value(&Value::from(0.0)), Color::BLACK);
        assert_eq!(Color::from_value(&Value::Null), Color::BLACK);
    }
}
