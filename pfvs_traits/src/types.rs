//! Plain data shared across the capability boundary.

use std::fmt;

/// Channels delivered by the triad spectrometer (3 devices x 6 channels).
pub const SPECTRAL_CHANNELS: usize = 18;
/// Independent illumination banks, one per spectrometer device.
pub const LED_BANKS: u8 = 3;

/// Raw color sensor counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgbc {
    pub r: u16,
    pub g: u16,
    pub b: u16,
    pub clear: u16,
}

impl Rgbc {
    pub const fn new(r: u16, g: u16, b: u16, clear: u16) -> Self {
        Self { r, g, b, clear }
    }
}

/// Coarse filament color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorLabel {
    R,
    G,
    B,
    W,
    K,
    Unknown,
}

impl ColorLabel {
    /// Single-character code used by the classifier feature encoding.
    pub const fn code(self) -> char {
        match self {
            ColorLabel::R => 'R',
            ColorLabel::G => 'G',
            ColorLabel::B => 'B',
            ColorLabel::W => 'W',
            ColorLabel::K => 'K',
            ColorLabel::Unknown => 'U',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'R' => Some(ColorLabel::R),
            'G' => Some(ColorLabel::G),
            'B' => Some(ColorLabel::B),
            'W' => Some(ColorLabel::W),
            'K' => Some(ColorLabel::K),
            'U' => Some(ColorLabel::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorLabel::Unknown => f.write_str("Unknown"),
            other => write!(f, "{}", other.code()),
        }
    }
}

/// Label string exactly as returned by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterialLabel(pub String);

impl MaterialLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaterialLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MaterialLabel {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Actual/target pair for one heater as reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolTemperature {
    pub tool: String,
    pub actual: f32,
    pub target: f32,
}
