//! The three firmware line patterns the interceptor reacts to.
//!
//! This is not a G-code parser: markers are plain substring checks and the
//! temperature echo is one regex.

use std::sync::LazyLock;

use regex::Regex;

/// Filament load command.
pub const LOAD_MARKER: &str = "M701";
/// Filament unload command.
pub const UNLOAD_MARKER: &str = "M702";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Load,
    Unload,
    None,
}

/// Load wins if a line somehow carries both markers.
pub fn marker(line: &str) -> Marker {
    if line.contains(LOAD_MARKER) {
        Marker::Load
    } else if line.contains(UNLOAD_MARKER) {
        Marker::Unload
    } else {
        Marker::None
    }
}

/// `T:<current> /<target>` as reported by the firmware (hotend only).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureEcho {
    pub current_c: f32,
    pub target_c: f32,
}

static TEMP_ECHO: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)T\d*:\s*(-?\d+(?:\.\d+)?)\s*/\s*(-?\d+(?:\.\d+)?)").ok()
});

/// First hotend temperature pair on the line, if any.
pub fn parse_temperature(line: &str) -> Option<TemperatureEcho> {
    let re = TEMP_ECHO.as_ref()?;
    let caps = re.captures(line)?;
    let current_c = caps.get(1)?.as_str().parse().ok()?;
    let target_c = caps.get(2)?.as_str().parse().ok()?;
    Some(TemperatureEcho {
        current_c,
        target_c,
    })
}
