//! Icon addressing layered over the container tree.
//!
//! An icon layer lives at
//!
//! ```text
//! {size}/{state}.{tone}/{scale}/{layer filename}
//! ```
//!
//! where the layer filename carries the rendering metadata (see [`layer`]).
//! The `universal` tone exists only while building: it is written out as a
//! real file under `light` plus a link under `dark` (see [`builder`]).

pub mod builder;
pub mod layer;

use std::fmt;
use std::str::FromStr;

use crate::error::{DciError, Result};

/// Placeholder for a state or tone that could not be recovered from a path.
pub const UNKNOWN: &str = "unknown";

// ── IconState ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IconState {
    Normal,
    Disabled,
    Hover,
    Pressed,
}

impl IconState {
    pub const ALL: [IconState; 4] =
        [IconState::Normal, IconState::Disabled, IconState::Hover, IconState::Pressed];

    pub fn as_str(self) -> &'static str {
        match self {
            IconState::Normal   => "normal",
            IconState::Disabled => "disabled",
            IconState::Hover    => "hover",
            IconState::Pressed  => "pressed",
        }
    }
}

impl FromStr for IconState {
    type Err = DciError;

    fn from_str(s: &str) -> Result<Self> {
        IconState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| DciError::InvalidState(s.to_owned()))
    }
}

impl fmt::Display for IconState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Tone ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tone {
    Light,
    Dark,
    /// Build-time only: one image shared by both concrete tones.
    Universal,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Light     => "light",
            Tone::Dark      => "dark",
            Tone::Universal => "universal",
        }
    }
}

impl FromStr for Tone {
    type Err = DciError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light"     => Ok(Tone::Light),
            "dark"      => Ok(Tone::Dark),
            "universal" => Ok(Tone::Universal),
            _           => Err(DciError::InvalidTone(s.to_owned())),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── ImageFormat ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Webp,
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Webp => "webp",
            ImageFormat::Png  => "png",
            ImageFormat::Jpg  => "jpg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = DciError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "webp" => Ok(ImageFormat::Webp),
            "png"  => Ok(ImageFormat::Png),
            "jpg"  => Ok(ImageFormat::Jpg),
            _      => Err(DciError::InvalidFormat(s.to_owned())),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ── Palette ──────────────────────────────────────────────────────────────────

/// Which theme color a layer is tinted with.  Stored as a small integer in
/// the layer filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Palette {
    #[default]
    None,
    Foreground,
    Background,
    HighlightForeground,
    Highlight,
    /// Any other integer found in a filename.  Never written.
    Unknown(i32),
}

impl Palette {
    pub fn from_i32(v: i32) -> Self {
        match v {
            -1 => Palette::None,
            0  => Palette::Foreground,
            1  => Palette::Background,
            2  => Palette::HighlightForeground,
            3  => Palette::Highlight,
            n  => Palette::Unknown(n),
        }
    }

    pub fn to_i32(self) -> i32 {
        match self {
            Palette::None                => -1,
            Palette::Foreground          => 0,
            Palette::Background          => 1,
            Palette::HighlightForeground => 2,
            Palette::Highlight           => 3,
            Palette::Unknown(n)          => n,
        }
    }

    /// Strict conversion used by builders.
    pub fn try_from_i32(v: i32) -> Result<Self> {
        match Palette::from_i32(v) {
            Palette::Unknown(n) => Err(DciError::InvalidPalette(n)),
            p                   => Ok(p),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Palette::None                => "none",
            Palette::Foreground          => "foreground",
            Palette::Background          => "background",
            Palette::HighlightForeground => "highlight_foreground",
            Palette::Highlight           => "highlight",
            Palette::Unknown(_)          => UNKNOWN,
        }
    }
}

// ── Directory names ──────────────────────────────────────────────────────────

/// Shortest decimal form of a scale factor: `1`, `1.25`, `2`.
pub fn format_scale(scale: f64) -> Result<String> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(DciError::InvalidScale(scale));
    }
    // f64's Display already prints the shortest round-tripping form and drops
    // a zero fraction.
    Ok(format!("{}", scale))
}

/// Lenient inverse of [`format_scale`]: anything unparsable reads as `1.0`.
pub fn parse_scale(s: &str) -> f64 {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(1.0)
}

pub fn state_tone_dir(state: IconState, tone: Tone) -> String {
    format!("{}.{}", state, tone)
}

/// Splits a `state.tone` directory name on its first dot.  Missing halves
/// come back as [`UNKNOWN`].
pub fn split_state_tone(name: &str) -> (String, String) {
    let (state, tone) = match name.split_once('.') {
        Some((state, tone)) => (state, tone),
        None                => (name, ""),
    };
    let or_unknown = |s: &str| if s.is_empty() { UNKNOWN.to_owned() } else { s.to_owned() };
    (or_unknown(state), or_unknown(tone))
}

/// The logical identity of an icon image, without its layer metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconKey {
    pub size:  u32,
    pub state: IconState,
    pub tone:  Tone,
    pub scale: f64,
}

impl IconKey {
    pub fn new(size: u32, state: IconState, tone: Tone, scale: f64) -> Self {
        Self { size, state, tone, scale }
    }

    /// `"{size}/{state}.{tone}/{scale}"`
    pub fn dir_path(&self) -> Result<String> {
        Ok(format!("{}/{}/{}", self.size, state_tone_dir(self.state, self.tone), format_scale(self.scale)?))
    }

    pub fn with_tone(self, tone: Tone) -> Self {
        Self { tone, ..self }
    }
}
