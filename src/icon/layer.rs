//! Layer filenames.
//!
//! ```text
//! {priority}.{padding}p.{palette}.{hue}_{saturation}_{brightness}_{red}_{green}_{blue}_{alpha}.{format}[.alpha8]
//! ```
//!
//! Older producers wrote the seven adjustments as separate dot segments
//! (eleven segments in total, unsigned values).  Both shapes are read; only
//! the underscore-packed shape is written.

use serde::{Deserialize, Serialize};

use super::{ImageFormat, Palette};

pub const ALPHA8_SUFFIX: &str = "alpha8";

/// Segment count of the older, dot-separated filename shape.
const LEGACY_SEGMENTS: usize = 11;
/// Minimum segment count of the underscore-packed shape.
const PACKED_SEGMENTS: usize = 5;

/// Color adjustments, each conventionally within `-100..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Adjustments {
    pub hue:        i32,
    pub saturation: i32,
    pub brightness: i32,
    pub red:        i32,
    pub green:      i32,
    pub blue:       i32,
    pub alpha:      i32,
}

impl Adjustments {
    fn from_values<I: IntoIterator<Item = i32>>(values: I) -> Self {
        let mut v = [0i32; 7];
        for (slot, value) in v.iter_mut().zip(values) {
            *slot = value;
        }
        let [hue, saturation, brightness, red, green, blue, alpha] = v;
        Self { hue, saturation, brightness, red, green, blue, alpha }
    }

    fn packed(&self) -> String {
        format!("{}_{}_{}_{}_{}_{}_{}",
                self.hue, self.saturation, self.brightness,
                self.red, self.green, self.blue, self.alpha)
    }
}

/// Rendering metadata of one layer, minus its image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMeta {
    /// Paint order; lower paints first.  Builders require at least 1;
    /// parsed filenames keep whatever they carry.
    pub priority:    i32,
    /// Outer margin in pixels.
    pub padding:     i32,
    pub palette:     Palette,
    pub adjustments: Adjustments,
    /// The image carries only a coverage channel.
    pub alpha8:      bool,
}

impl Default for LayerMeta {
    fn default() -> Self {
        Self {
            priority:    1,
            padding:     0,
            palette:     Palette::None,
            adjustments: Adjustments::default(),
            alpha8:      false,
        }
    }
}

impl LayerMeta {
    pub fn filename(&self, format: ImageFormat) -> String {
        let mut name = format!("{}.{}p.{}.{}.{}",
                               self.priority,
                               self.padding,
                               self.palette.to_i32(),
                               self.adjustments.packed(),
                               format.extension());
        if self.alpha8 {
            name.push('.');
            name.push_str(ALPHA8_SUFFIX);
        }
        name
    }
}

/// A layer filename taken apart.  `format` is kept verbatim since readers
/// accept whatever extension a producer wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLayer {
    pub meta:   LayerMeta,
    pub format: String,
}

fn int_or(s: &str, default: i32) -> i32 {
    s.parse().unwrap_or(default)
}

/// Parses a layer filename.  Never fails: every field that cannot be read
/// keeps its default.
pub fn parse_layer_name(filename: &str) -> ParsedLayer {
    let mut segs: Vec<&str> = filename.split('.').collect();
    let mut meta = LayerMeta::default();

    if segs.len() > 1 && segs.last() == Some(&ALPHA8_SUFFIX) {
        segs.pop();
        meta.alpha8 = true;
    }
    let format = segs.last().copied().unwrap_or_default().to_owned();

    if segs.len() >= PACKED_SEGMENTS {
        meta.priority = int_or(segs[0], 1);
        meta.padding = int_or(segs[1].strip_suffix('p').unwrap_or(segs[1]), 0);
        meta.palette = Palette::from_i32(int_or(segs[2], -1));
        meta.adjustments = if segs.len() == LEGACY_SEGMENTS {
            Adjustments::from_values(segs[3..10].iter().map(|s| int_or(s, 0)))
        } else {
            Adjustments::from_values(segs[3].split('_').map(|s| int_or(s, 0)))
        };
    } else if segs.len() >= 2 {
        meta.priority = int_or(segs[0], 1);
    }

    ParsedLayer { meta, format }
}
