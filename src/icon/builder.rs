//! Icon builder: turns logical layers into archive paths.
//!
//! A layer added under [`Tone::Universal`] is stored once, as a real file
//! under `light`, and a link is placed at the matching `dark` position:
//!
//! ```text
//! 64/normal.light/2/1.0p.-1.0_0_0_0_0_0_0.webp   file
//! 64/normal.dark/2/1.0p.-1.0_0_0_0_0_0_0.webp    link -> ../../normal.light/2/1.0p.-1.0_0_0_0_0_0_0.webp
//! ```
//!
//! The link target climbs exactly two levels (out of the scale directory and
//! the `state.tone` directory) so it also resolves if the archive is
//! unpacked onto a real filesystem.

use tracing::debug;

use super::layer::{parse_layer_name, Adjustments, LayerMeta};
use super::{format_scale, state_tone_dir, IconKey, IconState, ImageFormat, Palette, Tone};
use crate::error::{DciError, Result};
use crate::writer::ArchiveBuilder;

/// One layer as handed over by an image pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInput {
    pub image:       Vec<u8>,
    pub size:        u32,
    pub state:       IconState,
    pub tone:        Tone,
    pub scale:       f64,
    pub format:      ImageFormat,
    pub priority:    i32,
    pub padding:     i32,
    /// Raw palette number, `-1..=3`.
    pub palette:     i32,
    pub adjustments: Adjustments,
    pub alpha8:      bool,
}

impl LayerInput {
    /// A layer with default metadata: priority 1, no padding, no palette,
    /// no adjustments.
    pub fn new(image: Vec<u8>, size: u32, state: IconState, tone: Tone, scale: f64, format: ImageFormat) -> Self {
        let meta = LayerMeta::default();
        Self {
            image,
            size,
            state,
            tone,
            scale,
            format,
            priority:    meta.priority,
            padding:     meta.padding,
            palette:     meta.palette.to_i32(),
            adjustments: meta.adjustments,
            alpha8:      meta.alpha8,
        }
    }

    pub fn key(&self) -> IconKey {
        IconKey::new(self.size, self.state, self.tone, self.scale)
    }

    pub fn meta(&self) -> Result<LayerMeta> {
        Ok(LayerMeta {
            priority:    self.priority,
            padding:     self.padding,
            palette:     Palette::try_from_i32(self.palette)?,
            adjustments: self.adjustments,
            alpha8:      self.alpha8,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct IconBuilder {
    tree:   ArchiveBuilder,
    layers: usize,
}

impl IconBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers added, counting a universal layer once.
    pub fn layer_count(&self) -> usize {
        self.layers
    }

    /// Adds one layer.  Every name is validated before the tree is touched,
    /// so a failed call leaves the builder unchanged.  Priorities start at 1.
    pub fn add_layer(&mut self, image: Vec<u8>, key: IconKey, format: ImageFormat, meta: &LayerMeta) -> Result<()> {
        if meta.priority < 1 {
            return Err(DciError::InvalidPriority(meta.priority));
        }
        let filename = meta.filename(format);
        match key.tone {
            Tone::Universal => {
                let light = format!("{}/{}", key.with_tone(Tone::Light).dir_path()?, filename);
                let dark = format!("{}/{}", key.with_tone(Tone::Dark).dir_path()?, filename);
                let target = format!("../../{}/{}/{}",
                                     state_tone_dir(key.state, Tone::Light),
                                     format_scale(key.scale)?,
                                     filename);
                self.tree.check_vacant(&light)?;
                self.tree.check_vacant(&dark)?;
                self.tree.write_file(&light, image)?;
                self.tree.link(&target, &dark)?;
                debug!(path = %light, link = %dark, "added universal layer");
            }
            _ => {
                let path = format!("{}/{}", key.dir_path()?, filename);
                self.tree.write_file(&path, image)?;
                debug!(path = %path, "added layer");
            }
        }
        self.layers += 1;
        Ok(())
    }

    pub fn add(&mut self, input: LayerInput) -> Result<()> {
        let meta = input.meta()?;
        let key = input.key();
        self.add_layer(input.image, key, input.format, &meta)
    }

    pub fn tree(&self) -> &ArchiveBuilder {
        &self.tree
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.tree.to_bytes()
    }
}

/// Parses a layer address of the form
/// `{size}/{state}.{tone}/{scale}/{layer filename}`, the same shape the
/// layer takes inside an archive.  Unlike reading, every field is checked:
/// unknown states, tones, formats and palettes are errors.
pub fn parse_layer_spec(spec: &str) -> Result<(IconKey, ImageFormat, LayerMeta)> {
    let bad = || DciError::InvalidLayerPath(spec.to_owned());
    let segs: Vec<&str> = spec.trim_matches('/').split('/').collect();
    let [size, state_tone, scale, filename] = segs[..] else {
        return Err(bad());
    };
    let size: u32 = size.parse().map_err(|_| bad())?;
    let (state, tone) = state_tone.split_once('.').ok_or_else(bad)?;
    let scale: f64 = scale.parse().map_err(|_| bad())?;
    format_scale(scale)?;

    let parsed = parse_layer_name(filename);
    let format: ImageFormat = parsed.format.parse()?;
    Palette::try_from_i32(parsed.meta.palette.to_i32())?;

    Ok((IconKey::new(size, state.parse()?, tone.parse()?, scale), format, parsed.meta))
}

/// Builds a complete archive from a list of layers.  The first invalid layer
/// aborts the build.
pub fn build_archive(layers: &[LayerInput]) -> Result<Vec<u8>> {
    let mut builder = IconBuilder::new();
    for layer in layers {
        builder.add(layer.clone())?;
    }
    builder.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(tone: Tone) -> LayerInput {
        LayerInput::new(b"img".to_vec(), 64, IconState::Normal, tone, 2.0, ImageFormat::Webp)
    }

    #[test]
    fn concrete_tone_path() {
        let mut b = IconBuilder::new();
        b.add(layer(Tone::Dark)).unwrap();
        assert!(b.tree().contains("64/normal.dark/2/1.0p.-1.0_0_0_0_0_0_0.webp"));
        assert!(!b.tree().contains("64/normal.light"));
    }

    #[test]
    fn universal_tone_writes_file_and_link() {
        let mut b = IconBuilder::new();
        b.add(layer(Tone::Universal)).unwrap();
        assert_eq!(b.layer_count(), 1);
        let tree = b.tree();
        assert!(tree.contains("64/normal.light/2/1.0p.-1.0_0_0_0_0_0_0.webp"));
        assert!(tree.contains("64/normal.dark/2/1.0p.-1.0_0_0_0_0_0_0.webp"));
        assert!(!tree.contains("64/normal.universal"));
    }

    #[test]
    fn universal_conflict_leaves_builder_untouched() {
        let mut b = IconBuilder::new();
        b.add(layer(Tone::Dark)).unwrap();
        let err = b.add(layer(Tone::Universal)).unwrap_err();
        assert!(matches!(err, DciError::AlreadyExists(_)));
        assert!(!b.tree().contains("64/normal.light"));
        assert_eq!(b.layer_count(), 1);
    }

    #[test]
    fn invalid_palette_is_rejected() {
        let mut input = layer(Tone::Light);
        input.palette = 5;
        assert!(matches!(build_archive(&[input]), Err(DciError::InvalidPalette(5))));
    }

    #[test]
    fn layer_spec_round_trips_through_the_builder() {
        let (key, format, meta) = parse_layer_spec("48/disabled.universal/1.5/2.3p.0.5_0_0_0_0_0_-5.png.alpha8").unwrap();
        assert_eq!(key, IconKey::new(48, IconState::Disabled, Tone::Universal, 1.5));
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(meta.priority, 2);
        assert_eq!(meta.padding, 3);
        assert_eq!(meta.palette, Palette::Foreground);
        assert_eq!(meta.adjustments.alpha, -5);
        assert!(meta.alpha8);
        assert_eq!(meta.filename(format), "2.3p.0.5_0_0_0_0_0_-5.png.alpha8");
    }

    #[test]
    fn layer_spec_errors() {
        assert!(matches!(parse_layer_spec("48/normal.light/1"), Err(DciError::InvalidLayerPath(_))));
        assert!(matches!(parse_layer_spec("x/normal.light/1/1.webp"), Err(DciError::InvalidLayerPath(_))));
        assert!(matches!(parse_layer_spec("48/normal/1/1.webp"), Err(DciError::InvalidLayerPath(_))));
        assert!(matches!(parse_layer_spec("48/busy.light/1/1.webp"), Err(DciError::InvalidState(_))));
        assert!(matches!(parse_layer_spec("48/normal.grey/1/1.webp"), Err(DciError::InvalidTone(_))));
        assert!(matches!(parse_layer_spec("48/normal.light/1/1.gif"), Err(DciError::InvalidFormat(_))));
        assert!(matches!(parse_layer_spec("48/normal.light/0/1.webp"), Err(DciError::InvalidScale(_))));
        assert!(matches!(parse_layer_spec("48/normal.light/1/1.0p.8.0_0_0_0_0_0_0.webp"), Err(DciError::InvalidPalette(8))));
    }

    #[test]
    fn priority_below_one_is_rejected() {
        for priority in [0, -3] {
            let mut input = layer(Tone::Universal);
            input.priority = priority;
            assert!(matches!(build_archive(&[input]), Err(DciError::InvalidPriority(p)) if p == priority));
        }
        let mut b = IconBuilder::new();
        let (key, format, meta) = parse_layer_spec("16/normal.light/1/0.0p.-1.0_0_0_0_0_0_0.png").unwrap();
        assert!(matches!(b.add_layer(vec![], key, format, &meta), Err(DciError::InvalidPriority(0))));
        assert!(b.tree().is_empty());
    }

    #[test]
    fn invalid_scale_is_rejected() {
        let mut input = layer(Tone::Light);
        input.scale = -1.0;
        assert!(matches!(build_archive(&[input]), Err(DciError::InvalidScale(_))));
    }
}
