use tracing::warn;

use super::{ArchiveView, EntryMeta, ROOT};
use crate::entry::EntryKind;
use crate::icon::layer::{parse_layer_name, ParsedLayer};
use crate::icon::{parse_scale, split_state_tone};

/// One icon layer found in an archive.  Extraction is best-effort: fields
/// that cannot be read from the path take their defaults (size 0, scale 1.0,
/// state and tone `"unknown"`).
#[derive(Debug, Clone, PartialEq)]
pub struct IconImage<'a> {
    /// Directory holding the layer, e.g. `64/normal.dark/2`.
    pub dir:         String,
    pub filename:    String,
    /// Pixel size from the first path segment.  Anything that is not an
    /// unsigned integer, negative sizes included, reads as 0.
    pub size:        u32,
    pub state:       String,
    pub tone:        String,
    pub scale:       f64,
    pub layer:       ParsedLayer,
    /// `File` for stored images, `Link` for ones reached through a link.
    pub kind:        EntryKind,
    /// The link's own target text when `kind` is `Link`.
    pub link_target: Option<String>,
    /// Encoded image bytes (webp/png/jpg), never decoded here.
    pub data:        &'a [u8],
}

impl IconImage<'_> {
    pub fn path(&self) -> String {
        format!("{}/{}", self.dir, self.filename)
    }

    pub fn byte_size(&self) -> usize {
        self.data.len()
    }
}

struct DirInfo {
    size:  u32,
    state: String,
    tone:  String,
    scale: f64,
}

/// Reads size, state, tone and scale from the first three segments of a
/// directory path.  `None` for paths with fewer segments.
fn dir_info(path: &str) -> Option<DirInfo> {
    let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segs.len() < 3 {
        return None;
    }
    let (state, tone) = split_state_tone(segs[1]);
    Some(DirInfo {
        size: segs[0].parse().unwrap_or(0),
        state,
        tone,
        scale: parse_scale(segs[2]),
    })
}

impl ArchiveView {
    /// Every stored icon layer.  Links are listed by
    /// [`resolved_icon_images`](Self::resolved_icon_images) instead.
    pub fn icon_images(&self) -> Vec<IconImage<'_>> {
        self.collect_images(false)
    }

    /// Like [`icon_images`](Self::icon_images), but link entries are
    /// included too, carrying the bytes of the file they point at.  Links
    /// that do not resolve to a file are skipped.
    pub fn resolved_icon_images(&self) -> Vec<IconImage<'_>> {
        self.collect_images(true)
    }

    fn collect_images(&self, follow_links: bool) -> Vec<IconImage<'_>> {
        let mut out = Vec::new();
        for (path, children) in self.tree() {
            if path == ROOT {
                continue;
            }
            let Some(info) = dir_info(path) else { continue };
            for child in children {
                let (data, link_target) = match child.kind {
                    EntryKind::File => (self.content(child), None),
                    EntryKind::Link if follow_links => match self.follow(child) {
                        Some(found) => found,
                        None        => continue,
                    },
                    _ => continue,
                };
                out.push(IconImage {
                    dir:         path.clone(),
                    filename:    child.name.clone(),
                    size:        info.size,
                    state:       info.state.clone(),
                    tone:        info.tone.clone(),
                    scale:       info.scale,
                    layer:       parse_layer_name(&child.name),
                    kind:        child.kind,
                    link_target,
                    data,
                });
            }
        }
        out
    }

    fn follow(&self, link: &EntryMeta) -> Option<(&[u8], Option<String>)> {
        let target = self.link_target(&link.path).ok()?.to_owned();
        match self.resolve(&link.path) {
            Ok(entry) if entry.kind == EntryKind::File => Some((self.content(entry), Some(target))),
            Ok(entry) => {
                warn!(link = %link.path, target = %entry.path, "link does not point at a file");
                None
            }
            Err(e) => {
                warn!(link = %link.path, error = %e, "unresolvable link");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::builder::{build_archive, LayerInput};
    use crate::icon::{IconState, ImageFormat, Palette, Tone};
    use crate::reader::ReadOptions;
    use crate::writer::ArchiveBuilder;

    #[test]
    fn scenario_layer_lands_where_expected() {
        let input = LayerInput::new(b"webp-bytes".to_vec(), 64, IconState::Normal, Tone::Dark, 2.0, ImageFormat::Webp);
        let view = ArchiveView::parse(build_archive(&[input]).unwrap(), ReadOptions::default()).unwrap();
        let images = view.icon_images();
        assert_eq!(images.len(), 1);
        let img = &images[0];
        assert_eq!(img.dir, "64/normal.dark/2");
        assert_eq!(img.path(), "64/normal.dark/2/1.0p.-1.0_0_0_0_0_0_0.webp");
        assert_eq!(img.filename, "1.0p.-1.0_0_0_0_0_0_0.webp");
        assert_eq!((img.size, img.state.as_str(), img.tone.as_str(), img.scale), (64, "normal", "dark", 2.0));
        assert_eq!(img.layer.format, "webp");
        assert_eq!(img.layer.meta.palette, Palette::None);
        assert_eq!(img.data, b"webp-bytes");
        assert_eq!(img.byte_size(), 10);
    }

    #[test]
    fn universal_layer_needs_link_resolution_for_dark() {
        let input = LayerInput::new(b"px".to_vec(), 32, IconState::Hover, Tone::Universal, 1.0, ImageFormat::Png);
        let view = ArchiveView::parse(build_archive(&[input]).unwrap(), ReadOptions::default()).unwrap();

        let stored = view.icon_images();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].tone, "light");

        let all = view.resolved_icon_images();
        assert_eq!(all.len(), 2);
        let dark = all.iter().find(|i| i.tone == "dark").unwrap();
        assert_eq!(dark.kind, EntryKind::Link);
        assert_eq!(dark.data, b"px");
        assert_eq!(dark.link_target.as_deref(), Some("../../hover.light/1/1.0p.-1.0_0_0_0_0_0_0.png"));
    }

    #[test]
    fn odd_paths_take_defaults() {
        let mut b = ArchiveBuilder::new();
        b.write_file("big/hover/x/1.webp", b"a".to_vec()).unwrap();
        b.write_file("16/normal.light/file-at-depth-2-is-ignored", vec![]).unwrap();
        b.write_file("16/normal.light/1/2/deeper.png", b"b".to_vec()).unwrap();
        let view = ArchiveView::parse(b.to_bytes().unwrap(), ReadOptions::default()).unwrap();
        let images = view.icon_images();
        assert_eq!(images.len(), 2);

        let deeper = images.iter().find(|i| i.filename == "deeper.png").unwrap();
        assert_eq!((deeper.size, deeper.scale), (16, 1.0));

        let odd = images.iter().find(|i| i.filename == "1.webp").unwrap();
        assert_eq!(odd.size, 0);
        assert_eq!(odd.state, "hover");
        assert_eq!(odd.tone, "unknown");
        assert_eq!(odd.scale, 1.0);
        assert_eq!(odd.layer.meta.priority, 1);
    }

    #[test]
    fn dangling_links_are_skipped() {
        let mut b = ArchiveBuilder::new();
        b.link("../../normal.light/1/missing.webp", "16/normal.dark/1/missing.webp").unwrap();
        let view = ArchiveView::parse(b.to_bytes().unwrap(), ReadOptions::default()).unwrap();
        assert!(view.icon_images().is_empty());
        assert!(view.resolved_icon_images().is_empty());
    }
}
