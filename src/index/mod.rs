use serde::{Deserialize, Serialize};

use crate::icon::layer::Adjustments;
use crate::reader::{ArchiveView, IconImage};

/// Serializable description of one icon layer.  Carries a BLAKE3 digest of
/// the image instead of the bytes themselves.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IconImageRecord {
    pub path:         String,
    pub filename:     String,
    pub size:         u32,
    pub state:        String,
    pub tone:         String,
    pub scale:        f64,
    pub format:       String,
    pub priority:     i32,
    pub padding:      i32,
    pub palette:      i32,
    pub palette_name: String,
    #[serde(flatten)]
    pub adjustments:  Adjustments,
    #[serde(default)]
    pub alpha8:       bool,
    /// Present when the layer was reached through a link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target:  Option<String>,
    pub byte_size:    u64,
    pub blake3:       String,
}

impl From<&IconImage<'_>> for IconImageRecord {
    fn from(img: &IconImage<'_>) -> Self {
        let meta = &img.layer.meta;
        IconImageRecord {
            path:         img.path(),
            filename:     img.filename.clone(),
            size:         img.size,
            state:        img.state.clone(),
            tone:         img.tone.clone(),
            scale:        img.scale,
            format:       img.layer.format.clone(),
            priority:     meta.priority,
            padding:      meta.padding,
            palette:      meta.palette.to_i32(),
            palette_name: meta.palette.name().to_owned(),
            adjustments:  meta.adjustments,
            alpha8:       meta.alpha8,
            link_target:  img.link_target.clone(),
            byte_size:    img.byte_size() as u64,
            blake3:       hex::encode(blake3::hash(img.data).as_bytes()),
        }
    }
}

/// Manifest of every icon layer in an archive.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct IconIndex {
    pub records: Vec<IconImageRecord>,
    /// BLAKE3 of the complete archive.
    pub archive_blake3: String,
}

impl IconIndex {
    pub fn from_view(view: &ArchiveView, resolve_links: bool) -> Self {
        let images = if resolve_links { view.resolved_icon_images() } else { view.icon_images() };
        IconIndex {
            records:        images.iter().map(IconImageRecord::from).collect(),
            archive_blake3: hex::encode(blake3::hash(view.as_bytes()).as_bytes()),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
