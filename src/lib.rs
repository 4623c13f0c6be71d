//! Reader and builder for DCI combined-icon archives.
//!
//! ```text
//! Archive := "DCI\0" VERSION(1) COUNT(3, u24 LE) Entry*
//! Entry   := KIND(1) NAME(63, utf8 + NUL) LEN(8, u64 LE) CONTENT(LEN)
//! ```
//!
//! Directories hold their children as a header-less run of entries, and
//! icon layers are addressed as `size/state.tone/scale/layer-filename`.

pub mod error;
pub mod header;
pub mod entry;
pub mod natsort;
pub mod writer;
pub mod reader;
pub mod icon;
pub mod index;
pub mod archive;

pub use error::{DciError, Result};
pub use entry::EntryKind;
pub use writer::ArchiveBuilder;
pub use reader::{ArchiveView, EntryMeta, IconImage, ReadOptions};
pub use icon::builder::{build_archive, IconBuilder, LayerInput};
pub use archive::{parse_archive, Archive};
pub use index::{IconImageRecord, IconIndex};
