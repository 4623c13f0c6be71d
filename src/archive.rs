//! High-level [`Archive`] API — the primary embedding surface.
//!
//! ```no_run
//! use dci::archive::{build_archive, Archive};
//! use dci::icon::builder::LayerInput;
//! use dci::icon::{IconState, ImageFormat, Tone};
//!
//! // Write
//! let layer = LayerInput::new(std::fs::read("icon.webp")?, 64, IconState::Normal,
//!                             Tone::Universal, 2.0, ImageFormat::Webp);
//! dci::archive::write_archive("out.dci", &build_archive(&[layer])?)?;
//!
//! // Read
//! let ar = Archive::open("out.dci")?;
//! for image in ar.view().icon_images() {
//!     println!("{} ({} bytes)", image.path(), image.byte_size());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::entry::EntryKind;
use crate::error::{DciError, Result};
use crate::reader::{parent_path, ArchiveView, ReadOptions};
use crate::writer::ArchiveBuilder;

pub use crate::icon::builder::build_archive;

/// Parses an in-memory archive with default [`ReadOptions`].
pub fn parse_archive(bytes: impl Into<Vec<u8>>) -> Result<ArchiveView> {
    ArchiveView::parse(bytes.into(), ReadOptions::default())
}

pub fn write_archive<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)?;
    Ok(())
}

// ── Archive ───────────────────────────────────────────────────────────────────

/// An archive read from disk.
pub struct Archive {
    path: PathBuf,
    view: ArchiveView,
}

impl Archive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ReadOptions::default())
    }

    /// Reads the whole file, refusing anything larger than
    /// `options.max_archive_size`.
    pub fn open_with<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let len = fs::metadata(&path)?.len();
        if len > options.max_archive_size {
            return Err(DciError::DeclaredSizeExceedsBuffer { declared: len, limit: options.max_archive_size });
        }
        let view = ArchiveView::parse(fs::read(&path)?, options)?;
        Ok(Self { path, view })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn view(&self) -> &ArchiveView {
        &self.view
    }

    pub fn into_view(self) -> ArchiveView {
        self.view
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(blake3::hash(self.view.as_bytes()).as_bytes())
    }

    /// Extract every entry into `dest`, creating it if necessary.
    pub fn extract_all<P: AsRef<Path>>(&self, dest: P) -> Result<usize> {
        extract_all(&self.view, dest)
    }
}

// ── Directory ↔ archive ──────────────────────────────────────────────────────

fn utf8_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or(DciError::InvalidEncoding)
}

/// Builds an archive tree mirroring `dir`: regular files become files,
/// directories become directories and symlinks become links carrying their
/// textual target.
pub fn pack_dir<P: AsRef<Path>>(dir: P) -> Result<ArchiveBuilder> {
    let mut builder = ArchiveBuilder::new();
    let mut stack: Vec<(PathBuf, String)> = vec![(dir.as_ref().to_owned(), String::new())];

    while let Some((fs_dir, prefix)) = stack.pop() {
        let mut items = fs::read_dir(&fs_dir)?.collect::<std::io::Result<Vec<_>>>()?;
        items.sort_by_key(|e| e.file_name());
        for item in items {
            let fs_path = item.path();
            let name = utf8_name(&fs_path)?;
            let path = if prefix.is_empty() { name } else { format!("{}/{}", prefix, name) };
            let file_type = fs::symlink_metadata(&fs_path)?.file_type();
            if file_type.is_symlink() {
                let target = fs::read_link(&fs_path)?;
                let target = target.to_str().ok_or(DciError::InvalidEncoding)?;
                builder.link(target, &path)?;
            } else if file_type.is_dir() {
                builder.mkdir(&path)?;
                stack.push((fs_path, path));
            } else {
                builder.write_file(&path, fs::read(&fs_path)?)?;
            }
        }
    }
    debug!(dir = %dir.as_ref().display(), top_level = builder.len(), "packed directory");
    Ok(builder)
}

/// Writes every entry of `view` below `dest` and returns the number written.
///
/// Directories and files are written first and links last, so nothing is
/// ever written through a link created by the same extraction.  Entries are
/// skipped with a warning when their name has an empty, `.` or `..` segment,
/// when any path component below `dest` is already a symlink, or when they
/// would overwrite something that exists.  Links are only created when their
/// target is relative and stays inside `dest`.  On Unix links become
/// symlinks; elsewhere they become copies of their resolved target.
pub fn extract_all<P: AsRef<Path>>(view: &ArchiveView, dest: P) -> Result<usize> {
    let dest = dest.as_ref();
    fs::create_dir_all(dest)?;
    let entries = view.walk();
    let mut written = 0;

    for entry in entries.iter().filter(|e| e.kind != EntryKind::Link) {
        let Some(out) = safe_output_path(dest, &entry.path) else { continue };
        if !out.parent().map_or(false, Path::is_dir) || (out.exists() && !(entry.is_dir() && out.is_dir())) {
            warn!(path = %entry.path, "skipping entry that clashes with an existing path");
            continue;
        }
        match entry.kind {
            EntryKind::Directory if out.is_dir() => {}
            EntryKind::Directory => fs::create_dir(&out)?,
            EntryKind::File      => fs::write(&out, view.content(entry))?,
            _                    => continue,
        }
        written += 1;
    }

    for entry in entries.iter().filter(|e| e.kind == EntryKind::Link) {
        let Some(out) = safe_output_path(dest, &entry.path) else { continue };
        let target = match view.link_target(&entry.path) {
            Ok(t) if link_stays_inside(parent_path(&entry.path), t) => t,
            _ => {
                warn!(path = %entry.path, "skipping link that points outside the destination");
                continue;
            }
        };
        if !out.parent().map_or(false, Path::is_dir) || fs::symlink_metadata(&out).is_ok() {
            warn!(path = %entry.path, link = %target, "skipping entry that clashes with an existing path");
            continue;
        }
        write_link(view, &entry.path, &out)?;
        written += 1;
    }

    debug!(dest = %dest.display(), written, "extracted archive");
    Ok(written)
}

/// `dest` joined with `path`, or `None` when the name is unsafe or a
/// component on the way is a symlink.
fn safe_output_path(dest: &Path, path: &str) -> Option<PathBuf> {
    if path.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
        warn!(path, "skipping entry with unsafe name");
        return None;
    }
    let mut out = dest.to_owned();
    for seg in path.split('/') {
        out.push(seg);
        if fs::symlink_metadata(&out).map_or(false, |m| m.file_type().is_symlink()) {
            warn!(path, through = %out.display(), "skipping entry below a symlink");
            return None;
        }
    }
    Some(out)
}

/// Whether `target`, taken relative to the directory `parent`, stays at or
/// below the root.
fn link_stays_inside(parent: &str, target: &str) -> bool {
    if target.starts_with('/') || target.starts_with('\\') || Path::new(target).is_absolute() {
        return false;
    }
    let mut depth = parent.split('/').filter(|s| !s.is_empty()).count();
    for seg in target.split(['/', '\\']) {
        match seg {
            "" | "." => {}
            ".."     => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _        => depth += 1,
        }
    }
    true
}

#[cfg(unix)]
fn write_link(view: &ArchiveView, path: &str, out: &Path) -> Result<()> {
    std::os::unix::fs::symlink(view.link_target(path)?, out)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_link(view: &ArchiveView, path: &str, out: &Path) -> Result<()> {
    fs::write(out, view.read_file(path)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_targets_must_stay_below_the_root() {
        assert!(link_stays_inside("24/normal.dark/1", "../../normal.light/1/1.webp"));
        assert!(link_stays_inside("a", "../b"));
        assert!(link_stays_inside("", "./a/./b"));
        assert!(!link_stays_inside("a", "../../b"));
        assert!(!link_stays_inside("", ".."));
        assert!(!link_stays_inside("a/b", "c/../../../../etc/passwd"));
        assert!(!link_stays_inside("a", "/etc"));
        assert!(!link_stays_inside("a", "..\\..\\b"));
    }
}
