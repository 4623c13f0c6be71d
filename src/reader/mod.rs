//! Archive reader.
//!
//! # Parsing
//! [`ArchiveView::parse`] takes ownership of the whole archive buffer.  The
//! header and the top-level entries are decoded strictly: any failure aborts
//! the read and no partial view is returned.
//!
//! Directory contents are then decoded in a second pass, iteratively with an
//! explicit work list.  That pass is best-effort: when a directory's content
//! is truncated or malformed partway through, the children decoded before
//! the bad byte are kept and the rest of that directory is dropped with a
//! warning.  Directories nested deeper than [`ReadOptions::max_depth`] are
//! kept as entries but not descended into.
//!
//! # Storage
//! Entries never copy their content.  Each [`EntryMeta`] holds a byte range
//! into the single buffer owned by the view.
//!
//! # Paths
//! Entry paths are root-relative: `64`, `64/normal.dark`,
//! `64/normal.dark/2/1.0p.-1.0_0_0_0_0_0_0.webp`.  The root itself is the
//! empty path.  Lookups also accept a leading `/`.  Links store a textual
//! target relative to the directory that holds them and are resolved by
//! walking the parsed tree; the filesystem is never consulted.

mod images;

pub use images::IconImage;

use std::collections::BTreeMap;
use std::io::Cursor;
use std::ops::Range;

use tracing::{debug, warn};

use crate::entry::{decode_entry, decode_entry_list, EntryKind, ENTRY_HEADER_SIZE};
use crate::error::{DciError, Result};
use crate::header::{remaining, Header};

/// Default recursion bound for nested directories.
pub const DEFAULT_MAX_DEPTH: usize = 64;
/// Default upper bound for archives read from disk: 256 MiB.
pub const DEFAULT_MAX_ARCHIVE_SIZE: u64 = 256 * 1024 * 1024;
/// Default number of links followed before giving up.
pub const DEFAULT_MAX_LINK_HOPS: usize = 8;

/// Path of the archive root.
pub const ROOT: &str = "";

// ── ReadOptions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Directories nested deeper than this are not descended into.
    pub max_depth:        usize,
    /// Largest archive accepted from disk.
    pub max_archive_size: u64,
    /// Links followed by one resolution before failing with `LinkLoop`.
    pub max_link_hops:    usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_depth:        DEFAULT_MAX_DEPTH,
            max_archive_size: DEFAULT_MAX_ARCHIVE_SIZE,
            max_link_hops:    DEFAULT_MAX_LINK_HOPS,
        }
    }
}

// ── EntryMeta ────────────────────────────────────────────────────────────────

/// One entry of the parsed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub kind:  EntryKind,
    pub name:  String,
    /// Root-relative path of the entry itself.
    pub path:  String,
    /// Content location within the archive buffer.
    pub range: Range<usize>,
}

impl EntryMeta {
    pub fn size(&self) -> u64 {
        self.range.len() as u64
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

pub fn join_path(parent: &str, name: &str) -> String {
    if parent == ROOT {
        name.to_owned()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent directory of a root-relative path ([`ROOT`] for top-level
/// entries).
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None    => ROOT,
    }
}

/// Collapses `.`, `..`, leading, repeated and trailing slashes into a
/// root-relative path.  `..` never climbs above the root.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".."     => { parts.pop(); }
            seg      => parts.push(seg),
        }
    }
    parts.join("/")
}

// ── ArchiveView ──────────────────────────────────────────────────────────────

/// A fully parsed archive.
#[derive(Debug, Clone)]
pub struct ArchiveView {
    data:    Vec<u8>,
    header:  Header,
    /// Directory path → children in archive order.  The root is keyed `""`.
    dirs:    BTreeMap<String, Vec<EntryMeta>>,
    options: ReadOptions,
}

impl ArchiveView {
    pub fn parse(data: Vec<u8>, options: ReadOptions) -> Result<Self> {
        let (header, top) = parse_top_level(&data)?;

        let mut dirs: BTreeMap<String, Vec<EntryMeta>> = BTreeMap::new();
        let mut pending: Vec<(String, Range<usize>, usize)> = top
            .iter()
            .filter(|e| e.is_dir())
            .map(|e| (e.path.clone(), e.range.clone(), 1))
            .collect();
        dirs.insert(ROOT.to_owned(), top);

        while let Some((path, range, depth)) = pending.pop() {
            if depth > options.max_depth {
                warn!(path = %path, max_depth = options.max_depth, "directory nesting too deep; not descending");
                continue;
            }
            let (raw, err) = decode_entry_list(&data[range.clone()]);
            if let Some(e) = err {
                warn!(path = %path, kept = raw.len(), error = %e, "directory content malformed; keeping decoded children");
            }
            let children: Vec<EntryMeta> = raw
                .into_iter()
                .map(|r| {
                    let start = range.start + r.content_offset;
                    EntryMeta {
                        kind:  r.kind,
                        path:  join_path(&path, &r.name),
                        name:  r.name,
                        range: start..start + r.content.len(),
                    }
                })
                .collect();
            pending.extend(
                children
                    .iter()
                    .filter(|c| c.is_dir())
                    .map(|c| (c.path.clone(), c.range.clone(), depth + 1)),
            );
            // Repeated directory names merge rather than overwrite.
            dirs.entry(path).or_default().extend(children);
        }

        debug!(top_level = header.entry_count, directories = dirs.len(), bytes = data.len(), "parsed archive");
        Ok(Self { data, header, dirs, options })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn options(&self) -> ReadOptions {
        self.options
    }

    /// The raw archive bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Top-level entries in archive order.
    pub fn entries(&self) -> &[EntryMeta] {
        self.dirs.get(ROOT).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every parsed directory, keyed by root-relative path.
    pub fn tree(&self) -> &BTreeMap<String, Vec<EntryMeta>> {
        &self.dirs
    }

    pub fn content(&self, entry: &EntryMeta) -> &[u8] {
        &self.data[entry.range.clone()]
    }

    /// Children of the directory at `path`, or `None` if no such directory
    /// was parsed.
    pub fn children(&self, path: &str) -> Option<&[EntryMeta]> {
        self.dirs.get(&normalize_path(path)).map(Vec::as_slice)
    }

    /// Looks an entry up without following links.  With repeated names the
    /// first one in archive order wins.
    pub fn entry(&self, path: &str) -> Option<&EntryMeta> {
        let path = normalize_path(path);
        if path == ROOT {
            return None;
        }
        self.dirs
            .get(parent_path(&path))?
            .iter()
            .find(|e| e.path == path)
    }

    pub fn exists(&self, path: &str) -> bool {
        normalize_path(path) == ROOT || self.entry(path).is_some()
    }

    /// Total number of entries at every level.
    pub fn entry_count(&self) -> usize {
        self.dirs.values().map(Vec::len).sum()
    }

    /// The textual target stored in a link entry.
    pub fn link_target(&self, path: &str) -> Result<&str> {
        let entry = self.entry(path).ok_or_else(|| DciError::NotFound(path.to_owned()))?;
        if entry.kind != EntryKind::Link {
            return Err(DciError::NotFound(format!("{} (not a link)", path)));
        }
        std::str::from_utf8(self.content(entry)).map_err(|_| DciError::InvalidEncoding)
    }

    /// Follows links until a non-link entry is reached.  Targets are taken
    /// relative to the directory holding the link, or from the root when
    /// they start with `/`.
    pub fn resolve(&self, path: &str) -> Result<&EntryMeta> {
        let mut current = normalize_path(path);
        for _ in 0..=self.options.max_link_hops {
            let entry = self.entry(&current).ok_or_else(|| DciError::NotFound(current.clone()))?;
            if entry.kind != EntryKind::Link {
                return Ok(entry);
            }
            let target = std::str::from_utf8(self.content(entry)).map_err(|_| DciError::InvalidEncoding)?;
            current = if target.starts_with('/') {
                normalize_path(target)
            } else {
                normalize_path(&format!("{}/{}", parent_path(&entry.path), target))
            };
        }
        Err(DciError::LinkLoop(path.to_owned()))
    }

    /// Content of the file at `path`, following links.
    pub fn read_file(&self, path: &str) -> Result<&[u8]> {
        let entry = self.resolve(path)?;
        match entry.kind {
            EntryKind::Directory => Err(DciError::IsADirectory(entry.path.clone())),
            _                    => Ok(self.content(entry)),
        }
    }

    /// Every entry, depth first, parents before children.
    pub fn walk(&self) -> Vec<&EntryMeta> {
        let mut out = Vec::with_capacity(self.entry_count());
        let mut stack: Vec<&EntryMeta> = self.entries().iter().rev().collect();
        while let Some(entry) = stack.pop() {
            out.push(entry);
            if entry.is_dir() && entry.path != ROOT {
                if let Some(children) = self.dirs.get(&entry.path) {
                    stack.extend(children.iter().rev());
                }
            }
        }
        out
    }
}

/// Strict pass: header plus exactly `entry_count` top-level entries.
fn parse_top_level(data: &[u8]) -> Result<(Header, Vec<EntryMeta>)> {
    let mut cursor = Cursor::new(data);
    let header = Header::read(&mut cursor)?;

    // Never trust the count for the allocation size.
    let plausible = (remaining(&cursor) / ENTRY_HEADER_SIZE as u64) as usize;
    let mut top = Vec::with_capacity((header.entry_count as usize).min(plausible));
    for _ in 0..header.entry_count {
        let raw = decode_entry(&mut cursor)?;
        top.push(EntryMeta {
            kind:  raw.kind,
            path:  join_path(ROOT, &raw.name),
            name:  raw.name,
            range: raw.content_offset..raw.content_offset + raw.content.len(),
        });
    }
    let trailing = remaining(&cursor);
    if trailing > 0 {
        debug!(trailing, "ignoring bytes after the last top-level entry");
    }
    Ok((header, top))
}
