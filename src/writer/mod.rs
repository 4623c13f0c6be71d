//! Archive builder — an in-memory tree serialized bottom-up.
//!
//! Files, links and directories are accumulated by path.  Nothing is encoded
//! until [`ArchiveBuilder::to_bytes`], which packs every directory the same
//! way: children in natural order, each written with the entry codec, the
//! concatenation becoming the parent's content.  The top level is that same
//! list prefixed by the archive header.

use std::collections::BTreeMap;
use std::io::Write;

use tracing::debug;

use crate::entry::{encode_entry, validate_name, EntryKind};
use crate::error::{DciError, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::natsort::natural_sort_by_key;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Link(String),
    Dir(DirNode),
}

#[derive(Debug, Clone, Default)]
struct DirNode {
    children: BTreeMap<String, Node>,
}

impl DirNode {
    /// Walks to the directory at `segs`, creating missing ones when asked.
    fn dir_mut(&mut self, segs: &[&str], full: &str, create: bool) -> Result<&mut DirNode> {
        let mut node = self;
        for seg in segs {
            let child = if create {
                node.children
                    .entry((*seg).to_owned())
                    .or_insert_with(|| Node::Dir(DirNode::default()))
            } else {
                node.children
                    .get_mut(*seg)
                    .ok_or_else(|| DciError::NotFound(full.to_owned()))?
            };
            node = match child {
                Node::Dir(dir) => dir,
                _              => return Err(DciError::NotADirectory(full.to_owned())),
            };
        }
        Ok(node)
    }

    fn get(&self, segs: &[&str]) -> Option<&Node> {
        let (last, parents) = segs.split_last()?;
        let mut node = self;
        for seg in parents {
            node = match node.children.get(*seg)? {
                Node::Dir(dir) => dir,
                _              => return None,
            };
        }
        node.children.get(*last)
    }
}

/// Splits a `/`-separated path into validated entry names.
fn split_path(path: &str) -> Result<Vec<&str>> {
    let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segs.is_empty() {
        return Err(DciError::InvalidName(path.to_owned()));
    }
    for seg in &segs {
        if *seg == "." || *seg == ".." {
            return Err(DciError::InvalidName((*seg).to_owned()));
        }
        validate_name(seg)?;
    }
    Ok(segs)
}

fn pack_children(dir: &DirNode) -> Result<Vec<u8>> {
    let mut names: Vec<&String> = dir.children.keys().collect();
    natural_sort_by_key(&mut names, |name| name.as_str());

    let mut out = Vec::new();
    for name in names {
        match &dir.children[name] {
            Node::File(data)   => encode_entry(&mut out, EntryKind::File, name, data)?,
            Node::Link(target) => encode_entry(&mut out, EntryKind::Link, name, target.as_bytes())?,
            Node::Dir(sub)     => {
                let content = pack_children(sub)?;
                encode_entry(&mut out, EntryKind::Directory, name, &content)?;
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    root: DirNode,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.root.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        split_path(path).map_or(false, |segs| self.root.get(&segs).is_some())
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(split_path(path).ok().and_then(|segs| self.root.get(&segs)), Some(Node::Dir(_)))
    }

    /// Checks that `path` could be created without touching the tree.
    pub fn check_vacant(&self, path: &str) -> Result<()> {
        let segs = split_path(path)?;
        let mut node = &self.root;
        for (i, seg) in segs.iter().enumerate() {
            let last = i + 1 == segs.len();
            match node.children.get(*seg) {
                None                 => return Ok(()),
                Some(_) if last      => return Err(DciError::AlreadyExists(path.to_owned())),
                Some(Node::Dir(dir)) => node = dir,
                Some(_)              => return Err(DciError::NotADirectory(path.to_owned())),
            }
        }
        Ok(())
    }

    /// Creates a directory and any missing parents.  Succeeds if it already
    /// exists as a directory.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let segs = split_path(path)?;
        self.root.dir_mut(&segs, path, true)?;
        Ok(())
    }

    pub fn write_file(&mut self, path: &str, data: Vec<u8>) -> Result<()> {
        self.insert(path, Node::File(data))
    }

    /// Adds a link at `path` whose content is the textual `target`, normally
    /// a path relative to the link's own directory.
    pub fn link(&mut self, target: &str, path: &str) -> Result<()> {
        self.insert(path, Node::Link(target.to_owned()))
    }

    fn insert(&mut self, path: &str, node: Node) -> Result<()> {
        let segs = split_path(path)?;
        let Some((name, parents)) = segs.split_last() else {
            return Err(DciError::InvalidName(path.to_owned()));
        };
        let dir = self.root.dir_mut(parents, path, true)?;
        if dir.children.contains_key(*name) {
            return Err(DciError::AlreadyExists(path.to_owned()));
        }
        dir.children.insert((*name).to_owned(), node);
        Ok(())
    }

    /// Serializes the whole tree: header, then natural-sorted top-level
    /// entries with every directory packed recursively.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let count = u32::try_from(self.len()).map_err(|_| DciError::TooManyEntries(self.len()))?;
        let body = pack_children(&self.root)?;
        let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
        Header::new(count).write(&mut out)?;
        out.extend_from_slice(&body);
        debug!(entries = count, bytes = out.len(), "packed archive");
        Ok(out)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }
}
