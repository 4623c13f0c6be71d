//! Entry codec — one `(kind, name, content)` record.
//!
//! ```text
//! KIND(1) NAME(63, utf8 + NUL padding) LEN(8, u64 LE) CONTENT(LEN)
//! ```
//!
//! A directory's content is itself a run of entries with this exact
//! encoding (and no archive header), which is what makes the format nest.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::error::{DciError, Result};
use crate::header::remaining;

/// Width of the on-disk name field, terminator included.
pub const NAME_FIELD_LEN: usize = 63;
/// Longest encodable name in UTF-8 bytes.
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 1;
/// kind(1) + name(63) + length(8)
pub const ENTRY_HEADER_SIZE: usize = 1 + NAME_FIELD_LEN + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntryKind {
    Reserved  = 0,
    File      = 1,
    Directory = 2,
    Link      = 3,
}

impl EntryKind {
    pub fn name(self) -> &'static str {
        match self {
            EntryKind::Reserved  => "reserved",
            EntryKind::File      => "file",
            EntryKind::Directory => "directory",
            EntryKind::Link      => "link",
        }
    }
}

impl TryFrom<u8> for EntryKind {
    type Error = DciError;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(EntryKind::Reserved),
            1 => Ok(EntryKind::File),
            2 => Ok(EntryKind::Directory),
            3 => Ok(EntryKind::Link),
            _ => Err(DciError::InvalidEntryKind(v)),
        }
    }
}

/// Checks that `name` fits the 63-byte field and is a single path segment.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(DciError::InvalidName(name.to_owned()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(DciError::NameTooLong { name: name.to_owned(), len: name.len() });
    }
    Ok(())
}

/// Total encoded size of an entry carrying `content_len` bytes.
pub fn encoded_len(content_len: usize) -> usize {
    ENTRY_HEADER_SIZE + content_len
}

pub fn encode_entry<W: Write>(mut writer: W, kind: EntryKind, name: &str, content: &[u8]) -> Result<()> {
    validate_name(name)?;
    let mut field = [0u8; NAME_FIELD_LEN];
    field[..name.len()].copy_from_slice(name.as_bytes());
    writer.write_u8(kind as u8)?;
    writer.write_all(&field)?;
    writer.write_u64::<LittleEndian>(content.len() as u64)?;
    writer.write_all(content)?;
    Ok(())
}

/// A decoded entry borrowing its content from the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry<'a> {
    pub kind:           EntryKind,
    pub name:           String,
    pub content:        &'a [u8],
    /// Offset of `content` within the buffer the cursor walks.
    pub content_offset: usize,
}

/// Decodes one entry and advances the cursor past its content.
///
/// The declared length is checked against what is left in the buffer before
/// anything is sliced, so a crafted length never drives an allocation.
pub fn decode_entry<'a>(cursor: &mut Cursor<&'a [u8]>) -> Result<RawEntry<'a>> {
    let available = remaining(cursor);
    if available < ENTRY_HEADER_SIZE as u64 {
        return Err(DciError::Truncated { needed: ENTRY_HEADER_SIZE as u64, available });
    }
    let kind = EntryKind::try_from(cursor.read_u8()?)?;
    let mut field = [0u8; NAME_FIELD_LEN];
    cursor.read_exact(&mut field)?;
    let len = cursor.read_u64::<LittleEndian>()?;

    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let name = std::str::from_utf8(&field[..end])
        .map_err(|_| DciError::InvalidEncoding)?
        .to_owned();
    // An empty name would share its parent's path.
    if name.is_empty() || name.contains('/') {
        return Err(DciError::InvalidName(name));
    }

    let available = remaining(cursor);
    if len > available {
        return Err(DciError::Truncated { needed: len, available });
    }
    let len = len as usize;

    let buf: &'a [u8] = *cursor.get_ref();
    let start = cursor.position() as usize;
    let content = &buf[start..start + len];
    cursor.set_position((start + len) as u64);

    Ok(RawEntry { kind, name, content, content_offset: start })
}

/// Decodes entries until the buffer is exhausted.  Stops at the first
/// failure and hands back what was decoded before it, together with the
/// error.
pub fn decode_entry_list(buf: &[u8]) -> (Vec<RawEntry<'_>>, Option<DciError>) {
    let mut cursor = Cursor::new(buf);
    let mut entries = Vec::new();
    while remaining(&cursor) > 0 {
        match decode_entry(&mut cursor) {
            Ok(entry) => entries.push(entry),
            Err(e)    => return (entries, Some(e)),
        }
    }
    (entries, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(kind: EntryKind, name: &str, content: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_entry(&mut out, kind, name, content).unwrap();
        out
    }

    #[test]
    fn layout_matches_wire_format() {
        let out = encode(EntryKind::File, "a", b"xyz");
        assert_eq!(out.len(), ENTRY_HEADER_SIZE + 3);
        assert_eq!(out[0], 1);
        assert_eq!(out[1], b'a');
        assert!(out[2..64].iter().all(|&b| b == 0));
        assert_eq!(&out[64..72], &3u64.to_le_bytes());
        assert_eq!(&out[72..], b"xyz");
    }

    #[test]
    fn decode_recovers_name_and_content() {
        let out = encode(EntryKind::Link, "dark", b"../../x/\0y");
        let mut cursor = Cursor::new(&out[..]);
        let entry = decode_entry(&mut cursor).unwrap();
        assert_eq!(entry.kind, EntryKind::Link);
        assert_eq!(entry.name, "dark");
        assert_eq!(entry.content, b"../../x/\0y");
        assert_eq!(entry.content_offset, ENTRY_HEADER_SIZE);
        assert_eq!(cursor.position() as usize, out.len());
    }

    #[test]
    fn name_of_62_bytes_fits_63_does_not() {
        let ok = "n".repeat(MAX_NAME_LEN);
        let out = encode(EntryKind::File, &ok, b"");
        let entry = decode_entry(&mut Cursor::new(&out[..])).unwrap();
        assert_eq!(entry.name, ok);

        let long = "n".repeat(MAX_NAME_LEN + 1);
        let err = encode_entry(Vec::new(), EntryKind::File, &long, b"").unwrap_err();
        assert!(matches!(err, DciError::NameTooLong { len: 63, .. }));
    }

    #[test]
    fn multibyte_name_limit_counts_bytes() {
        // 21 three-byte characters = 63 bytes.
        let name = "\u{4e2d}".repeat(21);
        let err = encode_entry(Vec::new(), EntryKind::File, &name, b"").unwrap_err();
        assert!(matches!(err, DciError::NameTooLong { .. }));
    }

    #[test]
    fn slash_in_name_is_rejected() {
        let err = encode_entry(Vec::new(), EntryKind::File, "a/b", b"").unwrap_err();
        assert!(matches!(err, DciError::InvalidName(_)));
    }

    #[test]
    fn invalid_utf8_name() {
        let mut out = encode(EntryKind::File, "ab", b"");
        out[1] = 0xff;
        let err = decode_entry(&mut Cursor::new(&out[..])).unwrap_err();
        assert!(matches!(err, DciError::InvalidEncoding));
    }

    #[test]
    fn empty_or_slashed_names_do_not_decode() {
        let mut out = encode(EntryKind::Directory, "d", b"");
        out[1] = 0;
        let err = decode_entry(&mut Cursor::new(&out[..])).unwrap_err();
        assert!(matches!(err, DciError::InvalidName(ref n) if n.is_empty()));

        let mut out = encode(EntryKind::File, "a_b", b"");
        out[2] = b'/';
        let err = decode_entry(&mut Cursor::new(&out[..])).unwrap_err();
        assert!(matches!(err, DciError::InvalidName(ref n) if n == "a/b"));
    }

    #[test]
    fn unknown_kind_byte() {
        let mut out = encode(EntryKind::File, "a", b"");
        out[0] = 9;
        let err = decode_entry(&mut Cursor::new(&out[..])).unwrap_err();
        assert!(matches!(err, DciError::InvalidEntryKind(9)));
    }

    #[test]
    fn huge_declared_length_is_truncated_not_allocated() {
        let mut out = encode(EntryKind::File, "a", b"abc");
        out[64..72].copy_from_slice(&u64::MAX.to_le_bytes());
        let err = decode_entry(&mut Cursor::new(&out[..])).unwrap_err();
        assert!(matches!(err, DciError::Truncated { needed: u64::MAX, available: 3 }));
    }

    #[test]
    fn entry_list_keeps_prefix_on_failure() {
        let mut buf = encode(EntryKind::File, "one", b"1");
        buf.extend(encode(EntryKind::File, "two", b"22"));
        buf.truncate(buf.len() - 1);
        let (entries, err) = decode_entry_list(&buf);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "one");
        assert!(matches!(err, Some(DciError::Truncated { .. })));
    }
}
