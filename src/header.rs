use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::error::{DciError, Result};

pub const MAGIC: &[u8; 4] = b"DCI\0";
pub const VERSION: u8 = 1;
/// magic(4) + version(1) + entry count(3)
pub const HEADER_SIZE: usize = 8;
/// Largest value the 3-byte entry count can hold.
pub const MAX_ENTRY_COUNT: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub entry_count: u32,
}

impl Header {
    pub fn new(entry_count: u32) -> Self {
        Self { version: VERSION, entry_count }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.entry_count > MAX_ENTRY_COUNT {
            return Err(DciError::TooManyEntries(self.entry_count as usize));
        }
        writer.write_all(MAGIC)?;
        writer.write_u8(self.version)?;
        writer.write_u24::<LittleEndian>(self.entry_count)?;
        Ok(())
    }

    /// Reads and validates the archive header.  The cursor is left on the
    /// first top-level entry.
    pub fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let available = remaining(cursor);
        if available < HEADER_SIZE as u64 {
            return Err(DciError::Truncated { needed: HEADER_SIZE as u64, available });
        }
        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(DciError::BadMagic { found: magic });
        }
        let version = cursor.read_u8()?;
        if version != VERSION {
            return Err(DciError::UnsupportedVersion(version));
        }
        let entry_count = cursor.read_u24::<LittleEndian>()?;
        Ok(Self { version, entry_count })
    }
}

pub(crate) fn remaining(cursor: &Cursor<&[u8]>) -> u64 {
    (cursor.get_ref().len() as u64).saturating_sub(cursor.position())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_little_endian_uint24() {
        let mut out = Vec::new();
        Header::new(0x030201).write(&mut out).unwrap();
        assert_eq!(out, b"DCI\0\x01\x01\x02\x03");
    }

    #[test]
    fn rejects_wrong_magic() {
        let bytes: &[u8] = b"DCX\0\x01\0\0\0";
        let err = Header::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DciError::BadMagic { .. }));
    }

    #[test]
    fn rejects_version_two() {
        let bytes: &[u8] = b"DCI\0\x02\0\0\0";
        let err = Header::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DciError::UnsupportedVersion(2)));
    }

    #[test]
    fn short_header_is_truncated() {
        let bytes: &[u8] = b"DCI\0\x01";
        let err = Header::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DciError::Truncated { needed: 8, available: 5 }));
    }

    #[test]
    fn count_over_uint24_is_rejected() {
        let err = Header::new(MAX_ENTRY_COUNT + 1).write(Vec::new()).unwrap_err();
        assert!(matches!(err, DciError::TooManyEntries(_)));
    }
}
