use std::io;
use thiserror::Error;

/// Every failure the codec can report.
///
/// Reading is strict at the top level: any of these aborts the parse and no
/// partial archive is returned.  Nested directories are parsed best-effort
/// and never surface an error of their own.
#[derive(Error, Debug)]
pub enum DciError {
    #[error("Invalid magic number (expected \"DCI\\0\", found {found:02x?})")]
    BadMagic { found: [u8; 4] },
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("Truncated input: needed {needed} more byte(s), {available} available")]
    Truncated { needed: u64, available: u64 },
    #[error("Entry name is not valid UTF-8")]
    InvalidEncoding,
    #[error("Entry name '{name}' is {len} bytes long (max 62)")]
    NameTooLong { name: String, len: usize },
    #[error("Entry name '{0}' is empty or contains '/'")]
    InvalidName(String),
    #[error("Declared size {declared} exceeds the {limit}-byte limit")]
    DeclaredSizeExceedsBuffer { declared: u64, limit: u64 },
    #[error("Unknown entry kind byte: {0}")]
    InvalidEntryKind(u8),
    #[error("Too many entries in one directory: {0} (max 16777215)")]
    TooManyEntries(usize),

    // ── Tree operations ──────────────────────────────────────────────────────
    #[error("Path already exists: {0}")]
    AlreadyExists(String),
    #[error("Path not found: {0}")]
    NotFound(String),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("Is a directory: {0}")]
    IsADirectory(String),
    #[error("Too many link hops while resolving {0}")]
    LinkLoop(String),

    // ── Icon layers ──────────────────────────────────────────────────────────
    #[error("Invalid icon state: '{0}'")]
    InvalidState(String),
    #[error("Invalid icon tone: '{0}'")]
    InvalidTone(String),
    #[error("Invalid image format: '{0}'")]
    InvalidFormat(String),
    #[error("Invalid palette: {0} (expected -1..=3)")]
    InvalidPalette(i32),
    #[error("Invalid priority: {0} (must be at least 1)")]
    InvalidPriority(i32),
    #[error("Invalid scale: {0}")]
    InvalidScale(f64),
    #[error("Invalid layer path '{0}' (expected SIZE/STATE.TONE/SCALE/LAYER)")]
    InvalidLayerPath(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DciError>;
