//! Unpacker for classic Macintosh archive and encoding formats.
//!
//! This crate peels apart the encodings that classic Mac software shipped
//! in: BinHex 4.0 (`.hqx`), MacBinary II (`.bin`), Compact Pro (`.cpt`),
//! and StuffIt classic / StuffIt 5 (`.sit`).  Extracted files keep the
//! classic Mac fork structure (a data fork and a resource fork) plus
//! Finder metadata (type, creator, flags).
//!
//! # Peeling
//!
//! Old Mac files usually arrive in nested encodings (`.sit.hqx`,
//! `.sea.bin`).  [`peel`] detects the outermost layer, strips wrapper
//! formats one at a time, extracts the terminal archive, and then re-peels
//! extracted files that are themselves wrapped:
//!
//! ```no_run
//! let data = std::fs::read("archive.sit.hqx").unwrap();
//! for file in peeler::peel(&data).unwrap() {
//!     println!(
//!         "{}: {} + {} bytes",
//!         file.meta.display_name(),
//!         file.data_fork.len(),
//!         file.resource_fork.len()
//!     );
//! }
//! ```
//!
//! Per-format entry points ([`peel_hqx`], [`peel_bin`], [`peel_sit`],
//! [`peel_cpt`], and the `_file` variants of the wrappers) are available
//! when the caller already knows what it holds.

use std::borrow::Cow;
use std::path::Path;

use encoding_rs::MACINTOSH;
use log::debug;
use thiserror::Error;

mod crc;
mod huffman;
mod sit13;
mod sit15;

pub mod cpt;
pub mod hqx;
pub mod macbinary;
pub mod sit;

pub use cpt::peel_cpt;
pub use hqx::{peel_hqx, peel_hqx_file};
pub use macbinary::{peel_bin, peel_bin_file};
pub use sit::peel_sit;

/// Errors produced while peeling.  Messages are one-line strings prefixed
/// with the component that failed (e.g. `"BinHex: header CRC mismatch"`).
#[derive(Error, Debug)]
pub enum PeelError {
    /// An I/O error while reading input from disk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input does not carry the format's signature.
    #[error("{0}")]
    Format(String),

    /// The input ends before a declared header or fork does.
    #[error("{0}")]
    Truncated(String),

    /// A header field is out of range or a header checksum failed.
    #[error("{0}")]
    Validation(String),

    /// Decompressed content does not match its stored checksum.
    #[error("{0}")]
    Integrity(String),

    /// The entry is encrypted; decryption is not supported.
    #[error("{0}")]
    Encrypted(String),

    /// The archive uses a compression method outside the supported set.
    #[error("{0}")]
    Unsupported(String),

    /// A compressed stream is malformed.
    #[error("{0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, PeelError>;

/// Finder metadata for one extracted file.  Fields a format cannot provide
/// are zero.
#[derive(Debug, Clone, Default)]
pub struct FileMeta {
    /// Raw Mac filename bytes (no mandated encoding), at most 255 bytes.
    pub name: Vec<u8>,

    /// Classic Mac file type (4 ASCII bytes as a big-endian integer,
    /// e.g. `TEXT`).
    pub mac_type: u32,

    /// Classic Mac creator code (e.g. `ttxt`).
    pub mac_creator: u32,

    /// Finder flags.
    pub finder_flags: u16,
}

impl FileMeta {
    /// The filename decoded as MacRoman, which is what the classic Mac OS
    /// almost always wrote.
    pub fn display_name(&self) -> Cow<'_, str> {
        let (decoded, _, _) = MACINTOSH.decode(&self.name);
        decoded
    }
}

/// A single extracted file: metadata plus both forks.  Unused forks are
/// empty vectors.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFile {
    pub meta: FileMeta,
    pub data_fork: Vec<u8>,
    pub resource_fork: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Format handler table
// ---------------------------------------------------------------------------

enum Handler {
    /// One buffer in, one decoded buffer out (BinHex, MacBinary).
    Wrapper(fn(&[u8]) -> Result<Vec<u8>>),
    /// One buffer in, a list of extracted files out (StuffIt, Compact Pro).
    Archive(fn(&[u8]) -> Result<Vec<ExtractedFile>>),
}

struct Format {
    name: &'static str,
    probe: fn(&[u8]) -> bool,
    handler: Handler,
}

/// Detection order matters: wrappers come first so outer encodings are
/// stripped before archive signatures buried inside them can match.
static FORMATS: &[Format] = &[
    Format {
        name: "hqx",
        probe: hqx::detect,
        handler: Handler::Wrapper(hqx::peel_hqx),
    },
    Format {
        name: "bin",
        probe: macbinary::detect,
        handler: Handler::Wrapper(macbinary::peel_bin),
    },
    Format {
        name: "sit",
        probe: sit::detect,
        handler: Handler::Archive(sit::peel_sit),
    },
    Format {
        name: "cpt",
        probe: cpt::detect,
        handler: Handler::Archive(cpt::peel_cpt),
    },
];

fn detect_format(src: &[u8]) -> Option<&'static Format> {
    FORMATS.iter().find(|f| (f.probe)(src))
}

/// Identify the outermost format without peeling.  Returns `"hqx"`,
/// `"bin"`, `"sit"`, or `"cpt"`.
pub fn detect(src: &[u8]) -> Option<&'static str> {
    detect_format(src).map(|f| f.name)
}

// ---------------------------------------------------------------------------
// Peeling driver
// ---------------------------------------------------------------------------

/// Maximum number of layers to peel before giving up, guarding against
/// inputs that detect as wrappers in a loop.
const MAX_PEEL_DEPTH: usize = 32;

fn wrap_single_file(data: Vec<u8>) -> Vec<ExtractedFile> {
    vec![ExtractedFile {
        meta: FileMeta::default(),
        data_fork: data,
        resource_fork: Vec::new(),
    }]
}

/// Re-peel extracted files whose data forks are themselves recognized
/// *wrapper* formats.  Archive signatures inside extracted forks are
/// deliberately not followed: those magics are weak and large binary
/// payloads trip them.  A failed sub-peel keeps the original file.
fn repeel_files(list: Vec<ExtractedFile>, depth: usize) -> Vec<ExtractedFile> {
    let mut result = Vec::with_capacity(list.len());
    for file in list {
        let is_wrapper = !file.data_fork.is_empty()
            && matches!(
                detect_format(&file.data_fork),
                Some(Format {
                    handler: Handler::Wrapper(_),
                    ..
                })
            );
        if !is_wrapper {
            result.push(file);
            continue;
        }

        match peel_depth(&file.data_fork, depth + 1) {
            Ok(sub) => result.extend(sub),
            Err(err) => {
                debug!(
                    "keeping '{}' as-is; nested peel failed: {err}",
                    file.meta.display_name()
                );
                result.push(file);
            }
        }
    }
    result
}

fn peel_depth(src: &[u8], depth: usize) -> Result<Vec<ExtractedFile>> {
    if depth >= MAX_PEEL_DEPTH {
        return Ok(wrap_single_file(src.to_vec()));
    }

    // Holds the most recent intermediate produced by a wrapper peel; the
    // caller's input is used until the first layer comes off.
    let mut owned: Option<Vec<u8>> = None;

    for _ in 0..MAX_PEEL_DEPTH {
        let cur: &[u8] = owned.as_deref().unwrap_or(src);
        let Some(fmt) = detect_format(cur) else { break };

        match fmt.handler {
            Handler::Wrapper(peel_fn) => {
                debug!("peeling {} layer", fmt.name);
                owned = Some(peel_fn(cur)?);
            }
            Handler::Archive(peel_fn) => {
                debug!("extracting {} archive", fmt.name);
                let files = peel_fn(cur)?;
                return Ok(repeel_files(files, depth));
            }
        }
    }

    // Nothing recognized (or too many layers): hand back whatever is left
    // as a single nameless file.
    Ok(wrap_single_file(owned.unwrap_or_else(|| src.to_vec())))
}

/// Detect and peel all layers, returning the extracted files.  Handles
/// arbitrarily nested encodings such as `.sit.hqx`.
pub fn peel(src: &[u8]) -> Result<Vec<ExtractedFile>> {
    peel_depth(src, 0)
}

/// Read the file at `path`, then [`peel`] its contents.
pub fn peel_path<P: AsRef<Path>>(path: P) -> Result<Vec<ExtractedFile>> {
    let data = std::fs::read(path)?;
    peel(&data)
}
