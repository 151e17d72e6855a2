//! BinHex 4.0 (.hqx) wrapper decoder.
//!
//! BinHex wraps a single Macintosh file (both forks plus Finder metadata)
//! in three layers: a text envelope with a mandatory preamble line and
//! colon delimiters, a 6-bit ASCII encoding over a 64-character alphabet,
//! and an RLE with 0x90 as the escape byte.  The decoded binary stream
//! holds a variable-length header, the data fork, and the resource fork,
//! each followed by a CRC-16/XMODEM checksum.

use crate::crc::{crc16_xmodem, crc16_xmodem_update};
use crate::{ExtractedFile, FileMeta, PeelError, Result};

const PREAMBLE: &[u8] = b"(This file must be converted with BinHex";

const RLE_MARKER: u8 = 0x90;

const NAME_MAX: usize = 63;

/// Finder flag bits cleared on decode: isInvisible (14), hasBeenInited (7),
/// OnDesk (2).
const FINDER_CLEAR_MASK: u16 = 0x4084;

/// The 64-character BinHex alphabet, index 0-63.
const ALPHABET: &[u8; 64] =
    b"!\"#$%&'()*+,-012345689@ABCDEFGHIJKLMNPQRSTUVXYZ[`abcdefhijklmpqr";

/// Scan for the preamble line.  Returns the offset just past it.
fn find_preamble(src: &[u8]) -> Option<usize> {
    let pos = src
        .windows(PREAMBLE.len())
        .position(|w| w == PREAMBLE)?;
    let mut j = pos + PREAMBLE.len();
    while j < src.len() && src[j] != b'\n' && src[j] != b'\r' {
        j += 1;
    }
    while j < src.len() && (src[j] == b'\n' || src[j] == b'\r') {
        j += 1;
    }
    Some(j)
}

/// Three-layer pull pipeline: envelope chars -> 6-bit groups -> RLE bytes.
struct HqxDecoder<'a> {
    src: &'a [u8],
    pos: usize,

    /// Reverse alphabet lookup; 0xFF marks characters outside the alphabet.
    rev: [u8; 256],

    accum: u32,
    accum_bits: u32,

    rle_marker_seen: bool,
    rle_prev: u8,
    rle_pending: u32,
}

impl<'a> HqxDecoder<'a> {
    fn new(src: &'a [u8], payload_start: usize) -> Self {
        let mut rev = [0xFFu8; 256];
        for (i, &ch) in ALPHABET.iter().enumerate() {
            rev[ch as usize] = i as u8;
        }
        Self {
            src,
            pos: payload_start,
            rev,
            accum: 0,
            accum_bits: 0,
            rle_marker_seen: false,
            rle_prev: 0,
            rle_pending: 0,
        }
    }

    /// Next encoded character, skipping whitespace.  None at the closing
    /// colon or end of input.
    fn next_char(&mut self) -> Option<u8> {
        while self.pos < self.src.len() {
            let ch = self.src[self.pos];
            self.pos += 1;
            match ch {
                b':' => return None,
                b'\r' | b'\n' | b'\t' | b' ' => continue,
                _ => return Some(ch),
            }
        }
        None
    }

    /// One byte out of the 6-bit layer, or None at end of payload.
    fn raw_byte(&mut self) -> Result<Option<u8>> {
        while self.accum_bits < 8 {
            let Some(ch) = self.next_char() else {
                return Ok(None);
            };
            let val = self.rev[ch as usize];
            if val > 63 {
                return Err(PeelError::Decode(format!(
                    "BinHex: invalid character 0x{ch:02X}"
                )));
            }
            self.accum = (self.accum << 6) | val as u32;
            self.accum_bits += 6;
        }
        self.accum_bits -= 8;
        Ok(Some(((self.accum >> self.accum_bits) & 0xFF) as u8))
    }

    /// One byte after RLE expansion, or None at end of payload.
    fn decoded_byte(&mut self) -> Result<Option<u8>> {
        if self.rle_pending > 0 {
            self.rle_pending -= 1;
            return Ok(Some(self.rle_prev));
        }

        loop {
            let Some(raw) = self.raw_byte()? else {
                return Ok(None);
            };

            if self.rle_marker_seen {
                self.rle_marker_seen = false;
                if raw == 0x00 {
                    // Escaped literal 0x90; it becomes the repeat source.
                    self.rle_prev = RLE_MARKER;
                    return Ok(Some(RLE_MARKER));
                }
                if raw == 0x01 {
                    return Err(PeelError::Decode(
                        "BinHex: illegal RLE count of 1".into(),
                    ));
                }
                // Repeat prev `raw` times total.  One copy went out before
                // the marker; emit one more now and queue the remainder.
                self.rle_pending = raw as u32 - 2;
                return Ok(Some(self.rle_prev));
            }

            if raw == RLE_MARKER {
                self.rle_marker_seen = true;
                continue;
            }

            self.rle_prev = raw;
            return Ok(Some(raw));
        }
    }

    /// Read exactly `buf.len()` decoded bytes.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        for (i, slot) in buf.iter_mut().enumerate() {
            match self.decoded_byte()? {
                Some(b) => *slot = b,
                None => {
                    return Err(PeelError::Truncated(format!(
                        "BinHex: premature end of stream (needed {} more bytes)",
                        buf.len() - i
                    )))
                }
            }
        }
        Ok(())
    }
}

struct HqxHeader {
    name: Vec<u8>,
    mac_type: u32,
    mac_creator: u32,
    finder_flags: u16,
    data_len: u32,
    rsrc_len: u32,
}

/// Parse the variable-length header and verify its CRC.
fn parse_header(dec: &mut HqxDecoder) -> Result<HqxHeader> {
    let mut len_byte = [0u8; 1];
    dec.read_exact(&mut len_byte)?;
    let name_len = len_byte[0] as usize;
    if name_len == 0 || name_len > NAME_MAX {
        return Err(PeelError::Validation(format!(
            "BinHex: invalid filename length {name_len}"
        )));
    }

    // Remaining header after the length byte: name + NUL + type(4) +
    // creator(4) + flags(2) + data_len(4) + rsrc_len(4), then the CRC.
    let payload_len = name_len + 19;
    let mut buf = vec![0u8; 1 + payload_len + 2];
    buf[0] = len_byte[0];
    dec.read_exact(&mut buf[1..])?;

    // Self-checking property: CRC over (content || stored CRC) is zero.
    if crc16_xmodem(&buf) != 0 {
        return Err(PeelError::Validation("BinHex: header CRC mismatch".into()));
    }

    let n = name_len;
    let rd32 = |off: usize| u32::from_be_bytes(buf[off..off + 4].try_into().unwrap());
    Ok(HqxHeader {
        name: buf[1..1 + n].to_vec(),
        mac_type: rd32(2 + n),
        mac_creator: rd32(6 + n),
        finder_flags: u16::from_be_bytes(buf[10 + n..12 + n].try_into().unwrap()),
        data_len: rd32(12 + n),
        rsrc_len: rd32(16 + n),
    })
}

/// Read one fork plus its trailing CRC.
fn read_fork(dec: &mut HqxDecoder, fork_len: u32, fork_name: &str) -> Result<Vec<u8>> {
    if fork_len == 0 {
        // A zero-length fork still carries a CRC field, and it must be zero.
        let mut crc_bytes = [0u8; 2];
        dec.read_exact(&mut crc_bytes)?;
        if u16::from_be_bytes(crc_bytes) != 0x0000 {
            return Err(PeelError::Integrity(format!(
                "BinHex: {fork_name} fork CRC mismatch (empty fork, expected 0x0000)"
            )));
        }
        return Ok(Vec::new());
    }

    let mut data = vec![0u8; fork_len as usize];
    dec.read_exact(&mut data)?;

    let mut crc_bytes = [0u8; 2];
    dec.read_exact(&mut crc_bytes)?;

    let crc = crc16_xmodem_update(crc16_xmodem(&data), &crc_bytes);
    if crc != 0 {
        return Err(PeelError::Integrity(format!(
            "BinHex: {fork_name} fork CRC mismatch"
        )));
    }

    Ok(data)
}

fn decode(src: &[u8]) -> Result<ExtractedFile> {
    let after_preamble = find_preamble(src)
        .ok_or_else(|| PeelError::Format("BinHex: preamble not found".into()))?;

    // Locate the colon that opens the encoded payload.
    let payload_start = src[after_preamble..]
        .iter()
        .position(|&c| c == b':')
        .map(|p| after_preamble + p + 1)
        .ok_or_else(|| PeelError::Format("BinHex: no starting colon found".into()))?;

    let mut dec = HqxDecoder::new(src, payload_start);

    let hdr = parse_header(&mut dec)?;
    let data_fork = read_fork(&mut dec, hdr.data_len, "data")?;
    let resource_fork = read_fork(&mut dec, hdr.rsrc_len, "resource")?;

    Ok(ExtractedFile {
        meta: FileMeta {
            name: hdr.name,
            mac_type: hdr.mac_type,
            mac_creator: hdr.mac_creator,
            finder_flags: hdr.finder_flags & !FINDER_CLEAR_MASK,
        },
        data_fork,
        resource_fork,
    })
}

/// Probe for the BinHex 4.0 identification string.
pub(crate) fn detect(src: &[u8]) -> bool {
    find_preamble(src).is_some()
}

/// Decode a BinHex file and return the data fork as a flat buffer.
pub fn peel_hqx(src: &[u8]) -> Result<Vec<u8>> {
    Ok(decode(src)?.data_fork)
}

/// Decode a BinHex file and return both forks plus metadata.
pub fn peel_hqx_file(src: &[u8]) -> Result<ExtractedFile> {
    decode(src)
}
