//! StuffIt (.sit) archive decoder: classic (1.x-4.x) and SIT5 layouts.
//!
//! The two layouts share nothing but the extension.  Classic archives are a
//! 22-byte header followed by sequential 112-byte entry headers; SIT5
//! archives carry an 80-byte ASCII banner and a linked list of entries
//! addressed by absolute offsets.  Both end up in the same entry
//! representation here and go through one compression-method dispatch:
//!
//!   0 = raw copy, 1 = RLE90, 2 = LZW (14-bit, LE bits),
//!   13 = LZSS + Huffman (sit13), 15 = Arsenic (sit15)

use log::debug;

use crate::crc::crc16_ibm;
use crate::{sit13, sit15, ExtractedFile, FileMeta, PeelError, Result};

const CLASSIC_HDR_SIZE: usize = 22;
const ENTRY_HDR_SIZE: usize = 112;
const SIT5_MIN_SIZE: usize = 100;

const FOLDER_START: u8 = 0x20;
const FOLDER_END: u8 = 0x21;

/// Maximum folder nesting depth for classic archives.
const MAX_DEPTH: usize = 10;

/// Maximum directory-map entries for SIT5 path resolution.
const SIT5_MAX_DIRS: usize = 32;

const SIT5_ENTRY_MAGIC: u32 = 0xA5A5_A5A5;

/// Safety cap on files from a single archive.
const MAX_FILES: usize = 65536;

const CLASSIC_SIGS: [&[u8; 4]; 9] = [
    b"SIT!", b"ST46", b"ST50", b"ST60", b"ST65", b"STin", b"STi2", b"STi3", b"STi4",
];

const SIT5_BANNER_HEAD: &[u8] = b"StuffIt (c)1997-";
const SIT5_BANNER_TAIL: &[u8] = b" Aladdin Systems, Inc., http://www.aladdinsys.com/StuffIt/";

fn rd16(data: &[u8], off: usize) -> u16 {
    u16::from_be_bytes(data[off..off + 2].try_into().unwrap())
}

fn rd32(data: &[u8], off: usize) -> u32 {
    u32::from_be_bytes(data[off..off + 4].try_into().unwrap())
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

fn classic_sig_at(buf: &[u8]) -> bool {
    buf.len() >= 14
        && &buf[10..14] == b"rLau"
        && CLASSIC_SIGS.iter().any(|sig| &buf[..4] == *sig)
}

fn sit5_banner_at(buf: &[u8]) -> bool {
    buf.len() >= 80
        && &buf[..16] == SIT5_BANNER_HEAD
        && &buf[20..78] == SIT5_BANNER_TAIL
}

/// Scan for the classic magic (any of 9 signatures plus "rLau" at +10).
fn find_classic_magic(src: &[u8]) -> Option<usize> {
    if src.len() < CLASSIC_HDR_SIZE {
        return None;
    }
    (0..=src.len() - 14).find(|&off| classic_sig_at(&src[off..]))
}

/// Scan for the SIT5 ASCII banner.  Bytes 16..20 (the year) and 78..80
/// (CR LF) are not validated.
fn find_sit5_magic(src: &[u8]) -> Option<usize> {
    if src.len() < 80 {
        return None;
    }
    (0..=src.len() - 80).find(|&off| sit5_banner_at(&src[off..]))
}

/// Does the buffer begin with a StuffIt signature?  Used by the MacBinary
/// wrapper to decide which fork carries the archive.
pub(crate) fn starts_with_signature(buf: &[u8]) -> bool {
    sit5_banner_at(buf) || classic_sig_at(buf)
}

/// Probe for either StuffIt layout anywhere in the buffer.
pub(crate) fn detect(src: &[u8]) -> bool {
    find_classic_magic(src).is_some() || find_sit5_magic(src).is_some()
}

// ---------------------------------------------------------------------------
// Fork decompression
// ---------------------------------------------------------------------------

/// Per-fork info unpacked from an entry header.
struct ForkInfo<'a> {
    raw_len: u32,
    crc: u16,
    method: u8,
    data: &'a [u8],
}

/// RLE90 expansion, StuffIt flavour: 0x90 0x00 emits a literal 0x90
/// without touching the repeat source; 0x90 N repeats the last literal
/// N-1 more times.
fn rle90(src: &[u8], raw_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw_len);
    let mut last = 0u8;
    let mut i = 0;
    while out.len() < raw_len && i < src.len() {
        let b = src[i];
        i += 1;
        if b != 0x90 {
            out.push(b);
            last = b;
            continue;
        }
        let Some(&n) = src.get(i) else { break };
        i += 1;
        match n {
            0 => out.push(0x90),
            1 => {}
            _ => {
                let repeats = (n as usize - 1).min(raw_len - out.len());
                out.extend(std::iter::repeat(last).take(repeats));
            }
        }
    }
    out
}

// --- LZW (StuffIt variant: 14-bit max, little-endian bit packing) ---

const LZW_MAX_BITS: u32 = 14;
const LZW_TABLE_CAP: usize = 1 << LZW_MAX_BITS;
const LZW_CLEAR_CODE: u32 = 256;
const LZW_FIRST_NEW: usize = 257;

/// Dictionary as parallel arrays; expansion walks `prev_code` backward
/// through a staging buffer drained byte-by-byte.
struct LzwDecoder<'a> {
    src: &'a [u8],
    bit_pos: usize,

    prev_code: Vec<u16>,
    suffix: Vec<u8>,
    head: Vec<u8>,
    chain_len: Vec<u16>,

    tbl_next: usize,
    code_bits: u32,
    prev: Option<u32>,
    block_count: u32,

    stage: Vec<u8>,
    stage_rd: usize,
}

impl<'a> LzwDecoder<'a> {
    fn new(src: &'a [u8]) -> Self {
        let mut dec = Self {
            src,
            bit_pos: 0,
            prev_code: vec![u16::MAX; LZW_TABLE_CAP],
            suffix: vec![0; LZW_TABLE_CAP],
            head: vec![0; LZW_TABLE_CAP],
            chain_len: vec![0; LZW_TABLE_CAP],
            tbl_next: LZW_FIRST_NEW,
            code_bits: 9,
            prev: None,
            block_count: 0,
            stage: Vec::new(),
            stage_rd: 0,
        };
        for i in 0..256 {
            dec.suffix[i] = i as u8;
            dec.head[i] = i as u8;
            dec.chain_len[i] = 1;
        }
        dec
    }

    /// Next code from the little-endian bitstream, or None on exhaustion.
    fn next_code(&mut self) -> Option<u32> {
        let byte_off = self.bit_pos >> 3;
        if byte_off >= self.src.len() {
            return None;
        }
        let mut acc = 0u32;
        for (i, &b) in self.src[byte_off..].iter().take(4).enumerate() {
            acc |= (b as u32) << (8 * i);
        }
        let shift = self.bit_pos & 7;
        let mask = (1u32 << self.code_bits) - 1;
        let code = (acc >> shift) & mask;
        self.bit_pos += self.code_bits as usize;
        self.block_count += 1;
        Some(code)
    }

    /// Expand a dictionary chain backward into the staging buffer, with an
    /// optional extra tail byte for the KwKwK case.
    fn expand(&mut self, code: u32, extra: Option<u8>) {
        let len = self.chain_len[code as usize] as usize + extra.is_some() as usize;
        self.stage.clear();
        self.stage.resize(len, 0);
        let mut pos = len;
        if let Some(b) = extra {
            pos -= 1;
            self.stage[pos] = b;
        }
        let mut cur = code;
        while cur != u32::from(u16::MAX) && pos > 0 {
            pos -= 1;
            self.stage[pos] = self.suffix[cur as usize];
            cur = u32::from(self.prev_code[cur as usize]);
        }
        if pos > 0 {
            self.stage.drain(..pos);
        }
        self.stage_rd = 0;
    }

    fn add_entry(&mut self, prev: u32, first_byte: u8) {
        if self.tbl_next >= LZW_TABLE_CAP {
            return;
        }
        let idx = self.tbl_next;
        self.prev_code[idx] = prev as u16;
        self.suffix[idx] = first_byte;
        self.head[idx] = self.head[prev as usize];
        self.chain_len[idx] = self.chain_len[prev as usize] + 1;
        self.tbl_next += 1;
        // Widen the code when the table reaches a power of two.
        if self.tbl_next < LZW_TABLE_CAP
            && self.tbl_next.is_power_of_two()
            && self.code_bits < LZW_MAX_BITS
        {
            self.code_bits += 1;
        }
    }

    fn decode(&mut self, want: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(want);
        while out.len() < want {
            // Drain the staging buffer first.
            if self.stage_rd < self.stage.len() {
                let n = (self.stage.len() - self.stage_rd).min(want - out.len());
                out.extend_from_slice(&self.stage[self.stage_rd..self.stage_rd + n]);
                self.stage_rd += n;
                continue;
            }

            let Some(code) = self.next_code() else { break };

            if code == LZW_CLEAR_CODE {
                // Skip the rest of the current 8-code block, then reset.
                if self.block_count & 7 != 0 {
                    self.bit_pos += self.code_bits as usize * (8 - (self.block_count & 7) as usize);
                }
                self.tbl_next = LZW_FIRST_NEW;
                self.code_bits = 9;
                self.prev = None;
                self.block_count = 0;
                continue;
            }

            let Some(prev) = self.prev else {
                // First code after a reset is a bare byte.
                if code < 256 {
                    out.push(code as u8);
                }
                self.prev = Some(code);
                continue;
            };

            if code as usize > self.tbl_next {
                return Err(PeelError::Decode(format!(
                    "SIT: LZW code {code} references a nonexistent dictionary entry"
                )));
            }

            // KwKwK: a code equal to the next free slot starts with the
            // first byte of the previous expansion.
            let first_ch = if (code as usize) < self.tbl_next {
                self.head[code as usize]
            } else {
                self.head[prev as usize]
            };
            self.add_entry(prev, first_ch);

            if (code as usize) < self.tbl_next {
                self.expand(code, None);
            } else {
                // Table full with a KwKwK code: synthesize prev + first byte.
                self.expand(prev, Some(first_ch));
            }

            self.prev = Some(code);
        }
        Ok(out)
    }
}

/// Decompress one fork with the method named in its header, then verify the
/// stored CRC-16 over the decompressed bytes.  Method 15 checks integrity
/// internally and is exempt from the container CRC.
fn decompress_fork(fi: &ForkInfo) -> Result<Vec<u8>> {
    let raw_len = fi.raw_len as usize;

    if fi.method == 15 {
        return sit15::decompress(fi.data, raw_len);
    }

    let out = match fi.method {
        0 => {
            if fi.data.len() < raw_len {
                return Err(PeelError::Truncated(format!(
                    "SIT: method 0 packed ({}) < raw ({})",
                    fi.data.len(),
                    raw_len
                )));
            }
            fi.data[..raw_len].to_vec()
        }
        1 => rle90(fi.data, raw_len),
        2 => LzwDecoder::new(fi.data).decode(raw_len)?,
        13 => sit13::decompress(fi.data, raw_len)?,
        other => {
            return Err(PeelError::Unsupported(format!(
                "SIT: unsupported compression method {other}"
            )))
        }
    };

    let actual = crc16_ibm(&out);
    if actual != fi.crc {
        return Err(PeelError::Integrity(format!(
            "SIT: fork CRC mismatch (expected 0x{:04X}, got 0x{:04X})",
            fi.crc, actual
        )));
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Entry representation shared by both layouts
// ---------------------------------------------------------------------------

struct SitEntry<'a> {
    name: Vec<u8>,
    mac_type: u32,
    mac_creator: u32,
    finder_flags: u16,
    data_fork: ForkInfo<'a>,
    rsrc_fork: Option<ForkInfo<'a>>,
}

fn join_path(parent: &[u8], name: &[u8]) -> Vec<u8> {
    let mut path = Vec::with_capacity(parent.len() + 1 + name.len());
    if !parent.is_empty() {
        path.extend_from_slice(parent);
        path.push(b'/');
    }
    path.extend_from_slice(name);
    path.truncate(255);
    path
}

// ---------------------------------------------------------------------------
// Classic layout
// ---------------------------------------------------------------------------

fn parse_classic<'a>(base: &'a [u8]) -> Result<Vec<SitEntry<'a>>> {
    if base.len() < CLASSIC_HDR_SIZE {
        return Err(PeelError::Truncated("SIT classic: archive too small".into()));
    }

    let file_count = rd16(base, 4) as usize;
    let mut cursor = CLASSIC_HDR_SIZE;
    let mut done = 0;

    let mut entries: Vec<SitEntry> = Vec::new();
    let mut dirs: Vec<Vec<u8>> = Vec::new();

    while done < file_count {
        if cursor + ENTRY_HDR_SIZE > base.len() {
            break;
        }
        let hdr = &base[cursor..cursor + ENTRY_HDR_SIZE];
        let rsrc_method = hdr[0];
        let data_method = hdr[1];

        if rsrc_method == FOLDER_START || data_method == FOLDER_START {
            let name_len = (hdr[2] as usize).min(63);
            if dirs.len() < MAX_DEPTH {
                dirs.push(hdr[3..3 + name_len].to_vec());
            }
            cursor += ENTRY_HDR_SIZE;
            done += 1;
            continue;
        }

        if rsrc_method == FOLDER_END || data_method == FOLDER_END {
            dirs.pop();
            cursor += ENTRY_HDR_SIZE;
            done += 1;
            continue;
        }

        // Unknown high bits mean the entry is not a plain file; skip it.
        if (rsrc_method | data_method) & 0xE0 != 0 {
            debug!("SIT classic: skipping entry with method bits 0x{rsrc_method:02X}/0x{data_method:02X}");
            cursor += ENTRY_HDR_SIZE;
            done += 1;
            continue;
        }

        if (rsrc_method | data_method) & 0x10 != 0 {
            return Err(PeelError::Encrypted(
                "SIT classic: encrypted entries are not supported".into(),
            ));
        }

        // Regular file entry: verify the header CRC over the first 110 bytes.
        let stored_crc = rd16(hdr, 110);
        let computed_crc = crc16_ibm(&hdr[..110]);
        if stored_crc != computed_crc {
            debug!(
                "SIT classic: header CRC mismatch at 0x{cursor:X}: stored=0x{stored_crc:04X}, computed=0x{computed_crc:04X}"
            );
            return Err(PeelError::Validation(
                "SIT classic: entry header CRC mismatch".into(),
            ));
        }

        let name_len = (hdr[2] as usize).min(63);
        let mut path = Vec::new();
        for d in &dirs {
            path.extend_from_slice(d);
            path.push(b'/');
        }
        path.extend_from_slice(&hdr[3..3 + name_len]);
        path.truncate(255);

        let rsrc_raw = rd32(hdr, 84);
        let data_raw = rd32(hdr, 88);
        let rsrc_packed = rd32(hdr, 92) as usize;
        let data_packed = rd32(hdr, 96) as usize;
        let rsrc_crc = rd16(hdr, 100);
        let data_crc = rd16(hdr, 102);

        // Resource fork data first, data fork right after.
        let rsrc_start = cursor + ENTRY_HDR_SIZE;
        let data_start = rsrc_start + rsrc_packed;
        if data_start + data_packed > base.len() {
            return Err(PeelError::Truncated(
                "SIT classic: fork data extends past archive end".into(),
            ));
        }

        if entries.len() >= MAX_FILES {
            return Err(PeelError::Validation(format!(
                "SIT: too many files in archive (limit {MAX_FILES})"
            )));
        }

        entries.push(SitEntry {
            name: path,
            mac_type: rd32(hdr, 66),
            mac_creator: rd32(hdr, 70),
            finder_flags: rd16(hdr, 74),
            data_fork: ForkInfo {
                raw_len: data_raw,
                crc: data_crc,
                method: data_method & 0x0F,
                data: &base[data_start..data_start + data_packed],
            },
            rsrc_fork: (rsrc_raw > 0).then(|| ForkInfo {
                raw_len: rsrc_raw,
                crc: rsrc_crc,
                method: rsrc_method & 0x0F,
                data: &base[rsrc_start..rsrc_start + rsrc_packed],
            }),
        });

        cursor = data_start + data_packed;
        done += 1;
    }

    Ok(entries)
}

// ---------------------------------------------------------------------------
// SIT5 layout
// ---------------------------------------------------------------------------

fn parse_sit5<'a>(base: &'a [u8]) -> Result<Vec<SitEntry<'a>>> {
    if base.len() < SIT5_MIN_SIZE {
        return Err(PeelError::Truncated(format!(
            "SIT5: archive too small ({} bytes)",
            base.len()
        )));
    }

    // Declared entry count at offset 92, initial traversal cursor at 94.
    // (The 4-byte field at offset 88 is a historical artifact; it is not
    // consulted.)
    let entry_count = rd16(base, 92) as u64;
    let mut cursor = rd32(base, 94) as usize;
    let mut remaining = entry_count;

    let mut dir_map: Vec<(u32, Vec<u8>)> = Vec::new();
    let mut entries: Vec<SitEntry> = Vec::new();

    while remaining > 0 && cursor != 0 && cursor + 48 <= base.len() {
        let h1 = &base[cursor..];

        if rd32(h1, 0) != SIT5_ENTRY_MAGIC {
            return Err(PeelError::Validation(format!(
                "SIT5: invalid entry magic at offset {cursor}"
            )));
        }
        let version = h1[4];
        if version != 1 {
            return Err(PeelError::Unsupported(format!(
                "SIT5: unsupported entry version {version}"
            )));
        }

        let h1_len = rd16(h1, 6) as usize;
        if h1_len < 48 {
            return Err(PeelError::Validation(format!(
                "SIT5: entry header size {h1_len} too small"
            )));
        }
        if cursor + h1_len > base.len() {
            return Err(PeelError::Truncated(
                "SIT5: entry header extends past archive end".into(),
            ));
        }

        // Header CRC is computed with the CRC field itself zeroed.
        let mut tmp = base[cursor..cursor + h1_len].to_vec();
        tmp[32] = 0;
        tmp[33] = 0;
        let computed = crc16_ibm(&tmp);
        let stored = rd16(h1, 32);
        if computed != stored {
            return Err(PeelError::Validation(format!(
                "SIT5: header CRC mismatch at offset {cursor}"
            )));
        }

        let h2_off = cursor + h1_len;
        let flags = h1[9];
        let parent_off = rd32(h1, 26);
        let name_len = rd16(h1, 30) as usize;
        let d_raw_len = rd32(h1, 34);
        let d_packed_len = rd32(h1, 38) as usize;
        let d_crc = rd16(h1, 42);

        // Entry name starts at byte 48 of header 1.
        let name_avail = (base.len() - cursor - 48).min(name_len).min(255);
        let name = base[cursor + 48..cursor + 48 + name_avail].to_vec();

        if h2_off + 32 > base.len() {
            return Err(PeelError::Truncated(
                "SIT5: secondary header extends past archive end".into(),
            ));
        }
        let h2 = &base[h2_off..];
        let flags2 = rd16(h2, 0);
        let mac_type = rd32(h2, 4);
        let mac_creator = rd32(h2, 8);
        let finder_flags = rd16(h2, 12);

        let skip_extra = if version == 1 { 22 } else { 18 };
        let rsrc_present = flags2 & 0x01 != 0;
        let after_prefix = h2_off + 14 + skip_extra;
        let mut payload_off = after_prefix;

        let mut r_raw_len = 0u32;
        let mut r_packed_len = 0usize;
        let mut r_crc = 0u16;
        let mut r_method = 0u8;
        if rsrc_present {
            if after_prefix + 14 > base.len() {
                return Err(PeelError::Truncated(
                    "SIT5: resource fork info past archive end".into(),
                ));
            }
            r_raw_len = rd32(base, after_prefix);
            r_packed_len = rd32(base, after_prefix + 4) as usize;
            r_crc = rd16(base, after_prefix + 8);
            r_method = base[after_prefix + 12];
            let r_passlen = base[after_prefix + 13] as usize;
            payload_off = after_prefix + 14 + r_passlen;
        }

        // Folder entries (flags bit 6).
        if flags & 0x40 != 0 {
            let child_count = rd16(h1, 46) as u64;

            // 0xFFFFFFFF marks a placeholder folder; step past header 1.
            if d_raw_len == 0xFFFF_FFFF {
                cursor = h2_off;
                continue;
            }

            let parent = resolve_parent(&dir_map, parent_off);
            let full = join_path(&parent, &name);
            if dir_map.len() < SIT5_MAX_DIRS {
                dir_map.push((cursor as u32, full));
            }

            remaining += child_count;
            cursor = payload_off;
            continue;
        }

        // Non-folder skip marker.
        if d_raw_len == 0xFFFF_FFFF {
            cursor = h2_off;
            continue;
        }

        // Regular file entry.
        let d_method = h1[46];
        let d_passlen = h1[47];

        if flags & 0x20 != 0 && d_raw_len != 0 && d_passlen != 0 {
            return Err(PeelError::Encrypted(
                "SIT5: encrypted entries are not supported".into(),
            ));
        }

        let parent = resolve_parent(&dir_map, parent_off);
        let full_name = join_path(&parent, &name);

        // Resource fork compressed bytes first, then data fork bytes.
        let r_base = payload_off;
        let d_base = payload_off + if rsrc_present { r_packed_len } else { 0 };
        if d_base + d_packed_len > base.len() || r_base + r_packed_len > base.len() {
            return Err(PeelError::Truncated(
                "SIT5: fork data extends past archive end".into(),
            ));
        }

        if entries.len() >= MAX_FILES {
            return Err(PeelError::Validation(format!(
                "SIT: too many files in archive (limit {MAX_FILES})"
            )));
        }

        entries.push(SitEntry {
            name: full_name,
            mac_type,
            mac_creator,
            finder_flags,
            data_fork: ForkInfo {
                raw_len: d_raw_len,
                crc: d_crc,
                method: d_method & 0x0F,
                data: &base[d_base..d_base + d_packed_len],
            },
            rsrc_fork: (rsrc_present && r_raw_len > 0).then(|| ForkInfo {
                raw_len: r_raw_len,
                crc: r_crc,
                method: r_method & 0x0F,
                data: &base[r_base..r_base + r_packed_len],
            }),
        });

        cursor = d_base + d_packed_len;
        remaining -= 1;
    }

    Ok(entries)
}

fn resolve_parent(dir_map: &[(u32, Vec<u8>)], parent_off: u32) -> Vec<u8> {
    if parent_off == 0 {
        return Vec::new();
    }
    dir_map
        .iter()
        .find(|(off, _)| *off == parent_off)
        .map(|(_, path)| path.clone())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// File list construction
// ---------------------------------------------------------------------------

fn build_file_list(entries: &[SitEntry]) -> Result<Vec<ExtractedFile>> {
    let mut files = Vec::new();
    for ent in entries {
        let has_data = ent.data_fork.raw_len > 0;
        let has_rsrc = ent.rsrc_fork.as_ref().is_some_and(|f| f.raw_len > 0);
        if !has_data && !has_rsrc {
            continue;
        }

        let data_fork = if has_data {
            decompress_fork(&ent.data_fork)?
        } else {
            Vec::new()
        };
        let resource_fork = match &ent.rsrc_fork {
            Some(fork) if fork.raw_len > 0 => decompress_fork(fork)?,
            _ => Vec::new(),
        };

        files.push(ExtractedFile {
            meta: FileMeta {
                name: ent.name.clone(),
                mac_type: ent.mac_type,
                mac_creator: ent.mac_creator,
                finder_flags: ent.finder_flags,
            },
            data_fork,
            resource_fork,
        });
    }
    Ok(files)
}

/// Parse and extract all files from a StuffIt archive, classic or SIT5.
/// When both magics appear, the earliest match wins.
pub fn peel_sit(src: &[u8]) -> Result<Vec<ExtractedFile>> {
    let classic_off = find_classic_magic(src);
    let sit5_off = find_sit5_magic(src);

    let entries = match (classic_off, sit5_off) {
        (Some(c), Some(s)) if c <= s => parse_classic(&src[c..])?,
        (Some(c), None) => parse_classic(&src[c..])?,
        (_, Some(s)) => parse_sit5(&src[s..])?,
        (None, None) => {
            return Err(PeelError::Format(
                "SIT: no valid StuffIt signature found".into(),
            ))
        }
    };

    build_file_list(&entries)
}
