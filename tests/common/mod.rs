//! Fixture builders shared by the integration tests.
//!
//! Archive creation is out of scope for the crate itself, so each builder
//! lives here and produces bit-exact on-disk layouts for the decoders to
//! consume.

#![allow(dead_code)]

// ---------------------------------------------------------------------------
// CRC-16 (duplicated here so fixtures do not lean on crate internals)
// ---------------------------------------------------------------------------

pub fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &b in data {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

pub fn crc16_ibm(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &b in data {
        crc ^= b as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

// ---------------------------------------------------------------------------
// BinHex 4.0 encoder
// ---------------------------------------------------------------------------

const HQX_ALPHABET: &[u8; 64] =
    b"!\"#$%&'()*+,-012345689@ABCDEFGHIJKLMNPQRSTUVXYZ[`abcdefhijklmpqr";

/// Build the decoded BinHex container: header + forks, each CRC-terminated.
pub fn hqx_container(
    name: &[u8],
    mac_type: &[u8; 4],
    creator: &[u8; 4],
    finder_flags: u16,
    data: &[u8],
    rsrc: &[u8],
) -> Vec<u8> {
    let mut hdr = Vec::new();
    hdr.push(name.len() as u8);
    hdr.extend_from_slice(name);
    hdr.push(0);
    hdr.extend_from_slice(mac_type);
    hdr.extend_from_slice(creator);
    hdr.extend_from_slice(&finder_flags.to_be_bytes());
    hdr.extend_from_slice(&(data.len() as u32).to_be_bytes());
    hdr.extend_from_slice(&(rsrc.len() as u32).to_be_bytes());
    let crc = crc16_xmodem(&hdr);
    hdr.extend_from_slice(&crc.to_be_bytes());

    let mut out = hdr;
    out.extend_from_slice(data);
    out.extend_from_slice(&crc16_xmodem(data).to_be_bytes());
    out.extend_from_slice(rsrc);
    out.extend_from_slice(&crc16_xmodem(rsrc).to_be_bytes());
    out
}

/// RLE90-compress (trivially: only the mandatory 0x90 escape), 6-bit
/// encode, and wrap in the text envelope with line breaks.
pub fn hqx_wrap(container: &[u8]) -> Vec<u8> {
    let mut rle = Vec::with_capacity(container.len());
    for &b in container {
        rle.push(b);
        if b == 0x90 {
            rle.push(0x00);
        }
    }

    let mut out = b"(This file must be converted with BinHex 4.0)\r\n\r\n:".to_vec();
    let mut acc = 0u32;
    let mut bits = 0u32;
    let mut col = 0;
    let mut push_char = |out: &mut Vec<u8>, ch: u8| {
        out.push(ch);
        col += 1;
        if col == 64 {
            out.push(b'\n');
            col = 0;
        }
    };
    for &b in &rle {
        acc = (acc << 8) | b as u32;
        bits += 8;
        while bits >= 6 {
            bits -= 6;
            push_char(&mut out, HQX_ALPHABET[((acc >> bits) & 0x3F) as usize]);
        }
    }
    if bits > 0 {
        push_char(&mut out, HQX_ALPHABET[((acc << (6 - bits)) & 0x3F) as usize]);
    }
    out.push(b':');
    out.push(b'\n');
    out
}

pub fn hqx_encode(
    name: &[u8],
    mac_type: &[u8; 4],
    creator: &[u8; 4],
    finder_flags: u16,
    data: &[u8],
    rsrc: &[u8],
) -> Vec<u8> {
    hqx_wrap(&hqx_container(name, mac_type, creator, finder_flags, data, rsrc))
}

// ---------------------------------------------------------------------------
// Bit writers
// ---------------------------------------------------------------------------

/// MSB-first bit writer (Compact Pro LZH streams).
pub struct MsbBitWriter {
    out: Vec<u8>,
    acc: u32,
    fill: u32,
}

impl MsbBitWriter {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            acc: 0,
            fill: 0,
        }
    }

    pub fn put(&mut self, val: u32, n: u32) {
        for i in (0..n).rev() {
            self.acc = (self.acc << 1) | ((val >> i) & 1);
            self.fill += 1;
            if self.fill == 8 {
                self.out.push(self.acc as u8);
                self.acc = 0;
                self.fill = 0;
            }
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.fill > 0 {
            self.out.push((self.acc << (8 - self.fill)) as u8);
        }
        self.out
    }
}

/// LSB-first bit writer (StuffIt LZW code streams).
pub struct LsbBitWriter {
    out: Vec<u8>,
    acc: u64,
    fill: u32,
}

impl LsbBitWriter {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            acc: 0,
            fill: 0,
        }
    }

    pub fn put(&mut self, val: u32, n: u32) {
        self.acc |= (val as u64) << self.fill;
        self.fill += n;
        while self.fill >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.fill -= 8;
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.fill > 0 {
            self.out.push(self.acc as u8);
        }
        self.out
    }
}

// ---------------------------------------------------------------------------
// MacBinary II encoder
// ---------------------------------------------------------------------------

pub fn macbinary_encode(name: &[u8], data: &[u8], rsrc: &[u8]) -> Vec<u8> {
    let pad = |n: usize| (128 - (n % 128)) % 128;

    let mut hdr = [0u8; 128];
    hdr[1] = name.len() as u8;
    hdr[2..2 + name.len()].copy_from_slice(name);
    hdr[65..69].copy_from_slice(b"APPL");
    hdr[69..73].copy_from_slice(b"aust");
    hdr[82] = 129; // MacBinary II version
    hdr[83..87].copy_from_slice(&(data.len() as u32).to_be_bytes());
    hdr[87..91].copy_from_slice(&(rsrc.len() as u32).to_be_bytes());
    let crc = crc16_xmodem(&hdr[..124]);
    hdr[124..126].copy_from_slice(&crc.to_be_bytes());

    let mut out = hdr.to_vec();
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(0).take(pad(data.len())));
    out.extend_from_slice(rsrc);
    out.extend(std::iter::repeat(0).take(pad(rsrc.len())));
    out
}

// ---------------------------------------------------------------------------
// StuffIt classic encoder (store / RLE90 / LZW payloads prepared by caller)
// ---------------------------------------------------------------------------

pub enum ClassicEntry<'a> {
    FolderStart(&'a [u8]),
    FolderEnd,
    File {
        name: &'a [u8],
        mac_type: [u8; 4],
        creator: [u8; 4],
        finder_flags: u16,
        /// (method, uncompressed content, compressed bytes)
        data: (u8, &'a [u8], Vec<u8>),
        rsrc: (u8, &'a [u8], Vec<u8>),
    },
}

pub fn sit_classic_encode(entries: &[ClassicEntry]) -> Vec<u8> {
    let mut body = Vec::new();
    for entry in entries {
        let mut hdr = [0u8; 112];
        match entry {
            ClassicEntry::FolderStart(name) => {
                hdr[0] = 0x20;
                hdr[1] = 0x20;
                hdr[2] = name.len() as u8;
                hdr[3..3 + name.len()].copy_from_slice(name);
                body.extend_from_slice(&hdr);
            }
            ClassicEntry::FolderEnd => {
                hdr[0] = 0x21;
                hdr[1] = 0x21;
                body.extend_from_slice(&hdr);
            }
            ClassicEntry::File {
                name,
                mac_type,
                creator,
                finder_flags,
                data,
                rsrc,
            } => {
                hdr[0] = rsrc.0;
                hdr[1] = data.0;
                hdr[2] = name.len() as u8;
                hdr[3..3 + name.len()].copy_from_slice(name);
                hdr[66..70].copy_from_slice(mac_type);
                hdr[70..74].copy_from_slice(creator);
                hdr[74..76].copy_from_slice(&finder_flags.to_be_bytes());
                hdr[84..88].copy_from_slice(&(rsrc.1.len() as u32).to_be_bytes());
                hdr[88..92].copy_from_slice(&(data.1.len() as u32).to_be_bytes());
                hdr[92..96].copy_from_slice(&(rsrc.2.len() as u32).to_be_bytes());
                hdr[96..100].copy_from_slice(&(data.2.len() as u32).to_be_bytes());
                hdr[100..102].copy_from_slice(&crc16_ibm(rsrc.1).to_be_bytes());
                hdr[102..104].copy_from_slice(&crc16_ibm(data.1).to_be_bytes());
                let crc = crc16_ibm(&hdr[..110]);
                hdr[110..112].copy_from_slice(&crc.to_be_bytes());
                body.extend_from_slice(&hdr);
                body.extend_from_slice(&rsrc.2);
                body.extend_from_slice(&data.2);
            }
        }
    }

    let mut out = Vec::with_capacity(22 + body.len());
    out.extend_from_slice(b"SIT!");
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    out.extend_from_slice(&((22 + body.len()) as u32).to_be_bytes());
    out.extend_from_slice(b"rLau");
    out.push(1); // version
    out.extend_from_slice(&[0u8; 7]);
    out.extend_from_slice(&body);
    out
}

/// RLE90-compress for classic method 1.
pub fn rle90_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        let mut run = 1;
        while i + run < data.len() && data[i + run] == b && run < 254 {
            run += 1;
        }
        if b == 0x90 {
            for _ in 0..run {
                out.push(0x90);
                out.push(0x00);
            }
        } else if run >= 3 {
            out.push(b);
            out.push(0x90);
            out.push(run as u8);
        } else {
            for _ in 0..run {
                out.push(b);
            }
        }
        i += run;
    }
    out
}

// ---------------------------------------------------------------------------
// SIT5 encoder
// ---------------------------------------------------------------------------

pub struct Sit5File<'a> {
    pub name: &'a [u8],
    /// Offset of the parent folder's entry header, 0 for root.
    pub parent_off: u32,
    pub mac_type: [u8; 4],
    pub creator: [u8; 4],
    pub finder_flags: u16,
    pub data_method: u8,
    pub data_uncomp_len: u32,
    pub data_crc: u16,
    pub data_payload: Vec<u8>,
    /// None for no resource fork; Some((method, uncomp_len, crc, payload)).
    pub rsrc: Option<(u8, u32, u16, Vec<u8>)>,
}

pub struct Sit5Builder {
    out: Vec<u8>,
    file_count: u16,
}

impl Sit5Builder {
    pub fn new() -> Self {
        let mut out = Vec::new();
        out.extend_from_slice(b"StuffIt (c)1997-2002");
        out.extend_from_slice(b" Aladdin Systems, Inc., http://www.aladdinsys.com/StuffIt/");
        out.extend_from_slice(b"\r\n");
        assert_eq!(out.len(), 80);
        out.extend_from_slice(&[0x1A, 0x00]); // 80..82
        out.push(5); // version
        out.push(0x10); // flags
        out.extend_from_slice(&[0u8; 8]); // total size + first offset, unused
        out.extend_from_slice(&[0u8; 8]); // 92..100 patched in finish()
        Self { out, file_count: 0 }
    }

    /// Current offset; the next entry lands here.
    pub fn offset(&self) -> u32 {
        self.out.len() as u32
    }

    fn entry_header1(
        &mut self,
        flags: u8,
        parent_off: u32,
        name: &[u8],
        d_uncomp: u32,
        d_comp: u32,
        d_crc: u16,
        byte46: u8,
        byte47: u8,
    ) {
        let h1_len = 48 + name.len() as u16;
        let start = self.out.len();
        self.out.extend_from_slice(&0xA5A5_A5A5u32.to_be_bytes());
        self.out.push(1); // version
        self.out.push(0);
        self.out.extend_from_slice(&h1_len.to_be_bytes());
        self.out.push(0);
        self.out.push(flags);
        self.out.extend_from_slice(&[0u8; 8]); // ctime + mtime
        self.out.extend_from_slice(&[0u8; 8]); // prev + next offsets
        self.out.extend_from_slice(&parent_off.to_be_bytes());
        self.out
            .extend_from_slice(&(name.len() as u16).to_be_bytes());
        self.out.extend_from_slice(&[0u8; 2]); // CRC placeholder
        self.out.extend_from_slice(&d_uncomp.to_be_bytes());
        self.out.extend_from_slice(&d_comp.to_be_bytes());
        self.out.extend_from_slice(&d_crc.to_be_bytes());
        self.out.extend_from_slice(&[0u8; 2]);
        self.out.push(byte46);
        self.out.push(byte47);
        self.out.extend_from_slice(name);

        let end = self.out.len();
        let mut tmp = self.out[start..end].to_vec();
        tmp[32] = 0;
        tmp[33] = 0;
        let crc = crc16_ibm(&tmp);
        self.out[start + 32..start + 34].copy_from_slice(&crc.to_be_bytes());
    }

    fn entry_header2(&mut self, flags2: u16, mac_type: &[u8; 4], creator: &[u8; 4], fflags: u16) {
        self.out.extend_from_slice(&flags2.to_be_bytes());
        self.out.extend_from_slice(&[0u8; 2]);
        self.out.extend_from_slice(mac_type);
        self.out.extend_from_slice(creator);
        self.out.extend_from_slice(&fflags.to_be_bytes());
        self.out.extend_from_slice(&[0u8; 22]); // version-1 padding
    }

    /// Add a folder; returns its header offset for children to reference.
    pub fn folder(&mut self, name: &[u8], parent_off: u32, child_count: u16) -> u32 {
        let off = self.offset();
        let cc = child_count.to_be_bytes();
        self.entry_header1(0x40, parent_off, name, 0, 0, 0, cc[0], cc[1]);
        self.entry_header2(0, &[0; 4], &[0; 4], 0);
        off
    }

    pub fn file(&mut self, f: &Sit5File) {
        let flags2 = if f.rsrc.is_some() { 1 } else { 0 };
        self.entry_header1(
            0,
            f.parent_off,
            f.name,
            f.data_uncomp_len,
            f.data_payload.len() as u32,
            f.data_crc,
            f.data_method,
            0,
        );
        self.entry_header2(flags2, &f.mac_type, &f.creator, f.finder_flags);

        if let Some((method, uncomp, crc, payload)) = &f.rsrc {
            self.out.extend_from_slice(&uncomp.to_be_bytes());
            self.out
                .extend_from_slice(&(payload.len() as u32).to_be_bytes());
            self.out.extend_from_slice(&crc.to_be_bytes());
            self.out.extend_from_slice(&[0u8; 2]);
            self.out.push(*method);
            self.out.push(0); // password length
            self.out.extend_from_slice(payload);
        }
        self.out.extend_from_slice(&f.data_payload);
        self.file_count += 1;
    }

    pub fn finish(mut self) -> Vec<u8> {
        let count = self.file_count.to_be_bytes();
        self.out[92..94].copy_from_slice(&count);
        self.out[94..98].copy_from_slice(&100u32.to_be_bytes());
        self.out
    }
}

// ---------------------------------------------------------------------------
// Arsenic (method 15) encoder
// ---------------------------------------------------------------------------

const AC_ONE: u32 = 1 << 25;
const AC_HALF: u32 = 1 << 24;

pub struct ArithModel {
    base: i32,
    step: i32,
    ceiling: i32,
    total: i32,
    freq: Vec<i32>,
}

impl ArithModel {
    pub fn new(lo: i32, hi: i32, step: i32, ceiling: i32) -> Self {
        let n = (hi - lo + 1) as usize;
        Self {
            base: lo,
            step,
            ceiling,
            total: n as i32 * step,
            freq: vec![step; n],
        }
    }

    fn bump(&mut self, idx: usize) {
        self.freq[idx] += self.step;
        self.total += self.step;
        if self.total > self.ceiling {
            self.total = 0;
            for f in &mut self.freq {
                *f = (*f + 1) >> 1;
                self.total += *f;
            }
        }
    }
}

/// Arithmetic encoder forming the exact bit-level inverse of the decoder's
/// range/code recurrence.
pub struct ArithEncoder {
    out: Vec<u8>,
    range: u32,
    low: u32,
    pending: u32,
    bit_buf: u8,
    nbits: u32,
}

impl ArithEncoder {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            range: AC_ONE,
            low: 0,
            pending: 0,
            bit_buf: 0,
            nbits: 0,
        }
    }

    fn write_bit(&mut self, bit: u8) {
        self.bit_buf = (self.bit_buf << 1) | bit;
        self.nbits += 1;
        if self.nbits == 8 {
            self.out.push(self.bit_buf);
            self.bit_buf = 0;
            self.nbits = 0;
        }
    }

    fn write_bit_pending(&mut self, bit: u8) {
        self.write_bit(bit);
        while self.pending > 0 {
            self.write_bit(1 - bit);
            self.pending -= 1;
        }
    }

    pub fn encode(&mut self, m: &mut ArithModel, sym: i32) {
        let idx = (sym - m.base) as usize;
        let cum: i32 = m.freq[..idx].iter().sum();
        let width = m.freq[idx];

        let scale = self.range / m.total as u32;
        let low_incr = scale * cum as u32;
        self.low += low_incr;
        if cum + width == m.total {
            self.range -= low_incr;
        } else {
            self.range = width as u32 * scale;
        }

        while self.range <= AC_HALF {
            if self.low >= AC_ONE {
                self.write_bit_pending(1);
                self.low -= AC_ONE;
            } else if self.low + self.range <= AC_ONE {
                self.write_bit_pending(0);
            } else {
                self.pending += 1;
                self.low -= AC_HALF;
            }
            self.range <<= 1;
            self.low <<= 1;
        }

        m.bump(idx);
    }

    /// n-bit field, LSB-first, through a binary model.
    pub fn encode_field(&mut self, m: &mut ArithModel, val: u32, n: u32) {
        for i in 0..n {
            self.encode(m, ((val >> i) & 1) as i32);
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.pending += 1;
        if self.low < AC_HALF {
            self.write_bit_pending(0);
        } else {
            self.write_bit_pending(1);
        }
        if self.nbits > 0 {
            let pad = self.bit_buf << (8 - self.nbits);
            self.out.push(pad);
        }
        // Trailing zeros keep the decoder's renormalization fed while it
        // resolves the last symbols.
        self.out.extend_from_slice(&[0u8; 8]);
        self.out
    }
}

/// Forward Burrows-Wheeler transform: (last column, primary index).
fn bwt_forward(data: &[u8]) -> (Vec<u8>, usize) {
    let n = data.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| {
        for i in 0..n {
            let ca = data[(a + i) % n];
            let cb = data[(b + i) % n];
            if ca != cb {
                return ca.cmp(&cb);
            }
        }
        std::cmp::Ordering::Equal
    });

    let mut out = Vec::with_capacity(n);
    let mut primary = 0;
    for (i, &idx) in indices.iter().enumerate() {
        out.push(data[(idx + n - 1) % n]);
        if idx == 0 {
            primary = i;
        }
    }
    (out, primary)
}

fn mtf_encode(data: &[u8]) -> Vec<u8> {
    let mut table: Vec<u8> = (0..=255).collect();
    let mut out = Vec::with_capacity(data.len());
    for &b in data {
        let pos = table.iter().position(|&x| x == b).unwrap();
        out.push(pos as u8);
        if pos > 0 {
            table.remove(pos);
            table.insert(0, b);
        }
    }
    out
}

/// Pre-encode the final-RLE layer: every run of four identical bytes is
/// followed by an extension count.
fn final_rle_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        let mut run = 1;
        while i + run < data.len() && data[i + run] == b {
            run += 1;
        }
        let mut left = run;
        while left > 0 {
            if left < 4 {
                out.extend(std::iter::repeat(b).take(left));
                left = 0;
            } else {
                let chunk = left.min(4 + 255);
                out.extend(std::iter::repeat(b).take(4));
                out.push((chunk - 4) as u8);
                left -= chunk;
            }
        }
        i += run;
    }
    out
}

const GROUP_LO: [i32; 7] = [2, 4, 8, 16, 32, 64, 128];
const GROUP_HI: [i32; 7] = [3, 7, 15, 31, 63, 127, 255];
const GROUP_STEP: [i32; 7] = [8, 4, 4, 4, 2, 2, 1];

/// Compress `data` as a single-block Arsenic stream.
pub fn arsenic_encode(data: &[u8], block_exp: u32) -> Vec<u8> {
    let rle_data = final_rle_encode(data);
    assert!(!rle_data.is_empty());
    assert!(rle_data.len() <= 1 << (block_exp + 9));

    let (bwt, primary_index) = bwt_forward(&rle_data);
    let mtf = mtf_encode(&bwt);

    let mut enc = ArithEncoder::new();
    let mut primary = ArithModel::new(0, 1, 1, 256);

    enc.encode_field(&mut primary, 'A' as u32, 8);
    enc.encode_field(&mut primary, 's' as u32, 8);
    enc.encode_field(&mut primary, block_exp, 4);
    enc.encode(&mut primary, 0); // initial end-of-stream flag: clear

    // Block header.
    enc.encode(&mut primary, 0); // not randomized
    enc.encode_field(&mut primary, primary_index as u32, block_exp + 9);

    // Block data: selector stream plus group-model symbols.
    let mut selector = ArithModel::new(0, 10, 8, 1024);
    let mut groups: Vec<ArithModel> = (0..7)
        .map(|g| ArithModel::new(GROUP_LO[g], GROUP_HI[g], GROUP_STEP[g], 1024))
        .collect();

    let mut i = 0;
    while i < mtf.len() {
        let val = mtf[i] as i32;
        if val == 0 {
            let mut run = 1;
            while i + run < mtf.len() && mtf[i + run] == 0 {
                run += 1;
            }
            // Bijective base-2: token t at position p contributes (t+1)<<p.
            let mut remaining = run;
            while remaining > 0 {
                if remaining == 1 {
                    enc.encode(&mut selector, 0);
                    remaining = 0;
                } else if remaining == 2 {
                    enc.encode(&mut selector, 1);
                    remaining = 0;
                } else {
                    let bit = ((remaining - 1) & 1) as i32;
                    enc.encode(&mut selector, bit);
                    remaining = (remaining - 1) / 2;
                }
            }
            i += run;
        } else {
            if val == 1 {
                enc.encode(&mut selector, 2);
            } else {
                let g = GROUP_LO
                    .iter()
                    .zip(GROUP_HI.iter())
                    .position(|(&lo, &hi)| val >= lo && val <= hi)
                    .unwrap();
                enc.encode(&mut selector, g as i32 + 3);
                enc.encode(&mut groups[g], val);
            }
            i += 1;
        }
    }
    enc.encode(&mut selector, 10); // end of block

    // Footer: final block, so the end-of-stream flag is set and a 32-bit
    // CRC field follows (the decoder discards it).
    enc.encode(&mut primary, 1);
    enc.encode_field(&mut primary, 0, 32);

    enc.finish()
}
