//! StuffIt method 15 ("Arsenic") decompressor.
//!
//! A block-based pipeline driven end-to-end by adaptive arithmetic coding:
//!
//!   arithmetic decode -> zero-run expand -> MTF invert -> inverse BWT
//!     -> randomization de-scramble -> final run-length expand
//!
//! The raw bitstream is MSB-first; multi-bit fields that travel through the
//! arithmetic coder are assembled from individual bit decodes LSB-first.

use crate::{PeelError, Result};

/// Arithmetic coder precision.
const AC_PRECISION: i32 = 26;
const AC_ONE: i32 = 1 << (AC_PRECISION - 1);
const AC_HALF: i32 = 1 << (AC_PRECISION - 2);

/// MSB-first bitstream: bytes enter the high end of a left-aligned 32-bit
/// shift register.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    window: u32,
    avail: i32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            window: 0,
            avail: 0,
        }
    }

    fn refill(&mut self) {
        while self.avail <= 24 && self.pos < self.data.len() {
            self.window |= (self.data[self.pos] as u32) << (24 - self.avail);
            self.pos += 1;
            self.avail += 8;
        }
    }

    /// Read 1..=25 bits.
    fn read(&mut self, n: i32) -> Result<u32> {
        if n > self.avail {
            self.refill();
            if n > self.avail {
                return Err(PeelError::Decode("sit15: bitstream exhaustion".into()));
            }
        }
        let v = self.window >> (32 - n);
        self.window <<= n;
        self.avail -= n;
        Ok(v)
    }

    /// Read fields wider than 25 bits in two pieces.
    fn read_long(&mut self, n: i32) -> Result<u32> {
        if n <= 25 {
            return self.read(n);
        }
        let hi = self.read(25)?;
        let lo = self.read(n - 25)?;
        Ok((hi << (n - 25)) | lo)
    }
}

/// Adaptive per-symbol frequency model with periodic halving.
struct Model {
    base_sym: i32,
    step: i32,
    ceiling: i32,
    total: i32,
    freq: Vec<i32>,
}

impl Model {
    fn new(lo: i32, hi: i32, step: i32, ceiling: i32) -> Self {
        let nsyms = (hi - lo + 1) as usize;
        Self {
            base_sym: lo,
            step,
            ceiling,
            total: nsyms as i32 * step,
            freq: vec![step; nsyms],
        }
    }

    fn reset(&mut self) {
        self.total = self.freq.len() as i32 * self.step;
        self.freq.fill(self.step);
    }

    fn bump(&mut self, idx: usize) {
        self.freq[idx] += self.step;
        self.total += self.step;
        if self.total > self.ceiling {
            // Halve with round-up; no frequency can reach zero.
            self.total = 0;
            for f in &mut self.freq {
                *f = (*f + 1) >> 1;
                self.total += *f;
            }
        }
    }
}

/// Arithmetic decoder range/code register pair.
struct ArithDecoder<'a> {
    bits: BitReader<'a>,
    range: i32,
    code: i32,
}

impl<'a> ArithDecoder<'a> {
    fn new(mut bits: BitReader<'a>) -> Result<Self> {
        let code = bits.read_long(AC_PRECISION)? as i32;
        Ok(Self {
            bits,
            range: AC_ONE,
            code,
        })
    }

    fn decode_sym(&mut self, model: &mut Model) -> Result<i32> {
        if model.total == 0 {
            return Err(PeelError::Decode(
                "sit15: model total frequency is zero".into(),
            ));
        }
        let scale = self.range / model.total;
        if scale == 0 {
            return Err(PeelError::Decode(
                "sit15: arithmetic decoder scale is zero".into(),
            ));
        }
        let target = self.code / scale;

        // Walk the cumulative distribution, clamped to the last symbol.
        let mut cum = 0;
        let mut k = 0;
        while k < model.freq.len() - 1 {
            if cum + model.freq[k] > target {
                break;
            }
            cum += model.freq[k];
            k += 1;
        }

        let width = model.freq[k];
        let base_off = scale * cum;
        self.code -= base_off;
        if cum + width == model.total {
            self.range -= base_off;
        } else {
            self.range = width * scale;
        }

        while self.range <= AC_HALF {
            self.range <<= 1;
            self.code = ((self.code as u32) << 1) as i32 | self.bits.read(1)? as i32;
        }

        let sym = model.base_sym + k as i32;
        model.bump(k);
        Ok(sym)
    }

    /// n-bit integer through a binary model, assembled LSB-first.
    fn decode_field(&mut self, model: &mut Model, n: i32) -> Result<i32> {
        let mut val = 0;
        for i in 0..n {
            if self.decode_sym(model)? != 0 {
                val |= 1 << i;
            }
        }
        Ok(val)
    }
}

/// 256-entry randomization table (bzip2 lineage); values drive the
/// positions at which flagged blocks XOR their output with 1.
const RAND_TABLE: [u16; 256] = [
    0xEE, 0x56, 0xF8, 0xC3, 0x9D, 0x9F, 0xAE, 0x2C, 0xAD, 0xCD, 0x24, 0x9D, 0xA6, 0x101, 0x18,
    0xB9, 0xA1, 0x82, 0x75, 0xE9, 0x9F, 0x55, 0x66, 0x6A, 0x86, 0x71, 0xDC, 0x84, 0x56, 0x96,
    0x56, 0xA1, 0x84, 0x78, 0xB7, 0x32, 0x6A, 0x03, 0xE3, 0x02, 0x11, 0x101, 0x08, 0x44, 0x83,
    0x100, 0x43, 0xE3, 0x1C, 0xF0, 0x86, 0x6A, 0x6B, 0x0F, 0x03, 0x2D, 0x86, 0x17, 0x7B, 0x10,
    0xF6, 0x80, 0x78, 0x7A, 0xA1, 0xE1, 0xEF, 0x8C, 0xF6, 0x87, 0x4B, 0xA7, 0xE2, 0x77, 0xFA,
    0xB8, 0x81, 0xEE, 0x77, 0xC0, 0x9D, 0x29, 0x20, 0x27, 0x71, 0x12, 0xE0, 0x6B, 0xD1, 0x7C,
    0x0A, 0x89, 0x7D, 0x87, 0xC4, 0x101, 0xC1, 0x31, 0xAF, 0x38, 0x03, 0x68, 0x1B, 0x76, 0x79,
    0x3F, 0xDB, 0xC7, 0x1B, 0x36, 0x7B, 0xE2, 0x63, 0x81, 0xEE, 0x0C, 0x63, 0x8B, 0x78, 0x38,
    0x97, 0x9B, 0xD7, 0x8F, 0xDD, 0xF2, 0xA3, 0x77, 0x8C, 0xC3, 0x39, 0x20, 0xB3, 0x12, 0x11,
    0x0E, 0x17, 0x42, 0x80, 0x2C, 0xC4, 0x92, 0x59, 0xC8, 0xDB, 0x40, 0x76, 0x64, 0xB4, 0x55,
    0x1A, 0x9E, 0xFE, 0x5F, 0x06, 0x3C, 0x41, 0xEF, 0xD4, 0xAA, 0x98, 0x29, 0xCD, 0x1F, 0x02,
    0xA8, 0x87, 0xD2, 0xA0, 0x93, 0x98, 0xEF, 0x0C, 0x43, 0xED, 0x9D, 0xC2, 0xEB, 0x81, 0xE9,
    0x64, 0x23, 0x68, 0x1E, 0x25, 0x57, 0xDE, 0x9A, 0xCF, 0x7F, 0xE5, 0xBA, 0x41, 0xEA, 0xEA,
    0x36, 0x1A, 0x28, 0x79, 0x20, 0x5E, 0x18, 0x4E, 0x7C, 0x8E, 0x58, 0x7A, 0xEF, 0x91, 0x02,
    0x93, 0xBB, 0x56, 0xA1, 0x49, 0x1B, 0x79, 0x92, 0xF3, 0x58, 0x4F, 0x52, 0x9C, 0x02, 0x77,
    0xAF, 0x2A, 0x8F, 0x49, 0xD0, 0x99, 0x4D, 0x98, 0x101, 0x60, 0x93, 0x100, 0x75, 0x31, 0xCE,
    0x49, 0x20, 0x56, 0x57, 0xE2, 0xF5, 0x26, 0x2B, 0x8A, 0xBF, 0xDE, 0xD0, 0x83, 0x34, 0xF4,
    0x17,
];

/// Group model parameters: MTF index ranges with their increments.
const GROUP_LO: [i32; 7] = [2, 4, 8, 16, 32, 64, 128];
const GROUP_HI: [i32; 7] = [3, 7, 15, 31, 63, 127, 255];
const GROUP_STEP: [i32; 7] = [8, 4, 4, 4, 2, 2, 1];

struct ArsenicDecoder<'a> {
    ac: ArithDecoder<'a>,
    eos: bool,

    /// Persists across blocks; every header/footer field travels through it.
    primary: Model,
    selector: Model,
    groups: [Model; 7],

    block_exp: i32,
    blk_cap: usize,

    blk_buf: Vec<u8>,
    lf_map: Vec<u32>,
    blk_len: usize,
    bwt_origin: usize,

    out_pos: usize,
    bwt_idx: usize,

    randomized: bool,
    rand_ti: usize,
    rand_next: usize,

    rle_prev: u8,
    rle_streak: u32,
    rle_repeat: u32,
}

impl<'a> ArsenicDecoder<'a> {
    /// Bootstrap the arithmetic decoder and parse the stream header:
    /// signature, block-size exponent, initial end-of-stream flag.
    fn new(src: &'a [u8]) -> Result<Self> {
        let mut ac = ArithDecoder::new(BitReader::new(src))?;

        let mut primary = Model::new(0, 1, 1, 256);

        if ac.decode_field(&mut primary, 8)? != 'A' as i32 {
            return Err(PeelError::Format(
                "sit15: invalid signature (expected 'A')".into(),
            ));
        }
        if ac.decode_field(&mut primary, 8)? != 's' as i32 {
            return Err(PeelError::Format(
                "sit15: invalid signature (expected 's')".into(),
            ));
        }

        let block_exp = ac.decode_field(&mut primary, 4)?;
        let blk_cap = 1usize << (block_exp + 9);

        let eos = ac.decode_sym(&mut primary)? != 0;

        Ok(Self {
            ac,
            eos,
            primary,
            selector: Model::new(0, 10, 8, 1024),
            groups: std::array::from_fn(|g| {
                Model::new(GROUP_LO[g], GROUP_HI[g], GROUP_STEP[g], 1024)
            }),
            block_exp,
            blk_cap,
            blk_buf: vec![0; blk_cap],
            lf_map: vec![0; blk_cap],
            blk_len: 0,
            bwt_origin: 0,
            out_pos: 0,
            bwt_idx: 0,
            randomized: false,
            rand_ti: 0,
            rand_next: 0,
            rle_prev: 0,
            rle_streak: 0,
            rle_repeat: 0,
        })
    }

    /// Accumulate a zero-run from the selector stream.  Token t at ordinal
    /// position p contributes (t + 1) << p; the first selector >= 2 ends
    /// the run and becomes the caller's current token.
    fn consume_zero_run(&mut self, first_tok: i32) -> Result<(usize, i32)> {
        let mut total = 0usize;
        let mut bit_pos = 0;
        let mut tok = first_tok;
        loop {
            total += ((tok + 1) as usize) << bit_pos;
            bit_pos += 1;
            tok = self.ac.decode_sym(&mut self.selector)?;
            if tok >= 2 {
                return Ok((total, tok));
            }
        }
    }

    /// Decode one complete block: selector loop, MTF inversion, LF-map
    /// construction, model resets, and the footer EOS flag.
    fn decode_block(&mut self) -> Result<()> {
        self.selector.reset();
        for g in &mut self.groups {
            g.reset();
        }
        let mut mtf: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mtf_decode = |mtf: &mut [u8; 256], idx: usize| -> u8 {
            let val = mtf[idx];
            mtf.copy_within(0..idx, 1);
            mtf[0] = val;
            val
        };

        // Block header travels through the primary model.
        self.randomized = self.ac.decode_sym(&mut self.primary)? != 0;
        self.bwt_origin = self.ac.decode_field(&mut self.primary, self.block_exp + 9)? as usize;
        self.blk_len = 0;

        let mut sel = self.ac.decode_sym(&mut self.selector)?;
        while sel != 10 {
            if sel < 2 {
                let (run_len, trailing) = self.consume_zero_run(sel)?;
                if self.blk_len + run_len > self.blk_cap {
                    return Err(PeelError::Decode(
                        "sit15: block buffer overflow (zero run)".into(),
                    ));
                }
                let fill = mtf_decode(&mut mtf, 0);
                self.blk_buf[self.blk_len..self.blk_len + run_len].fill(fill);
                self.blk_len += run_len;
                sel = trailing;
                continue;
            }

            let mtf_idx = if sel == 2 {
                1
            } else {
                self.ac.decode_sym(&mut self.groups[sel as usize - 3])? as usize
            };
            if self.blk_len >= self.blk_cap {
                return Err(PeelError::Decode("sit15: block buffer overflow".into()));
            }
            self.blk_buf[self.blk_len] = mtf_decode(&mut mtf, mtf_idx);
            self.blk_len += 1;

            sel = self.ac.decode_sym(&mut self.selector)?;
        }

        if self.blk_len > 0 && self.bwt_origin >= self.blk_len {
            return Err(PeelError::Decode(
                "sit15: BWT primary index out of bounds".into(),
            ));
        }

        // Footer: per-block models reset, then the end-of-stream flag via
        // the primary model, with a discarded CRC field when set.
        self.selector.reset();
        for g in &mut self.groups {
            g.reset();
        }
        if self.ac.decode_sym(&mut self.primary)? != 0 {
            self.ac.decode_field(&mut self.primary, 32)?;
            self.eos = true;
        }

        if self.blk_len > 0 {
            build_lf_map(&mut self.lf_map, &self.blk_buf[..self.blk_len]);
        }

        self.out_pos = 0;
        self.bwt_idx = self.bwt_origin;
        self.rand_ti = 0;
        self.rand_next = RAND_TABLE[0] as usize;
        self.rle_prev = 0;
        self.rle_streak = 0;
        self.rle_repeat = 0;
        Ok(())
    }

    /// One byte from the inverse BWT, de-scrambled when randomization is on.
    fn emit_bwt_byte(&mut self) -> Result<u8> {
        self.bwt_idx = self.lf_map[self.bwt_idx] as usize;
        if self.bwt_idx >= self.blk_len {
            return Err(PeelError::Decode("sit15: BWT index out of bounds".into()));
        }
        let mut b = self.blk_buf[self.bwt_idx];

        if self.randomized && self.rand_next == self.out_pos {
            b ^= 1;
            self.rand_ti = (self.rand_ti + 1) & 0xFF;
            self.rand_next += RAND_TABLE[self.rand_ti] as usize;
        }
        self.out_pos += 1;
        Ok(b)
    }

    /// One decompressed byte through the final run-length stage.  After 4
    /// identical bytes the next upstream byte is an extension count.
    fn produce_byte(&mut self) -> Result<u8> {
        loop {
            if self.rle_repeat > 0 {
                self.rle_repeat -= 1;
                return Ok(self.rle_prev);
            }

            if self.out_pos >= self.blk_len {
                if self.eos {
                    return Err(PeelError::Decode("sit15: unexpected end of stream".into()));
                }
                self.decode_block()?;
                continue;
            }

            let b = self.emit_bwt_byte()?;

            if self.rle_streak == 4 {
                self.rle_streak = 0;
                if b > 0 {
                    self.rle_repeat = b as u32 - 1;
                    return Ok(self.rle_prev);
                }
                // Count 0: the run was exactly 4; the count byte vanishes.
                continue;
            }

            if b != self.rle_prev {
                self.rle_prev = b;
                self.rle_streak = 1;
            } else {
                self.rle_streak += 1;
            }
            return Ok(b);
        }
    }
}

/// Counting LF-mapping for the inverse BWT.
fn build_lf_map(map: &mut [u32], buf: &[u8]) {
    let mut freq = [0usize; 256];
    for &b in buf {
        freq[b as usize] += 1;
    }

    let mut base = [0usize; 256];
    let mut acc = 0;
    for c in 0..256 {
        base[c] = acc;
        acc += freq[c];
    }

    let mut seen = [0usize; 256];
    for (i, &b) in buf.iter().enumerate() {
        let c = b as usize;
        map[base[c] + seen[c]] = i as u32;
        seen[c] += 1;
    }
}

/// Decompress a method-15 stream into exactly `uncomp_len` bytes.
///
/// Integrity is internal to the format (the footer CRC is read and
/// discarded), so the caller performs no container CRC check.
pub(crate) fn decompress(src: &[u8], uncomp_len: usize) -> Result<Vec<u8>> {
    if uncomp_len == 0 {
        return Ok(Vec::new());
    }

    let mut dec = ArsenicDecoder::new(src)?;
    let mut out = Vec::with_capacity(uncomp_len);
    for _ in 0..uncomp_len {
        out.push(dec.produce_byte()?);
    }
    Ok(out)
}
