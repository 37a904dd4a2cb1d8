//! This module contains the kernels for the run-length / bit-packed hybrid
//! encoding used by definition and repetition level streams.
//!
//! The wire format is a sequence of runs, each introduced by a ULEB128
//! header. An even header describes an RLE run: `header >> 1` repetitions of
//! a single value stored in `ceil(bit_width / 8)` little-endian bytes. An odd
//! header describes `header >> 1` groups of eight bit-packed values, packed
//! LSB-first at `bit_width` bits each. This module is PURE RUST, panic-free,
//! and has no I/O dependencies beyond an in-memory cursor.

use bitvec::prelude::*;
use std::io::Cursor;

use super::leb128;
use crate::error::TesseraError;

//==================================================================================
// 1. Streaming Decoder (The Per-Page Cursor)
//==================================================================================

/// A stateful, streaming decoder over one page's hybrid-encoded bytes.
///
/// The decoder is scoped to the page it was built for: it borrows the encoded
/// bytes and must be discarded when the page's decode completes. Reading past
/// the encoded data is a decode error, never undefined behavior.
pub struct HybridDecoder<'a> {
    bit_width: u8,
    cursor: Cursor<&'a [u8]>,
    // State of the current RLE run, if any.
    current_value: u32,
    rle_remaining: u64,
    // Unpacked values of the current bit-packed run, if any.
    packed_buffer: Vec<u32>,
    packed_pos: usize,
}

impl<'a> HybridDecoder<'a> {
    /// Wraps `bytes` in a decoder at the given bit width. The width must be
    /// in `1..=32`; level streams with a width of zero never construct a
    /// decoder at all.
    pub fn new(bit_width: u8, bytes: &'a [u8]) -> Result<Self, TesseraError> {
        if bit_width == 0 || bit_width > 32 {
            return Err(TesseraError::HybridDecodeError(format!(
                "bit width {} is outside the supported range 1..=32",
                bit_width
            )));
        }
        Ok(Self {
            bit_width,
            cursor: Cursor::new(bytes),
            current_value: 0,
            rle_remaining: 0,
            packed_buffer: Vec::new(),
            packed_pos: 0,
        })
    }

    /// Reads the next value from the stream, advancing the cursor.
    pub fn read_value(&mut self) -> Result<u32, TesseraError> {
        loop {
            if self.rle_remaining > 0 {
                self.rle_remaining -= 1;
                return Ok(self.current_value);
            }
            if self.packed_pos < self.packed_buffer.len() {
                let value = self.packed_buffer[self.packed_pos];
                self.packed_pos += 1;
                return Ok(value);
            }
            self.read_next_run()?;
        }
    }

    /// Decodes the next run header and loads its payload.
    fn read_next_run(&mut self) -> Result<(), TesseraError> {
        if self.cursor.position() as usize >= self.cursor.get_ref().len() {
            return Err(TesseraError::HybridDecodeError(
                "Read past the end of the encoded level stream".to_string(),
            ));
        }
        let header: u64 = leb128::decode_one(&mut self.cursor)?;

        if header & 1 == 0 {
            // RLE run: fixed-width little-endian value, repeated.
            let count = header >> 1;
            if count == 0 {
                return Err(TesseraError::HybridDecodeError(
                    "Zero-length RLE run".to_string(),
                ));
            }
            let byte_width = ((self.bit_width as usize) + 7) / 8;
            let start = self.cursor.position() as usize;
            let value_bytes = self
                .cursor
                .get_ref()
                .get(start..start + byte_width)
                .ok_or(TesseraError::BitpackDecodeError)?;
            let mut value: u32 = 0;
            for (i, &b) in value_bytes.iter().enumerate() {
                value |= (b as u32) << (8 * i);
            }
            self.cursor.set_position((start + byte_width) as u64);
            self.current_value = value;
            self.rle_remaining = count;
        } else {
            // Bit-packed run: `groups` groups of eight values, LSB-first.
            let groups = (header >> 1) as usize;
            if groups == 0 {
                return Err(TesseraError::HybridDecodeError(
                    "Zero-length bit-packed run".to_string(),
                ));
            }
            // The header is untrusted input; a corrupt group count must
            // surface as a decode error, not an arithmetic overflow.
            let num_bytes = groups
                .checked_mul(self.bit_width as usize)
                .filter(|n| *n <= self.cursor.get_ref().len())
                .ok_or_else(|| {
                    TesseraError::HybridDecodeError(format!(
                        "Bit-packed run of {} groups exceeds the page payload",
                        groups
                    ))
                })?;
            let start = self.cursor.position() as usize;
            let packed_bytes = self
                .cursor
                .get_ref()
                .get(start..start + num_bytes)
                .ok_or(TesseraError::BitpackDecodeError)?;
            self.cursor.set_position((start + num_bytes) as u64);

            let bits = BitSlice::<u8, Lsb0>::from_slice(packed_bytes);
            let num_values = groups * 8;
            let mut unpacked = Vec::with_capacity(num_values);
            for chunk in bits.chunks(self.bit_width as usize).take(num_values) {
                let mut container = 0u32;
                for (i, bit) in chunk.iter().by_vals().enumerate() {
                    if bit {
                        container |= 1 << i;
                    }
                }
                unpacked.push(container);
            }
            self.packed_buffer = unpacked;
            self.packed_pos = 0;
        }
        Ok(())
    }
}

//==================================================================================
// 2. Stateless Encode / Decode Pair
//==================================================================================

/// Minimum run length worth switching from bit-packing to RLE.
const RLE_RUN_THRESHOLD: usize = 8;

/// The public-facing encode function for this module. Maximal runs of at
/// least eight identical values become RLE runs; everything else is
/// bit-packed in groups of eight, the final group zero-padded.
pub fn encode(
    input_slice: &[u32],
    output_buf: &mut Vec<u8>,
    bit_width: u8,
) -> Result<(), TesseraError> {
    output_buf.clear();
    if bit_width == 0 || bit_width > 32 {
        return Err(TesseraError::HybridDecodeError(format!(
            "bit width {} is outside the supported range 1..=32",
            bit_width
        )));
    }
    let max_value = if bit_width == 32 {
        u32::MAX
    } else {
        (1u32 << bit_width) - 1
    };

    let mut pending: Vec<u32> = Vec::new();
    let mut i = 0;
    while i < input_slice.len() {
        let value = input_slice[i];
        if value > max_value {
            return Err(TesseraError::HybridDecodeError(format!(
                "value {} exceeds bit width {}",
                value, bit_width
            )));
        }
        let mut run_len = 1;
        while i + run_len < input_slice.len() && input_slice[i + run_len] == value {
            run_len += 1;
        }
        i += run_len;

        // A bit-packed run flushed mid-stream must hold a multiple of eight
        // values, so absorb the head of a long run into the open group
        // before switching to RLE. Padding is only legal at end of stream.
        if run_len >= RLE_RUN_THRESHOLD && pending.len() % 8 != 0 {
            let absorb = (8 - pending.len() % 8).min(run_len);
            pending.extend(std::iter::repeat(value).take(absorb));
            run_len -= absorb;
        }

        if run_len >= RLE_RUN_THRESHOLD {
            flush_bit_packed(&pending, output_buf, bit_width)?;
            pending.clear();
            write_rle_run(value, run_len as u64, output_buf, bit_width)?;
        } else {
            pending.extend(std::iter::repeat(value).take(run_len));
        }
    }
    flush_bit_packed(&pending, output_buf, bit_width)?;
    Ok(())
}

/// The public-facing decode function for this module: decodes exactly
/// `num_values` levels into `output_buf`.
pub fn decode(
    input_bytes: &[u8],
    output_buf: &mut Vec<u32>,
    bit_width: u8,
    num_values: usize,
) -> Result<(), TesseraError> {
    output_buf.clear();
    output_buf.reserve(num_values);
    let mut decoder = HybridDecoder::new(bit_width, input_bytes)?;
    for _ in 0..num_values {
        output_buf.push(decoder.read_value()?);
    }
    Ok(())
}

fn write_rle_run(
    value: u32,
    count: u64,
    output_buf: &mut Vec<u8>,
    bit_width: u8,
) -> Result<(), TesseraError> {
    leb128::encode_one(count << 1, output_buf)?;
    let byte_width = ((bit_width as usize) + 7) / 8;
    output_buf.extend_from_slice(&value.to_le_bytes()[..byte_width]);
    Ok(())
}

fn flush_bit_packed(
    values: &[u32],
    output_buf: &mut Vec<u8>,
    bit_width: u8,
) -> Result<(), TesseraError> {
    if values.is_empty() {
        return Ok(());
    }
    let groups = (values.len() + 7) / 8;
    leb128::encode_one(((groups as u64) << 1) | 1, output_buf)?;

    let mut bit_vec = BitVec::<u8, Lsb0>::with_capacity(groups * 8 * bit_width as usize);
    for &value in values {
        bit_vec.extend_from_bitslice(&value.view_bits::<Lsb0>()[..bit_width as usize]);
    }
    // Zero-pad the final group to a full eight values.
    bit_vec.resize(groups * 8 * bit_width as usize, false);
    output_buf.extend_from_slice(bit_vec.as_raw_slice());
    Ok(())
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
