// In: src/levels.rs

//! Decoding of definition and repetition level streams.
//!
//! A page's level stream has one of three shapes: absent entirely (the column
//! is flat and required, so every level is zero), RLE/bit-packed hybrid
//! encoded, or folded into a generic value decoder shared with the data
//! stream. `LevelIterator` hides the distinction behind a single `next_level`
//! cursor; the variant is chosen once at construction, so decode loops pay no
//! per-call dispatch on representation.

use crate::error::TesseraError;
use crate::kernels::hybrid::HybridDecoder;
use crate::traits::LevelValueReader;
use crate::types::ColumnDescriptor;

/// Number of bits needed to store values in `0..=max_level`.
pub fn bit_width_for_max_level(max_level: u32) -> u8 {
    (32 - max_level.leading_zeros()) as u8
}

/// A lazy, per-page cursor over one column's decoded level stream.
///
/// Instances are scoped to one page of one column: they are created when the
/// page's decode begins and discarded when it completes, and are never shared
/// across threads. Callers must not read more levels than the page's declared
/// value count.
pub enum LevelIterator<'a> {
    /// Nesting is structurally impossible for this column; every level is
    /// zero and no decoder is allocated at all.
    Constant,
    /// Hybrid-encoded level stream, the common case.
    Rle(RleLevelReader<'a>),
    /// Levels share a decoder with the value stream; delegate to it.
    Values(Box<dyn LevelValueReader + 'a>),
}

impl<'a> LevelIterator<'a> {
    /// Returns the next level, advancing the cursor.
    pub fn next_level(&mut self) -> Result<u32, TesseraError> {
        match self {
            LevelIterator::Constant => Ok(0),
            LevelIterator::Rle(reader) => reader.next_level(),
            LevelIterator::Values(delegate) => delegate.read_integer(),
        }
    }
}

/// The hybrid-decoding variant, tagged with its column for diagnostics.
pub struct RleLevelReader<'a> {
    decoder: HybridDecoder<'a>,
    descriptor: String,
}

impl<'a> RleLevelReader<'a> {
    fn next_level(&mut self) -> Result<u32, TesseraError> {
        self.decoder
            .read_value()
            .map_err(|e| TesseraError::LevelDecode {
                descriptor: self.descriptor.clone(),
                source: Box::new(e),
            })
    }
}

/// Creates the level iterator for one page of one column.
///
/// `max_level == 0` yields the constant-zero variant; otherwise the page's
/// encoded bytes are wrapped in a hybrid decoder sized to the smallest bit
/// width that can hold `max_level`. A malformed byte range surfaces as a
/// decode error carrying the column descriptor.
pub fn create_level_iterator<'a>(
    max_level: u32,
    bytes: &'a [u8],
    descriptor: &ColumnDescriptor,
) -> Result<LevelIterator<'a>, TesseraError> {
    if max_level == 0 {
        return Ok(LevelIterator::Constant);
    }
    let decoder = HybridDecoder::new(bit_width_for_max_level(max_level), bytes).map_err(|e| {
        TesseraError::LevelDecode {
            descriptor: descriptor.to_string(),
            source: Box::new(e),
        }
    })?;
    Ok(LevelIterator::Rle(RleLevelReader {
        decoder,
        descriptor: descriptor.to_string(),
    }))
}

/// Wraps a generic value reader whose integers happen to represent levels.
/// Used when a column's level and value streams share one decoder.
pub fn level_iterator_from_values<'a>(
    delegate: Box<dyn LevelValueReader + 'a>,
) -> LevelIterator<'a> {
    LevelIterator::Values(delegate)
}

//==================================================================================
// Unit Tests
//==================================================================================
