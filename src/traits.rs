// In: src/traits.rs

//! The collaborator seams of the scan core.
//!
//! Footer parsing, physical I/O, predicate evaluation, and schema negotiation
//! are all owned by the calling engine; this module defines the traits those
//! collaborators are plugged in through. The core applies them and aggregates
//! their results but never implements the underlying behavior itself.

use std::collections::{HashMap, HashSet};

use arrow::datatypes::{Schema, SchemaRef};

use crate::config::ByteRange;
use crate::error::TesseraError;
use crate::format::{BlockDescriptor, ColumnChunkMeta, FileFooter};

/// An opaque row-group predicate, evaluated against per-block statistics
/// during selection. The implementation is trusted entirely: a block is read
/// iff `keep` returns true, with no further validation.
pub trait RowGroupFilter: Send + Sync {
    fn keep(&self, block: &BlockDescriptor, file_schema: &Schema) -> bool;
}

/// The pluggable read-support strategy: given the file schema and the file's
/// key/value metadata, returns the schema the scan should request. Invoked
/// exactly once per scan; its output is authoritative.
///
/// Metadata arrives as a set-valued mapping even though footer metadata is
/// single-valued, for forward extensibility.
pub trait ReadSupport {
    fn init(
        &self,
        file_schema: &SchemaRef,
        key_value_metadata: &HashMap<String, HashSet<String>>,
    ) -> Result<SchemaRef, TesseraError>;
}

/// A caller-supplied factory returning a constructed read-support strategy.
/// Replaces reflective strategy discovery: a failing factory surfaces as a
/// single `Configuration` error kind.
pub type ReadSupportFactory<'a> = dyn Fn() -> Result<Box<dyn ReadSupport>, TesseraError> + 'a;

/// The default strategy: request the full file schema.
pub struct FullSchemaReadSupport;

impl ReadSupport for FullSchemaReadSupport {
    fn init(
        &self,
        file_schema: &SchemaRef,
        _key_value_metadata: &HashMap<String, HashSet<String>>,
    ) -> Result<SchemaRef, TesseraError> {
        Ok(file_schema.clone())
    }
}

/// Handle to an open underlying block reader.
///
/// The reader exposes the row groups it will actually serve, which may be a
/// subset of what was requested; the scan core consumes that list strictly
/// for row-count aggregation. All calls are synchronous and blocking.
pub trait BlockReader {
    /// The row groups the reader accepted.
    fn row_groups(&self) -> &[BlockDescriptor];

    /// Reads one column chunk's encoded bytes.
    fn read_chunk(&mut self, chunk: &ColumnChunkMeta) -> Result<Vec<u8>, TesseraError>;

    /// Releases the underlying handle. Called at most once by the session.
    fn close(&mut self) -> Result<(), TesseraError>;
}

/// Factory for footers and readers over one file. Owns footer parsing and all
/// file-system access.
pub trait BlockSource {
    /// Reads the file footer, optionally restricted to a byte range (the
    /// range-restricted form is used on the predicate-pushdown path).
    fn read_footer(&self, range: Option<ByteRange>) -> Result<FileFooter, TesseraError>;

    /// Opens a reader over exactly the given blocks and requested columns.
    fn open_reader(
        &self,
        blocks: &[BlockDescriptor],
        requested_schema: &SchemaRef,
    ) -> Result<Box<dyn BlockReader>, TesseraError>;
}

/// A generic typed value-reader whose integers happen to represent levels.
/// Plugged into `LevelIterator::Values` when a column's level and value
/// streams share one decoder.
pub trait LevelValueReader {
    fn read_integer(&mut self) -> Result<u32, TesseraError>;
}
