// In: src/error.rs

//! This module defines the single, unified error type for the entire tessera
//! scan core. It uses the `thiserror` crate to provide ergonomic,
//! context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TesseraError {
    // =========================================================================
    // === High-Level, Semantic Errors (Specific to this library's logic)
    // =========================================================================
    /// Explicit row-group offsets did not all resolve to blocks in the footer.
    /// This is an internal-consistency failure: the caller's view of the file
    /// is stale relative to the file actually being opened. Never retried.
    #[error(
        "all row-group offsets listed in the split should be found in the file. \
         expected: {expected:?} matched: {found:?} out of: {available:?} in range {range}"
    )]
    ConsistencyViolation {
        expected: Vec<u64>,
        found: Vec<u64>,
        available: Vec<u64>,
        range: String,
    },

    /// A requested column name does not exist in the file schema.
    #[error("can only project existing columns. Unknown field: {column}. File schema: {schema}")]
    SchemaValidation { column: String, schema: String },

    /// Malformed or truncated level-encoding bytes for one page, wrapped with
    /// the column descriptor for diagnosability.
    #[error("could not read levels in page for column {descriptor}: {source}")]
    LevelDecode {
        descriptor: String,
        #[source]
        source: Box<TesseraError>,
    },

    /// The caller-supplied read-support factory could not produce a strategy.
    #[error("could not construct read support strategy: {0}")]
    Configuration(String),

    #[error("footer format error: {0}")]
    FooterFormat(String),

    #[error("unsupported data type for this operation: {0}")]
    UnsupportedType(String),

    #[error("internal logic error (this is a bug): {0}")]
    Internal(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the Arrow library.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically during footer
    /// serialization.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    // =========================================================================
    // === Low-Level Kernel Errors
    // =========================================================================
    #[error("RLE/bit-packed hybrid decoding error: {0}")]
    HybridDecodeError(String),

    #[error("LEB128 decoding error: {0}")]
    Leb128DecodeError(String),

    #[error("bitpack decoding failed due to truncated buffer or data corruption")]
    BitpackDecodeError,
}
