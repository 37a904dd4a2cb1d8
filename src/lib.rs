//! This file is the root of the `tessera_scan` Rust crate.
//!
//! The crate implements the scan core of the tessera columnar reader: given
//! a splittable columnar file, it decides which physical row groups must be
//! read, projects the file's schema down to the requested columns, and
//! decodes the definition/repetition level streams that reconstruct nested
//! and nullable values. Physical I/O, footer parsing, value decoding, and
//! predicate construction are all external collaborators plugged in through
//! the `traits` module.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
mod observability; // Make macros available throughout the crate

pub mod config;
pub mod error;
pub mod format;
pub mod kernels;
pub mod levels;
pub mod projection;
pub mod select;
pub mod session;
pub mod traits;
pub mod types;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use config::{ByteRange, ScanConfig, ScanContext};
pub use error::TesseraError;
pub use format::{BlockDescriptor, FileFooter};
pub use levels::{create_level_iterator, LevelIterator};
pub use observability::enable_verbose_logging;
pub use projection::project_schema;
pub use select::select_row_groups;
pub use session::{RowGroupCounter, ScanSession};
