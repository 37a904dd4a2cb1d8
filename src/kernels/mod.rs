//! This module collects the pure, stateless codec kernels the scan core is
//! built on. Each kernel is an encode/decode pair with no I/O beyond an
//! in-memory cursor, and each is panic-free: malformed input surfaces as a
//! typed error, never a crash.

/// Variable-length integer headers for the hybrid codec.
pub mod leb128;

/// The run-length / bit-packed hybrid codec used by level streams.
pub mod hybrid;
