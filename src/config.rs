// In: src/config.rs

//! The single source of truth for scan configuration.
//!
//! This module defines the serializable `ScanConfig` struct, created once at
//! the application boundary (e.g., from an engine's job description), and the
//! runtime `ScanContext` that a job scheduler hands to one worker for one
//! split. A `ScanContext` is an immutable, already-validated input from the
//! scan core's perspective: it is built by the calling engine and never
//! mutated here.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::traits::RowGroupFilter;

//==================================================================================
// I. Serializable Scan Configuration
//==================================================================================

/// Engine-level settings for a scan, shipped alongside the split description.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct ScanConfig {
    /// Free-form key/value properties from the job context. Forwarded, never
    /// interpreted, by this core.
    #[serde(default)]
    pub properties: HashMap<String, String>,

    /// The target number of rows per decoded batch. Consumed by the column
    /// readers built on top of this core, not by the core itself.
    #[serde(default = "default_batch_size_rows")]
    pub batch_size_rows: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            properties: HashMap::new(),
            batch_size_rows: default_batch_size_rows(),
        }
    }
}

/// Helper for `serde` to provide a default for `batch_size_rows`.
fn default_batch_size_rows() -> usize {
    8_192
}

//==================================================================================
// II. Per-Split Runtime Context
//==================================================================================

/// A half-open byte range `[start, end)` describing one split of a file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Whether `offset` falls inside this range.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start && offset < self.end
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.start, self.end)
    }
}

/// Everything one worker needs to scan one split of one file.
///
/// Exactly one of the two selection inputs is honored: when
/// `row_group_offsets` is present the scan uses explicit-offset selection and
/// the `filter` is ignored; otherwise predicate pushdown applies within
/// `range`.
#[derive(Clone)]
pub struct ScanContext {
    /// Path of the file being scanned. Opaque to this core; passed through to
    /// the underlying block source.
    pub path: String,

    /// The split's byte range. `None` means the whole file.
    pub range: Option<ByteRange>,

    /// Row-group starting offsets computed on the client, when the scheduler
    /// runs with client-side metadata. `None` selects the predicate path.
    pub row_group_offsets: Option<Vec<u64>>,

    /// Opaque predicate evaluated against per-block statistics. Trusted
    /// entirely; this core applies it but never builds or validates it.
    pub filter: Option<Arc<dyn RowGroupFilter>>,

    /// Engine configuration for this scan.
    pub config: ScanConfig,
}

impl ScanContext {
    /// A context that reads the whole file with no filtering. The starting
    /// point for tests and direct (non-scheduled) reads.
    pub fn whole_file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            range: None,
            row_group_offsets: None,
            filter: None,
            config: ScanConfig::default(),
        }
    }

    /// Human-readable description of the split range, for diagnostics.
    pub(crate) fn range_label(&self) -> String {
        match self.range {
            Some(r) => r.to_string(),
            None => "whole file".to_string(),
        }
    }
}

impl std::fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanContext")
            .field("path", &self.path)
            .field("range", &self.range)
            .field("row_group_offsets", &self.row_group_offsets)
            .field("has_filter", &self.filter.is_some())
            .field("config", &self.config)
            .finish()
    }
}

//==================================================================================
// III. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_range_contains_is_half_open() {
        let r = ByteRange::new(100, 200);
        assert!(r.contains(100));
        assert!(r.contains(199));
        assert!(!r.contains(200));
        assert!(!r.contains(99));
    }

    #[test]
    fn test_scan_config_defaults_roundtrip() {
        let cfg: ScanConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.batch_size_rows, 8_192);
        assert!(cfg.properties.is_empty());

        let json = serde_json::to_string(&cfg).unwrap();
        let back: ScanConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.batch_size_rows, cfg.batch_size_rows);
    }
}
