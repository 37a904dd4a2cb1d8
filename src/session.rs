// In: src/session.rs

//! The stateful facade for one scan: owns the open reader handle and the
//! aggregated row count for the scan's lifetime.
//!
//! A `ScanSession` is used by exactly one worker for its entire lifetime; no
//! internal locking is provided or required. Both validation steps (the
//! row-group consistency check and schema validation) run eagerly during
//! `open`, so a corrupt or stale split fails before any row is produced.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use log::warn;

use crate::config::ScanContext;
use crate::error::TesseraError;
use crate::projection::project_schema;
use crate::select::select_row_groups;
use crate::traits::{BlockReader, BlockSource, ReadSupportFactory};

//==================================================================================
// I. The Observability Port
//==================================================================================

/// A monotonically-increasing counter of selected row groups, for callers
/// that want to verify pushdown behavior. Written, never read, by this core;
/// purely additive instrumentation with no effect on control flow.
#[derive(Debug, Default)]
pub struct RowGroupCounter {
    count: AtomicU64,
}

impl RowGroupCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: u64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

//==================================================================================
// II. The Scan Session
//==================================================================================

/// One scan over one file: resolves row groups, negotiates the requested
/// schema, opens the underlying block reader against exactly that selection,
/// and aggregates row counts.
pub struct ScanSession {
    path: String,
    file_schema: Option<SchemaRef>,
    requested_schema: Option<SchemaRef>,
    total_row_count: u64,
    reader: Option<Box<dyn BlockReader>>,
}

impl ScanSession {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_schema: None,
            requested_schema: None,
            total_row_count: 0,
            reader: None,
        }
    }

    /// Opens the session for a scheduled split.
    ///
    /// In order: acquire the footer (range-restricted on the predicate path,
    /// full on the explicit path), select row groups, negotiate the requested
    /// schema through the caller's read-support strategy, open the underlying
    /// reader against exactly the selection, then sum row counts from the
    /// blocks the reader actually accepted.
    ///
    /// Session state, including the reader handle, is only installed after
    /// every step has succeeded, so `close` after a failed `open` is a no-op.
    pub fn open(
        &mut self,
        ctx: &ScanContext,
        source: &dyn BlockSource,
        read_support_factory: &ReadSupportFactory,
        counter: Option<&RowGroupCounter>,
    ) -> Result<(), TesseraError> {
        let footer = match &ctx.row_group_offsets {
            // Client-side selection: the offsets were computed against the
            // whole file, so read the full footer.
            Some(_) => source.read_footer(None)?,
            None => source.read_footer(ctx.range)?,
        };
        let blocks = select_row_groups(&footer, ctx)?;

        let file_schema: SchemaRef = Arc::new(footer.schema.clone());
        let read_support = read_support_factory()
            .map_err(|e| TesseraError::Configuration(e.to_string()))?;
        let metadata = to_set_multimap(&footer.key_value_metadata);
        let requested_schema = read_support.init(&file_schema, &metadata)?;

        let reader = source.open_reader(&blocks, &requested_schema)?;
        self.install(file_schema, requested_schema, blocks.len(), reader);

        if let Some(counter) = counter {
            counter.add(blocks.len() as u64);
        }
        Ok(())
    }

    /// Opens the session directly from a column list, bypassing scheduling:
    /// full footer, every row group, schema projected from `columns`. This is
    /// the path direct (non-scheduled) reads and tests use.
    pub fn open_with_columns(
        &mut self,
        source: &dyn BlockSource,
        columns: Option<&[String]>,
    ) -> Result<(), TesseraError> {
        let footer = source.read_footer(None)?;
        let file_schema: SchemaRef = Arc::new(footer.schema.clone());
        let requested_schema = project_schema(&file_schema, columns)?;

        let blocks = footer.row_groups.clone();
        let reader = source.open_reader(&blocks, &requested_schema)?;
        self.install(file_schema, requested_schema, blocks.len(), reader);
        Ok(())
    }

    /// Commits a fully successful open: aggregates the accepted row counts
    /// and takes ownership of the reader handle.
    fn install(
        &mut self,
        file_schema: SchemaRef,
        requested_schema: SchemaRef,
        selected: usize,
        reader: Box<dyn BlockReader>,
    ) {
        // Use the blocks from the reader in case some do not match filters
        // and will not be read.
        let accepted = reader.row_groups();
        if accepted.len() < selected {
            warn!(
                "underlying reader for {} accepted {} of {} selected row groups; \
                 unserved groups will be silently absent from the scan",
                self.path,
                accepted.len(),
                selected
            );
        }
        self.total_row_count = accepted.iter().map(|b| b.row_count).sum();
        self.file_schema = Some(file_schema);
        self.requested_schema = Some(requested_schema);
        self.reader = Some(reader);
        log_metric!(
            "event" = "scan_open",
            "row_groups" = &selected,
            "rows" = &self.total_row_count,
        );
    }

    /// The file path this session scans, for diagnostics.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The file's full logical schema. `None` before a successful open.
    pub fn file_schema(&self) -> Option<&SchemaRef> {
        self.file_schema.as_ref()
    }

    /// The negotiated requested schema. `None` before a successful open.
    pub fn requested_schema(&self) -> Option<&SchemaRef> {
        self.requested_schema.as_ref()
    }

    /// Total rows across the row groups the reader accepted.
    pub fn row_count(&self) -> u64 {
        self.total_row_count
    }

    /// The open reader handle, for the per-column decoders built on top.
    pub fn reader_mut(&mut self) -> Option<&mut (dyn BlockReader + 'static)> {
        self.reader.as_deref_mut()
    }

    /// Releases the underlying handle. Idempotent: a second call, or a call
    /// after a failed `open`, is a no-op. Safe to invoke from cleanup paths.
    pub fn close(&mut self) -> Result<(), TesseraError> {
        if let Some(mut reader) = self.reader.take() {
            reader.close()?;
        }
        Ok(())
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        // Last-resort release; errors here have nowhere to go.
        let _ = self.close();
    }
}

/// Lifts single-valued footer metadata into the set-valued mapping the
/// read-support contract expects.
fn to_set_multimap(map: &HashMap<String, String>) -> HashMap<String, HashSet<String>> {
    map.iter()
        .map(|(k, v)| (k.clone(), HashSet::from([v.clone()])))
        .collect()
}

//==================================================================================
// III. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanContext;
    use crate::format::{BlockDescriptor, ColumnChunkMeta, FileFooter};
    use crate::traits::{FullSchemaReadSupport, ReadSupport};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::atomic::AtomicUsize;

    fn block(offset: u64, rows: u64) -> BlockDescriptor {
        BlockDescriptor {
            starting_offset: offset,
            row_count: rows,
            column_chunks: vec![],
        }
    }

    fn test_footer() -> FileFooter {
        let nested = DataType::Struct(vec![Field::new("d", DataType::Int32, true)].into());
        FileFooter {
            schema: Schema::new(vec![
                Field::new("a", DataType::Int32, false),
                Field::new("b", DataType::Utf8, true),
                Field::new("c", nested, true),
            ]),
            row_groups: vec![
                block(0, 10),
                block(100, 20),
                block(200, 30),
                block(300, 40),
                block(400, 50),
            ],
            key_value_metadata: HashMap::from([(
                "writer.engine".to_string(),
                "test".to_string(),
            )]),
            writer_version: "test".into(),
        }
    }

    /// Mock reader whose handle fails the test on double-release.
    struct MockReader {
        accepted: Vec<BlockDescriptor>,
        close_count: Arc<AtomicUsize>,
    }

    impl BlockReader for MockReader {
        fn row_groups(&self) -> &[BlockDescriptor] {
            &self.accepted
        }
        fn read_chunk(&mut self, _chunk: &ColumnChunkMeta) -> Result<Vec<u8>, TesseraError> {
            Ok(vec![])
        }
        fn close(&mut self) -> Result<(), TesseraError> {
            let prev = self.close_count.fetch_add(1, Ordering::SeqCst);
            if prev > 0 {
                return Err(TesseraError::Internal(
                    "underlying handle released twice".to_string(),
                ));
            }
            Ok(())
        }
    }

    /// Mock source serving a fixed footer; can simulate a reader that narrows
    /// the selection or an open failure.
    struct MockSource {
        footer: FileFooter,
        accept_at_most: Option<usize>,
        fail_open: bool,
        close_count: Arc<AtomicUsize>,
    }

    impl MockSource {
        fn new(footer: FileFooter) -> Self {
            Self {
                footer,
                accept_at_most: None,
                fail_open: false,
                close_count: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl BlockSource for MockSource {
        fn read_footer(
            &self,
            _range: Option<crate::config::ByteRange>,
        ) -> Result<FileFooter, TesseraError> {
            Ok(self.footer.clone())
        }

        fn open_reader(
            &self,
            blocks: &[BlockDescriptor],
            _requested_schema: &SchemaRef,
        ) -> Result<Box<dyn BlockReader>, TesseraError> {
            if self.fail_open {
                return Err(TesseraError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such file",
                )));
            }
            let accepted = match self.accept_at_most {
                Some(n) => blocks.iter().take(n).cloned().collect(),
                None => blocks.to_vec(),
            };
            Ok(Box::new(MockReader {
                accepted,
                close_count: self.close_count.clone(),
            }))
        }
    }

    fn full_schema_factory() -> Result<Box<dyn ReadSupport>, TesseraError> {
        Ok(Box::new(FullSchemaReadSupport))
    }

    #[test]
    fn test_open_explicit_offsets_end_to_end() {
        let source = MockSource::new(test_footer());
        let mut ctx = ScanContext::whole_file("f");
        ctx.row_group_offsets = Some(vec![100, 300]);

        let counter = RowGroupCounter::new();
        let mut session = ScanSession::new("f");
        session
            .open(&ctx, &source, &full_schema_factory, Some(&counter))
            .unwrap();

        // Blocks at 100 and 300 carry 20 + 40 rows.
        assert_eq!(session.path(), "f");
        assert_eq!(session.row_count(), 60);
        assert_eq!(counter.value(), 2);
        assert_eq!(session.requested_schema().unwrap().fields().len(), 3);
        session.close().unwrap();
    }

    #[test]
    fn test_open_stale_offsets_fails_before_reading() {
        let source = MockSource::new(test_footer());
        let mut ctx = ScanContext::whole_file("f");
        ctx.row_group_offsets = Some(vec![100, 150]);

        let mut session = ScanSession::new("f");
        let err = session
            .open(&ctx, &source, &full_schema_factory, None)
            .unwrap_err();
        assert!(matches!(err, TesseraError::ConsistencyViolation { .. }));
        // Nothing was installed, so close is a clean no-op.
        assert_eq!(session.row_count(), 0);
        session.close().unwrap();
    }

    #[test]
    fn test_read_support_receives_set_valued_metadata() {
        struct MetadataProbe;
        impl ReadSupport for MetadataProbe {
            fn init(
                &self,
                file_schema: &SchemaRef,
                key_value_metadata: &HashMap<String, HashSet<String>>,
            ) -> Result<SchemaRef, TesseraError> {
                let values = key_value_metadata
                    .get("writer.engine")
                    .expect("metadata key should be forwarded");
                assert_eq!(values, &HashSet::from(["test".to_string()]));
                Ok(file_schema.clone())
            }
        }

        let source = MockSource::new(test_footer());
        let ctx = ScanContext::whole_file("f");
        let factory: &ReadSupportFactory =
            &|| Ok(Box::new(MetadataProbe) as Box<dyn ReadSupport>);
        let mut session = ScanSession::new("f");
        session.open(&ctx, &source, factory, None).unwrap();
        session.close().unwrap();
    }

    #[test]
    fn test_failing_read_support_factory_is_configuration_error() {
        let source = MockSource::new(test_footer());
        let ctx = ScanContext::whole_file("f");
        let factory: &ReadSupportFactory =
            &|| Err(TesseraError::Internal("no strategy registered".to_string()));
        let mut session = ScanSession::new("f");
        let err = session.open(&ctx, &source, factory, None).unwrap_err();
        match err {
            TesseraError::Configuration(msg) => assert!(msg.contains("no strategy registered")),
            other => panic!("expected Configuration, got {:?}", other),
        }
    }

    #[test]
    fn test_reader_narrowing_shrinks_row_count() {
        let mut source = MockSource::new(test_footer());
        source.accept_at_most = Some(2);
        let ctx = ScanContext::whole_file("f");

        let mut session = ScanSession::new("f");
        session
            .open(&ctx, &source, &full_schema_factory, None)
            .unwrap();
        // Only the first two of five blocks were accepted: 10 + 20 rows.
        assert_eq!(session.row_count(), 30);
        session.close().unwrap();
    }

    #[test]
    fn test_reader_mut_drives_chunk_reads() {
        let source = MockSource::new(test_footer());
        let ctx = ScanContext::whole_file("f");

        let mut session = ScanSession::new("f");
        session
            .open(&ctx, &source, &full_schema_factory, None)
            .unwrap();

        let chunk = ColumnChunkMeta {
            column_path: "a".to_string(),
            offset_in_file: 0,
            compressed_size: 0,
            num_values: 10,
            statistics: None,
        };
        let reader = session.reader_mut().expect("reader installed after open");
        assert_eq!(reader.row_groups().len(), 5);
        let bytes = reader.read_chunk(&chunk).unwrap();
        assert!(bytes.is_empty());
        session.close().unwrap();
    }

    #[test]
    fn test_open_with_columns_projects_and_counts() {
        let source = MockSource::new(test_footer());
        let cols = vec!["a".to_string(), "c".to_string()];

        let mut session = ScanSession::new("f");
        session.open_with_columns(&source, Some(&cols)).unwrap();
        assert_eq!(session.row_count(), 150);
        let requested = session.requested_schema().unwrap();
        assert_eq!(requested.field(0).name(), "a");
        assert_eq!(requested.field(1).name(), "c");
        session.close().unwrap();
    }

    #[test]
    fn test_open_with_unknown_column_fails() {
        let source = MockSource::new(test_footer());
        let cols = vec!["a".to_string(), "z".to_string()];

        let mut session = ScanSession::new("f");
        let err = session
            .open_with_columns(&source, Some(&cols))
            .unwrap_err();
        match err {
            TesseraError::SchemaValidation { column, .. } => assert_eq!(column, "z"),
            other => panic!("expected SchemaValidation, got {:?}", other),
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let source = MockSource::new(test_footer());
        let close_count = source.close_count.clone();
        let ctx = ScanContext::whole_file("f");

        let mut session = ScanSession::new("f");
        session
            .open(&ctx, &source, &full_schema_factory, None)
            .unwrap();
        session.close().unwrap();
        session.close().unwrap();
        // The drop guard must not release a third time either.
        drop(session);
        assert_eq!(close_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_after_failed_open_is_noop() {
        let mut source = MockSource::new(test_footer());
        source.fail_open = true;
        let ctx = ScanContext::whole_file("f");

        let mut session = ScanSession::new("f");
        assert!(session
            .open(&ctx, &source, &full_schema_factory, None)
            .is_err());
        session.close().unwrap();
        assert_eq!(source.close_count.load(Ordering::SeqCst), 0);
    }
}
