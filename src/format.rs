// In: src/format.rs

//! Defines the in-memory model of a tessera file's footer metadata.
//! This is the single source of truth for what a footer *contains*; parsing
//! the footer out of a file trailer is owned by the `BlockSource`
//! collaborator, which hands this core an already-decoded `FileFooter`.

use std::collections::HashMap;

use arrow::datatypes::Schema;
use serde::{Deserialize, Serialize};

use crate::error::TesseraError;

/// The magic number identifying the start of a tessera file.
pub const FILE_MAGIC: &[u8; 4] = b"TSSR";
/// The current version of the tessera file format.
pub const FILE_FORMAT_VERSION: u16 = 1;

//==================================================================================
// I. Per-Column-Chunk Metadata
//==================================================================================

/// Statistics for one column chunk, used for predicate pushdown. Min/max are
/// the column's encoded byte representation; interpretation belongs to the
/// filter, not to this core.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_count: Option<u64>,
}

/// Physical location of one column's chunk inside one row group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ColumnChunkMeta {
    /// Dotted path of the leaf column this chunk stores (e.g. `"c.d"`).
    pub column_path: String,
    pub offset_in_file: u64,
    pub compressed_size: u64,
    pub num_values: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ColumnStatistics>,
}

//==================================================================================
// II. Row Groups and the Footer
//==================================================================================

/// Metadata for one physical row group. Identity is the starting byte offset,
/// which is the matching key for explicit split selection. Owned by the
/// footer; referenced, never mutated, by the selection logic.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    pub starting_offset: u64,
    pub row_count: u64,
    pub column_chunks: Vec<ColumnChunkMeta>,
}

impl BlockDescriptor {
    /// Looks up the chunk for a leaf column by its dotted path.
    pub fn chunk_for_column(&self, column_path: &str) -> Option<&ColumnChunkMeta> {
        self.column_chunks
            .iter()
            .find(|c| c.column_path == column_path)
    }
}

/// The file footer: the full logical schema as declared by the writer, the
/// ordered row groups, and the writer's key/value metadata. Immutable once
/// read; lives for the duration of one scan.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileFooter {
    pub schema: Schema,
    pub row_groups: Vec<BlockDescriptor>,
    #[serde(default)]
    pub key_value_metadata: HashMap<String, String>,
    pub writer_version: String,
}

impl FileFooter {
    /// Serializes the footer as JSON bytes, the footer's on-disk encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TesseraError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a footer from its JSON byte encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TesseraError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The starting offsets of every row group, in footer order. Diagnostic
    /// payload for consistency violations.
    pub fn block_offsets(&self) -> Vec<u64> {
        self.row_groups.iter().map(|b| b.starting_offset).collect()
    }
}

//==================================================================================
// III. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field};

    fn sample_footer() -> FileFooter {
        let schema = Schema::new(vec![
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::Utf8, true),
        ]);
        FileFooter {
            schema,
            row_groups: vec![BlockDescriptor {
                starting_offset: 6,
                row_count: 100,
                column_chunks: vec![ColumnChunkMeta {
                    column_path: "a".to_string(),
                    offset_in_file: 6,
                    compressed_size: 10,
                    num_values: 100,
                    statistics: Some(ColumnStatistics {
                        min: Some(vec![0, 0, 0, 0]),
                        max: Some(vec![9, 0, 0, 0]),
                        null_count: Some(0),
                    }),
                }],
            }],
            key_value_metadata: HashMap::from([("writer.engine".to_string(), "test".to_string())]),
            writer_version: "test".into(),
        }
    }

    #[test]
    fn test_footer_roundtrip() {
        let footer = sample_footer();
        let bytes = footer.to_bytes().unwrap();
        let back = FileFooter::from_bytes(&bytes).unwrap();

        assert_eq!(back.row_groups, footer.row_groups);
        assert_eq!(back.schema, footer.schema);
        assert_eq!(back.key_value_metadata, footer.key_value_metadata);
    }

    #[test]
    fn test_footer_from_corrupt_bytes_is_serde_error() {
        let mut bytes = sample_footer().to_bytes().unwrap();
        bytes[0] = b'[';
        let result = FileFooter::from_bytes(&bytes);
        assert!(matches!(result, Err(TesseraError::SerdeJson(_))));
    }

    #[test]
    fn test_chunk_lookup_by_column_path() {
        let footer = sample_footer();
        let block = &footer.row_groups[0];
        assert!(block.chunk_for_column("a").is_some());
        assert!(block.chunk_for_column("z").is_none());
    }
}
