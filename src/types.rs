// In: src/types.rs

//! This module defines the canonical, type-safe representation of physical
//! column types used throughout the tessera scan core, and the per-column
//! descriptor that decode-time errors are tagged with.

use arrow::datatypes::DataType as ArrowDataType;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TesseraError;

/// The canonical, internal representation of a leaf column's physical type.
///
/// This enum replaces a string-based type system, enabling compile-time
/// checks and eliminating an entire class of runtime errors.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    ByteArray,
}

impl PhysicalType {
    /// Converts an Arrow `DataType` into the physical type its values are
    /// stored as.
    pub fn from_arrow_type(arrow_type: &ArrowDataType) -> Result<Self, TesseraError> {
        match arrow_type {
            ArrowDataType::Boolean => Ok(Self::Boolean),
            ArrowDataType::Int8 | ArrowDataType::Int16 | ArrowDataType::Int32 => Ok(Self::Int32),
            ArrowDataType::UInt8 | ArrowDataType::UInt16 | ArrowDataType::UInt32 => Ok(Self::Int32),
            ArrowDataType::Int64 | ArrowDataType::UInt64 => Ok(Self::Int64),
            ArrowDataType::Float32 => Ok(Self::Float),
            ArrowDataType::Float64 => Ok(Self::Double),
            ArrowDataType::Utf8 | ArrowDataType::Binary => Ok(Self::ByteArray),
            dt => Err(TesseraError::UnsupportedType(format!(
                "Cannot map Arrow type {:?} to a tessera physical type",
                dt
            ))),
        }
    }
}

/// Provides the canonical string representation for a `PhysicalType`.
impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Describes one leaf column of the requested schema: its dotted path, its
/// physical type, and the maximum definition and repetition levels its pages
/// can carry. A `max_*_level` of zero means that nesting dimension is
/// structurally impossible for the column.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub path: Vec<String>,
    pub physical_type: PhysicalType,
    pub max_def_level: u32,
    pub max_rep_level: u32,
}

impl ColumnDescriptor {
    pub fn new(
        path: Vec<String>,
        physical_type: PhysicalType,
        max_def_level: u32,
        max_rep_level: u32,
    ) -> Self {
        Self {
            path,
            physical_type,
            max_def_level,
            max_rep_level,
        }
    }

    /// The column's dotted path, e.g. `"c.d"`.
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (max def: {}, max rep: {})",
            self.dotted_path(),
            self.physical_type,
            self.max_def_level,
            self.max_rep_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_type_mapping() {
        assert_eq!(
            PhysicalType::from_arrow_type(&ArrowDataType::Int16).unwrap(),
            PhysicalType::Int32
        );
        assert_eq!(
            PhysicalType::from_arrow_type(&ArrowDataType::Utf8).unwrap(),
            PhysicalType::ByteArray
        );
        assert!(matches!(
            PhysicalType::from_arrow_type(&ArrowDataType::Null),
            Err(TesseraError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_descriptor_display_includes_path_and_levels() {
        let desc = ColumnDescriptor::new(
            vec!["c".to_string(), "d".to_string()],
            PhysicalType::Int32,
            2,
            1,
        );
        let shown = desc.to_string();
        assert!(shown.contains("c.d"));
        assert!(shown.contains("max def: 2"));
        assert!(shown.contains("max rep: 1"));
    }
}
