// In: src/projection.rs

//! Projection of a file's full logical schema down to the columns a caller
//! requested. Pure functions; any invalid request is rejected here, before a
//! single byte of column data is read.

use std::sync::Arc;

use arrow::datatypes::{Field, Schema, SchemaRef};

use crate::error::TesseraError;

/// Builds the requested schema from an optional list of top-level column
/// names.
///
/// `None` requests everything; an empty list requests the canonical empty
/// schema (count-only scans); otherwise the result contains exactly the named
/// fields, in the order given, with nested children carried along. An unknown
/// name is a validation error carrying the full file schema for diagnosis.
pub fn project_schema(
    file_schema: &SchemaRef,
    columns: Option<&[String]>,
) -> Result<SchemaRef, TesseraError> {
    let names = match columns {
        None => return Ok(file_schema.clone()),
        Some(names) => names,
    };
    if names.is_empty() {
        return Ok(Arc::new(Schema::empty()));
    }

    let mut fields: Vec<Field> = Vec::with_capacity(names.len());
    for name in names {
        match file_schema.field_with_name(name) {
            Ok(field) => fields.push(field.clone()),
            Err(_) => {
                return Err(TesseraError::SchemaValidation {
                    column: name.clone(),
                    schema: format!("{:?}", file_schema),
                })
            }
        }
    }
    Ok(Arc::new(Schema::new(fields)))
}

//==================================================================================
// Unit Tests
//==================================================================================
