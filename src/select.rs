// In: src/select.rs

//! Row-group selection: deciding exactly which physical row groups a scan
//! must read.
//!
//! Two paths exist and must stay bit-for-bit consistent with each other.
//! When the scheduler ran with client-side metadata, the split carries the
//! explicit starting offsets of its row groups and selection is pure set
//! membership, checked for completeness. Otherwise the split carries a byte
//! range and selection applies the job's opaque predicate to every block in
//! range. An under- or over-read here silently corrupts results downstream,
//! so the explicit path treats any cardinality mismatch as fatal.

use std::collections::HashSet;

use log::debug;

use crate::config::ScanContext;
use crate::error::TesseraError;
use crate::format::{BlockDescriptor, FileFooter};

/// Selects the subset of the footer's row groups this scan must read, in
/// footer order. Never mutates the footer.
pub fn select_row_groups(
    footer: &FileFooter,
    ctx: &ScanContext,
) -> Result<Vec<BlockDescriptor>, TesseraError> {
    let selected = match &ctx.row_group_offsets {
        Some(offsets) => select_by_offsets(footer, offsets, ctx)?,
        None => select_by_predicate(footer, ctx),
    };
    debug!(
        "selected {} of {} row groups for {}",
        selected.len(),
        footer.row_groups.len(),
        ctx.path
    );
    Ok(selected)
}

/// Predicate path: restrict to the split's byte range, then let the opaque
/// filter prune blocks by their statistics. No filter means identity.
fn select_by_predicate(footer: &FileFooter, ctx: &ScanContext) -> Vec<BlockDescriptor> {
    footer
        .row_groups
        .iter()
        .filter(|block| match ctx.range {
            Some(range) => range.contains(block.starting_offset),
            None => true,
        })
        .filter(|block| match &ctx.filter {
            Some(filter) => filter.keep(block, &footer.schema),
            None => true,
        })
        .cloned()
        .collect()
}

/// Explicit path: the offsets are a set of required starting positions
/// computed on the client. Every offset must resolve to a block; a shortfall
/// means the client's view of the file is stale, which is an unrecoverable
/// consistency violation, never a partial selection.
fn select_by_offsets(
    footer: &FileFooter,
    offsets: &[u64],
    ctx: &ScanContext,
) -> Result<Vec<BlockDescriptor>, TesseraError> {
    let wanted: HashSet<u64> = offsets.iter().copied().collect();
    let selected: Vec<BlockDescriptor> = footer
        .row_groups
        .iter()
        .filter(|block| wanted.contains(&block.starting_offset))
        .cloned()
        .collect();

    // Verify we found them all.
    if selected.len() != offsets.len() {
        log_metric!(
            "event" = "row_group_consistency_violation",
            "expected" = &offsets.len(),
            "found" = &selected.len(),
        );
        return Err(TesseraError::ConsistencyViolation {
            expected: offsets.to_vec(),
            found: selected.iter().map(|b| b.starting_offset).collect(),
            available: footer.block_offsets(),
            range: ctx.range_label(),
        });
    }
    Ok(selected)
}

//==================================================================================
// Unit Tests
//==================================================================================
