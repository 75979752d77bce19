//! Patching run metadata into the bootstrap object.
//!
//! The bootstrap template carries a slot of [`SLOT_LEN`] sentinel bytes. At
//! startup it reads a compression tag from the first byte and a
//! NUL-terminated entry point class name from the rest.

use std::io::{Read, Write};

use crate::editor::{EditSummary, StreamEditor, SENTINEL};
use crate::error::{Error, Result};

pub const SLOT_LEN: usize = 256;
/// Room left in the slot after the tag byte and the terminating NUL.
pub const MAX_ENTRY_POINT_LEN: usize = SLOT_LEN - 2;

pub const TAG_COMPRESSED: u8 = b'L';
pub const TAG_PLAIN: u8 = b' ';

/// Tag byte, class name, NUL.
pub fn metadata_block(compressed: bool, internal_name: &str) -> Result<Vec<u8>> {
    if internal_name.len() > MAX_ENTRY_POINT_LEN {
        return Err(Error::invalid(format!(
            "entry point '{internal_name}' does not fit in the bootstrap slot"
        )));
    }
    let mut block = Vec::with_capacity(internal_name.len() + 2);
    block.push(if compressed { TAG_COMPRESSED } else { TAG_PLAIN });
    block.extend_from_slice(internal_name.as_bytes());
    block.push(0);
    Ok(block)
}

/// Stream `template` into `output` with the metadata block in its slot.
pub fn patch<R: Read, W: Write>(template: R, output: W, block: Vec<u8>) -> Result<EditSummary> {
    let editor = StreamEditor::new(SENTINEL, SLOT_LEN, block)?;
    let summary = editor
        .edit(template, output)
        .map_err(|e| Error::io("bootstrap.o", e))?;
    if !summary.substituted() {
        return Err(Error::InvariantViolation(
            "bootstrap template has no metadata slot".to_string(),
        ));
    }
    Ok(summary)
}
