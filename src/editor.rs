//! In-place streaming binary editor.
//!
//! Copies a byte stream while looking for a run of a sentinel byte. The first
//! time `N` consecutive sentinels are seen, the replacement is written in their
//! place and padded back out to `N` bytes with the sentinel, so nothing after
//! the slot moves. Object files key fixed offsets into the patched region,
//! which is why the edit must never change the stream length.
//!
//! Input is consumed forward-only and only the length of the current sentinel
//! run is held in memory, so templates of any size can be edited.

use std::io::{self, BufReader, BufWriter, Read, Write};

use crate::error::{Error, Result};

/// Byte that fills the reserved slot in the bootstrap template.
pub const SENTINEL: u8 = b'X';

/// What an edit did to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSummary {
    /// Total bytes written, always equal to the bytes read.
    pub bytes: u64,
    /// Offset of the substituted run, if one qualified.
    pub substituted_at: Option<u64>,
}

impl EditSummary {
    pub fn substituted(&self) -> bool {
        self.substituted_at.is_some()
    }
}

/// Length-preserving find/replace over a sentinel run.
#[derive(Debug, Clone)]
pub struct StreamEditor {
    sentinel: u8,
    trigger_len: usize,
    replacement: Vec<u8>,
}

impl StreamEditor {
    /// Create an editor, rejecting a replacement that cannot fit in its slot.
    pub fn new(sentinel: u8, trigger_len: usize, replacement: impl Into<Vec<u8>>) -> Result<Self> {
        let replacement = replacement.into();
        if trigger_len == 0 {
            return Err(Error::invalid("sentinel trigger length must be at least 1"));
        }
        if replacement.len() > trigger_len {
            return Err(Error::invalid(format!(
                "replacement of {} bytes does not fit in a {}-byte slot",
                replacement.len(),
                trigger_len
            )));
        }
        Ok(Self {
            sentinel,
            trigger_len,
            replacement,
        })
    }

    /// Stream `input` into `output`, substituting the first qualifying run.
    ///
    /// The substitution fires as soon as the run reaches the trigger length.
    /// Any sentinels that continue the run afterwards are copied through as
    /// ordinary content, as is every later run.
    pub fn edit<R: Read, W: Write>(&self, input: R, output: W) -> io::Result<EditSummary> {
        let mut reader = BufReader::new(input);
        let mut writer = BufWriter::new(output);

        let mut offset: u64 = 0;
        let mut run: usize = 0;
        let mut substituted_at = None;

        let mut buf = [0u8; 1];
        loop {
            if reader.read(&mut buf)? == 0 {
                // A short run at end of input is not an error.
                self.write_sentinels(&mut writer, run)?;
                break;
            }
            offset += 1;
            let b = buf[0];

            if b != self.sentinel {
                self.write_sentinels(&mut writer, run)?;
                run = 0;
                writer.write_all(&buf)?;
                continue;
            }

            run += 1;
            if run == self.trigger_len {
                writer.write_all(&self.replacement)?;
                self.write_sentinels(&mut writer, self.trigger_len - self.replacement.len())?;
                substituted_at = Some(offset - self.trigger_len as u64);
                offset += io::copy(&mut reader, &mut writer)?;
                break;
            }
        }

        writer.flush()?;
        Ok(EditSummary {
            bytes: offset,
            substituted_at,
        })
    }

    fn write_sentinels<W: Write>(&self, writer: &mut W, count: usize) -> io::Result<()> {
        const CHUNK: usize = 256;
        let chunk = [self.sentinel; CHUNK];
        let mut left = count;
        while left > 0 {
            let n = left.min(CHUNK);
            writer.write_all(&chunk[..n])?;
            left -= n;
        }
        Ok(())
    }
}
