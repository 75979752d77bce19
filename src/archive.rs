//! Merging inputs into a single uber-archive.
//!
//! Input order is preserved: entries from each classpath element are written
//! in turn, then the entries of any extra archives (the runtime image). The
//! output is produced with a streaming writer and is never seeked.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::{SimpleFileOptions, StreamWriter};
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, IoContext, Result};

/// Counts from a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub entries: usize,
    pub duplicates: usize,
    pub skipped: Vec<PathBuf>,
}

struct Merger<W: Write + Seek> {
    writer: ZipWriter<W>,
    seen: HashSet<String>,
    summary: MergeSummary,
}

impl<W: Write + Seek> Merger<W> {
    fn add<R: Read>(&mut self, name: &str, content: &mut R) -> Result<()> {
        if !self.seen.insert(name.to_string()) {
            debug!(entry = name, "duplicate entry, keeping first");
            self.summary.duplicates += 1;
            return Ok(());
        }
        self.writer.start_file(name, SimpleFileOptions::default())?;
        io::copy(content, &mut self.writer).map_err(|e| Error::io(name, e))?;
        self.summary.entries += 1;
        Ok(())
    }

    fn add_dir(&mut self, dir: &Path) -> Result<()> {
        let walker = WalkDir::new(dir).follow_links(true).sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                Error::io(path, io::Error::other(e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let name = entry_name(rel);
            let mut file = File::open(entry.path()).at(entry.path())?;
            self.add(&name, &mut file)?;
        }
        Ok(())
    }

    fn add_archive_file(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).at(path)?;
        self.add_archive(BufReader::new(file))
    }

    /// Entries are located through the central directory, so archives whose
    /// local headers defer sizes to a data descriptor read fine.
    fn add_archive<R: Read + Seek>(&mut self, reader: R) -> Result<()> {
        let mut archive = ZipArchive::new(reader)?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            self.add(&name, &mut entry)?;
        }
        Ok(())
    }
}

/// Merge `inputs` and then `extra_archives` into one archive written to `output`.
///
/// Directories contribute every regular file beneath them, named by relative
/// path. Readable `.jar`/`.zip` files contribute their non-directory entries.
/// Anything else is skipped with a warning. `output` is written strictly
/// sequentially and never seeked.
pub fn merge<W, R, I>(inputs: &[PathBuf], extra_archives: I, output: W) -> Result<MergeSummary>
where
    W: Write,
    R: Read + Seek,
    I: IntoIterator<Item = R>,
{
    let mut merger: Merger<StreamWriter<W>> = Merger {
        writer: ZipWriter::new_stream(output),
        seen: HashSet::new(),
        summary: MergeSummary::default(),
    };

    for path in inputs {
        if path.is_dir() {
            merger.add_dir(path)?;
        } else if is_archive_name(path) && File::open(path).is_ok() {
            merger.add_archive_file(path)?;
        } else {
            warn!("Skipping {} as it is not a readable JAR file", path.display());
            merger.summary.skipped.push(path.clone());
        }
    }

    for archive in extra_archives {
        merger.add_archive(archive)?;
    }

    let mut inner = merger.writer.finish()?.into_inner();
    inner.flush().map_err(|e| Error::io("uber-archive", e))?;
    Ok(merger.summary)
}

fn is_archive_name(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Archive entry names always use `/`.
fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
