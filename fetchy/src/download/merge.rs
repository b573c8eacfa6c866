//! Concatenation of part artifacts into the final output.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::fetcher::discard_part;
use crate::config::{output_dir, PartNaming};
use crate::error::{FetchError, FetchResult};

/// One part artifact to merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartFile {
    /// Chunk index.
    pub index: usize,
    /// Location of the artifact.
    pub path: PathBuf,
    /// Exact length for bounded chunks; `None` for an unranged fetch.
    pub expected: Option<u64>,
}

/// Concatenate `parts` into `output` in ascending index order.
///
/// Every part is checked before the output is touched: a missing part or a
/// bounded part shorter than its range fails the merge. Parts are deleted as
/// they are consumed. On failure any remaining parts are deleted, and a
/// partially written output is removed. Returns the number of bytes written.
pub fn merge_parts(output: &Path, parts: &[PartFile]) -> FetchResult<u64> {
    let mut ordered: Vec<&PartFile> = parts.iter().collect();
    ordered.sort_by_key(|p| p.index);

    let result = verify_parts(&ordered).and_then(|()| {
        concatenate(output, &ordered).map_err(|e| {
            discard_part(output);
            e
        })
    });
    if result.is_err() {
        cleanup_parts(parts.iter().map(|p| p.path.as_path()));
    }
    result
}

fn verify_parts(parts: &[&PartFile]) -> FetchResult<()> {
    for part in parts {
        let actual = match fs::metadata(&part.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FetchError::MissingPart {
                    index: part.index,
                    path: part.path.clone(),
                });
            }
            Err(e) => {
                return Err(FetchError::MergeIo {
                    path: part.path.clone(),
                    source: e,
                });
            }
        };

        if let Some(expected) = part.expected {
            if actual < expected {
                return Err(FetchError::IncompletePart {
                    index: part.index,
                    expected,
                    actual,
                });
            }
        }
    }
    Ok(())
}

fn concatenate(output: &Path, parts: &[&PartFile]) -> FetchResult<u64> {
    let file = File::create(output).map_err(merge_io(output))?;
    let mut writer = BufWriter::new(file);
    let mut total = 0;

    for part in parts {
        let mut reader = File::open(&part.path).map_err(merge_io(&part.path))?;
        let copied = io::copy(&mut reader, &mut writer).map_err(merge_io(&part.path))?;
        drop(reader);

        total += copied;
        debug!(index = part.index, bytes = copied, "Merged part");
        discard_part(&part.path);
    }

    writer.flush().map_err(merge_io(output))?;
    Ok(total)
}

fn merge_io(path: &Path) -> impl FnOnce(io::Error) -> FetchError {
    let path = path.to_path_buf();
    move |source| FetchError::MergeIo { path, source }
}

/// Delete part artifacts, ignoring ones that no longer exist.
pub fn cleanup_parts<'a>(parts: impl IntoIterator<Item = &'a Path>) {
    for part in parts {
        discard_part(part);
    }
}

/// List leftover part artifacts for `output`, ordered by chunk index.
///
/// Useful for cleaning up after a process that died mid-download.
pub fn find_orphaned_parts(output: &Path, naming: PartNaming) -> FetchResult<Vec<PathBuf>> {
    let dir = output_dir(output);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(FetchError::FileSystem { path: dir, source: e }),
    };

    let mut found: Vec<(usize, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name();
            let index = naming.part_index(output, name.to_str()?)?;
            Some((index, entry.path()))
        })
        .collect();

    found.sort_by_key(|(index, _)| *index);
    Ok(found.into_iter().map(|(_, path)| path).collect())
}
