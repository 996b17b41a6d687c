//! Positional reads of the file being uploaded.

use std::fs::File;
#[cfg(unix)]
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;

use crate::planner::ChunkRange;

/// Bytes of the file being uploaded. Cheap to clone; each `read_range` is
/// independent (pread-style), so concurrent batches can share one handle.
#[derive(Clone)]
pub struct FileSource {
    backing: Backing,
    len: u64,
}

#[derive(Clone)]
enum Backing {
    File(Arc<File>),
    Memory(Arc<[u8]>),
}

impl FileSource {
    /// Open `path` for reading; the size is taken from its metadata.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            backing: Backing::File(Arc::new(file)),
            len,
        })
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        let len = bytes.len() as u64;
        Self {
            backing: Backing::Memory(bytes),
            len,
        }
    }

    /// Total size in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read exactly the bytes of `range`.
    pub fn read_range(&self, range: ChunkRange) -> std::io::Result<Vec<u8>> {
        if range.end > self.len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("range {}..{} past end of {} bytes", range.start, range.end, self.len),
            ));
        }
        match &self.backing {
            Backing::Memory(bytes) => Ok(bytes[range.start as usize..range.end as usize].to_vec()),
            Backing::File(file) => read_file_range(file, range),
        }
    }
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.backing {
            Backing::File(_) => "file",
            Backing::Memory(_) => "memory",
        };
        f.debug_struct("FileSource")
            .field("backing", &kind)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(unix)]
fn read_file_range(file: &File, range: ChunkRange) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; range.len() as usize];
    file.read_exact_at(&mut buf, range.start)?;
    Ok(buf)
}

/// Non-Unix fallback: seek + read on a cloned handle. Clones share the file
/// cursor, so calls must not overlap; the scheduler reads chunks one at a time.
#[cfg(not(unix))]
fn read_file_range(file: &File, range: ChunkRange) -> std::io::Result<Vec<u8>> {
    use std::io::{Read, Seek, SeekFrom};
    let mut f = file.try_clone()?;
    f.seek(SeekFrom::Start(range.start))?;
    let mut buf = vec![0u8; range.len() as usize];
    f.read_exact(&mut buf)?;
    Ok(buf)
}
