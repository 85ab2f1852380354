//! Memory-mapped file I/O for image reads.
//!
//! Large files are mapped instead of copied into a heap buffer. Images are
//! read once when opened and again for each fingerprint, so the saving
//! adds up on big libraries.

use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

/// Minimum file size to use memory-mapped I/O (1MB)
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Read file bytes, memory-mapping files of 1MB or more.
pub fn read_file_bytes(path: &Path) -> io::Result<FileBytes> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();

    if len >= MMAP_THRESHOLD {
        // SAFETY: read-only mapping; image files are not written while a
        // scan holds their bytes.
        let mmap = unsafe { Mmap::map(&file) }?;
        Ok(FileBytes::Mmap(mmap))
    } else {
        let mut bytes = Vec::with_capacity(len as usize);
        io::Read::read_to_end(&mut &file, &mut bytes)?;
        Ok(FileBytes::Vec(bytes))
    }
}

/// File bytes that may be either owned or memory-mapped.
pub enum FileBytes {
    /// Standard heap-allocated bytes
    Vec(Vec<u8>),
    /// Memory-mapped bytes
    Mmap(Mmap),
}

impl AsRef<[u8]> for FileBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileBytes::Vec(v) => v,
            FileBytes::Mmap(m) => m,
        }
    }
}

impl std::ops::Deref for FileBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}
