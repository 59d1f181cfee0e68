//! Read-only byte views over the database file.
//!
//! The lookup code never touches the filesystem directly; it reads through
//! the [`ByteView`] trait. Production uses [`MmapView`], a read-only memory
//! mapping. Tests and tools that synthesize a database in memory use
//! [`MemView`]. Keeping the interface explicit rather than handing out raw
//! slices is what makes the two interchangeable.

use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::Mmap;

/// Random read-only access to a fixed-size byte region.
pub trait ByteView: Send + Sync {
    /// Fills `buf` from the region starting at `offset`.
    ///
    /// Fails if `offset + buf.len()` exceeds [`ByteView::len`].
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;

    /// Total length of the region in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A memory-mapped view over the database file.
///
/// The mapping is released when the view is dropped. Callers that share a
/// view across threads hold it behind an `Arc`, so the pages stay valid
/// until the last reader is done with them.
pub struct MmapView {
    mmap: Mmap,
}

impl MmapView {
    /// Opens `path` read-only and maps it.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }
}

impl ByteView for MmapView {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        read_slice(&self.mmap, buf, offset)
    }

    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }
}

/// A heap-backed view, mainly for tests and synthesized databases.
pub struct MemView {
    data: Vec<u8>,
}

impl MemView {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ByteView for MemView {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        read_slice(&self.data, buf, offset)
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

fn read_slice(data: &[u8], buf: &mut [u8], offset: u64) -> io::Result<()> {
    let end = offset
        .checked_add(buf.len() as u64)
        .filter(|end| *end <= data.len() as u64)
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of database view")
        })?;
    buf.copy_from_slice(&data[offset as usize..end as usize]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_mem_view_read_at() {
        let view = MemView::new(vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(view.len(), 8);

        let mut buf = [0u8; 4];
        view.read_at(&mut buf, 2).unwrap();
        assert_eq!(buf, [2, 3, 4, 5]);

        view.read_at(&mut buf, 4).unwrap();
        assert_eq!(buf, [4, 5, 6, 7]);
    }

    #[test]
    fn test_mem_view_read_past_end() {
        let view = MemView::new(vec![0u8; 8]);

        let mut buf = [0u8; 4];
        assert!(view.read_at(&mut buf, 5).is_err());
        assert!(view.read_at(&mut buf, 8).is_err());
        assert!(view.read_at(&mut buf, u64::MAX).is_err());
    }

    #[test]
    fn test_mem_view_zero_length_read() {
        let view = MemView::new(Vec::new());
        let mut buf = [];
        view.read_at(&mut buf, 0).unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn test_mmap_view_matches_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let view = MmapView::open(file.path()).unwrap();
        assert_eq!(view.len(), 10);

        let mut buf = [0u8; 3];
        view.read_at(&mut buf, 7).unwrap();
        assert_eq!(&buf, b"789");

        assert!(view.read_at(&mut buf, 8).is_err());
    }
}
