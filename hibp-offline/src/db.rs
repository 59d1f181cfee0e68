//! Point lookups and prefix scans against the current database view.

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::index;
use crate::record::Record;
use crate::reload::DatabasePaths;
use crate::view::ByteView;
use crate::{DATA_SEGMENT_OFFSET, RECORD_SIZE, SUFFIX_SIZE};

/// Initial size of a pooled scan buffer. 8 KiB holds about 430 records,
/// which covers typical buckets; a buffer grows on demand when a bucket is
/// larger.
const SCAN_BUFFER_SIZE: usize = 8 << 10;

/// Upper bound on idle buffers retained by the pool.
const SCAN_POOL_LIMIT: usize = 16;

/// A client for querying Pwned Passwords locally.
///
/// Clones are cheap and share the same state, so one database can serve
/// any number of concurrent request handlers without coordination: the
/// backing view is read-only between swaps. Each query operates on
/// whichever view is current when it starts and keeps that view alive
/// until it finishes, so a concurrent reload never invalidates in-flight
/// reads. The mapping itself is released once the last clone and the last
/// in-flight query are done with it.
#[derive(Clone)]
pub struct OfflineDatabase {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    view: RwLock<Arc<dyn ByteView>>,
    paths: Option<DatabasePaths>,
    buffers: BufferPool,
}

impl OfflineDatabase {
    /// Creates a database over an already-constructed view.
    ///
    /// Mainly for tests and tools that synthesize a database in memory.
    /// A database created this way has no backing file, so [`reload`]
    /// never swaps it.
    ///
    /// [`reload`]: OfflineDatabase::reload
    pub fn with_view(view: Arc<dyn ByteView>) -> Self {
        Self::from_parts(view, None)
    }

    pub(crate) fn from_parts(view: Arc<dyn ByteView>, paths: Option<DatabasePaths>) -> Self {
        Self {
            shared: Arc::new(Shared {
                view: RwLock::new(view),
                paths,
                buffers: BufferPool::new(),
            }),
        }
    }

    /// The view queries are currently routed to.
    pub(crate) fn view(&self) -> Arc<dyn ByteView> {
        self.shared.view.read().clone()
    }

    /// Replaces the current view. The old view is dropped here and freed
    /// when its last in-flight reader releases it.
    pub(crate) fn publish(&self, view: Arc<dyn ByteView>) {
        *self.shared.view.write() = view;
    }

    pub(crate) fn paths(&self) -> Option<&DatabasePaths> {
        self.shared.paths.as_ref()
    }

    /// Checks how frequently the given hash is included in the database.
    ///
    /// Hashes that are not in the database return a frequency of 0; an
    /// error only means the database file itself could not be read.
    pub fn pwned(&self, hash: &[u8; 20]) -> Result<u32> {
        let view = self.view();
        pwned_in(view.as_ref(), hash)
    }

    /// Iterates all records whose prefix lies in `[start, end]`
    /// (inclusive), in ascending hash order.
    ///
    /// The callback receives the reconstructed 20-byte hash and its
    /// frequency; returning `true` stops the scan immediately, which still
    /// counts as success. An error only means the database file could not
    /// be read, except for [`Error::InvalidRange`] when `start > end`.
    pub fn scan<F>(&self, start: [u8; 3], end: [u8; 3], cb: F) -> Result<()>
    where
        F: FnMut(&[u8; 20], u16) -> bool,
    {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }

        let view = self.view();
        let mut buffer = self.shared.buffers.get();
        let result = scan_in(view.as_ref(), start, end, &mut buffer, cb);
        self.shared.buffers.put(buffer);
        result
    }
}

fn pwned_in(view: &dyn ByteView, hash: &[u8; 20]) -> Result<u32> {
    let prefix = [hash[0], hash[1], hash[2]];
    let (bucket, length) = index::bucket(view, prefix)?;

    let suffix = &hash[3..20];
    let mut rbuf = [0u8; RECORD_SIZE];

    // Bisect over the records of one bucket; each probe is a single
    // 19-byte read. An empty bucket never touches the data segment.
    let mut lo = 0u64;
    let mut hi = length / RECORD_SIZE as u64;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        view.read_at(&mut rbuf, DATA_SEGMENT_OFFSET + bucket + mid * RECORD_SIZE as u64)?;

        match suffix.cmp(&rbuf[..SUFFIX_SIZE]) {
            Ordering::Less => hi = mid,
            Ordering::Greater => lo = mid + 1,
            Ordering::Equal => return Ok(u32::from(Record::decode(&rbuf).frequency)),
        }
    }

    Ok(0)
}

fn scan_in<F>(
    view: &dyn ByteView,
    start: [u8; 3],
    end: [u8; 3],
    buffer: &mut Vec<u8>,
    mut cb: F,
) -> Result<()>
where
    F: FnMut(&[u8; 20], u16) -> bool,
{
    let mut hash = [0u8; 20];
    let mut prefix = start;

    loop {
        let (bucket, length) = index::bucket(view, prefix)?;
        let length = length as usize;

        if buffer.len() < length {
            buffer.resize(length, 0);
        }
        view.read_at(&mut buffer[..length], DATA_SEGMENT_OFFSET + bucket)?;

        hash[..3].copy_from_slice(&prefix);
        for chunk in buffer[..length].chunks_exact(RECORD_SIZE) {
            let record = Record::decode(chunk.try_into().unwrap());
            hash[3..].copy_from_slice(&record.suffix);
            if cb(&hash, record.frequency) {
                return Ok(());
            }
        }

        if prefix == end {
            return Ok(());
        }

        // Advance within the 24-bit prefix space; 0xFFFFFF has no
        // successor.
        let next = index::prefix_index(prefix) + 1;
        if next > 0xFF_FF_FF {
            return Ok(());
        }
        prefix = [(next >> 16) as u8, (next >> 8) as u8, next as u8];
    }
}

/// A pool of large-ish scan buffers available for reuse, so a scan does
/// not allocate per bucket or per call.
struct BufferPool {
    pool: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    fn new() -> Self {
        Self { pool: Mutex::new(Vec::new()) }
    }

    fn get(&self) -> Vec<u8> {
        self.pool.lock().pop().unwrap_or_else(|| vec![0; SCAN_BUFFER_SIZE])
    }

    fn put(&self, buffer: Vec<u8>) {
        let mut pool = self.pool.lock();
        if pool.len() < SCAN_POOL_LIMIT {
            pool.push(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_pool_reuses_buffers() {
        let pool = BufferPool::new();

        let mut first = pool.get();
        assert_eq!(first.len(), SCAN_BUFFER_SIZE);
        first.resize(SCAN_BUFFER_SIZE * 4, 0);
        pool.put(first);

        // The grown buffer comes back out instead of a fresh allocation.
        let second = pool.get();
        assert_eq!(second.len(), SCAN_BUFFER_SIZE * 4);
    }

    #[test]
    fn test_buffer_pool_bounds_retained_buffers() {
        let pool = BufferPool::new();
        for _ in 0..SCAN_POOL_LIMIT * 2 {
            pool.put(vec![0; SCAN_BUFFER_SIZE]);
        }
        assert_eq!(pool.pool.lock().len(), SCAN_POOL_LIMIT);
    }
}
