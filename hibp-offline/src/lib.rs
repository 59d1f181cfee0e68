//! Offline checker for the Have I Been Pwned password dataset.
//!
//! This library answers "has this password hash appeared in a known breach,
//! and how many times?" entirely from a local database file. The file is
//! memory-mapped and queried with a bounded binary search, so lookups make
//! no network calls and allocate nothing on the hot path.
//!
//! # Binary Format
//!
//! The database is a single flat file with two segments:
//!
//! - An **index segment** of exactly 2^24 big-endian `u64` entries
//!   (134,217,728 bytes). The entry for 24-bit prefix `p` lives at byte
//!   `8 * p` and holds the offset of bucket `p` relative to the start of
//!   the data segment.
//! - A **data segment** of concatenated buckets. A bucket is the sorted
//!   run of 19-byte records whose hashes share a 3-byte prefix. Each
//!   record is the remaining 17 hash bytes followed by a big-endian `u16`
//!   breach count.
//!
//! Bucket boundaries are recoverable only through the index: the length of
//! bucket `p` is `entry[p + 1] - entry[p]`, except for the final prefix
//! `0xFFFFFF` whose bucket runs to the end of the file. Buckets may be
//! empty, and a count of zero is never stored; absence of a record is what
//! encodes "never breached".
//!
//! # Updates
//!
//! The file is produced offline by a separate builder. The builder drops a
//! complete replacement next to the live file
//! (`updated-pwned-passwords.bin`) and holds a lock file
//! (`pwned-passwords.lock`) while a build is in progress. The database
//! adopts a finished update by renaming it over the primary file and
//! remapping, either at startup or from the periodic reload task; see
//! [`OfflineDatabase::start_reload_task`]. In-flight queries keep reading
//! from the mapping they started with, so a swap never interrupts them.
//!
//! # Example
//!
//! ```no_run
//! use hibp_offline::OfflineDatabase;
//!
//! # async fn run() -> Result<(), hibp_offline::Error> {
//! let db = OfflineDatabase::open("pwned-passwords.bin").await?;
//! let frequency = db.pwned(&[0u8; 20])?;
//! assert_eq!(frequency, 0);
//! # Ok(())
//! # }
//! ```

mod db;
mod error;
mod index;
pub mod record;
mod reload;
pub mod view;

pub use db::OfflineDatabase;
pub use error::{Error, Result};
pub use record::Record;
pub use reload::{DatabasePaths, ReloadTask, DEFAULT_RELOAD_INTERVAL};
pub use view::{ByteView, MemView, MmapView};

/// Default file name of the live database.
pub const DATABASE_FILENAME: &str = "pwned-passwords.bin";

/// Exact size of the index segment in bytes: 2^24 entries of 8 bytes.
pub const INDEX_SEGMENT_SIZE: u64 = (1 << 24) * INDEX_ENTRY_SIZE;

/// Byte offset in the database where the data segment begins.
pub const DATA_SEGMENT_OFFSET: u64 = INDEX_SEGMENT_SIZE;

/// Size of one index entry: a big-endian unsigned byte offset.
pub const INDEX_ENTRY_SIZE: u64 = 8;

/// Size of one data-segment record: a 17-byte hash suffix and a
/// big-endian `u16` breach count.
pub const RECORD_SIZE: usize = 19;

/// Length of the hash suffix stored in each record.
pub const SUFFIX_SIZE: usize = 17;

/// The very first prefix in the dataset. Intended as a parameter to
/// [`OfflineDatabase::scan`].
pub const FIRST_PREFIX: [u8; 3] = [0x00, 0x00, 0x00];

/// The very last prefix in the dataset. Intended as a parameter to
/// [`OfflineDatabase::scan`].
pub const LAST_PREFIX: [u8; 3] = [0xFF, 0xFF, 0xFF];
