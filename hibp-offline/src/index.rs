//! Decoding of the index segment.
//!
//! The index maps a 24-bit hash prefix to the location of its bucket in
//! the data segment. There is one 8-byte big-endian entry per prefix, so
//! the entry for prefix `p` sits at absolute byte `8 * p` and a bucket's
//! length is the distance to the next entry. The final prefix has no next
//! entry; its bucket runs to the end of the file.

use std::io;

use crate::error::Result;
use crate::view::ByteView;
use crate::{DATA_SEGMENT_OFFSET, INDEX_ENTRY_SIZE, LAST_PREFIX};

/// Returns the location of the bucket for `prefix` as a
/// `(offset, length)` pair, both in bytes relative to the start of the
/// data segment. A length of zero is a valid empty bucket.
pub(crate) fn bucket(view: &dyn ByteView, prefix: [u8; 3]) -> Result<(u64, u64)> {
    let entry_offset = u64::from(prefix_index(prefix)) * INDEX_ENTRY_SIZE;

    if prefix == LAST_PREFIX {
        let mut buf = [0u8; 8];
        view.read_at(&mut buf, entry_offset)?;
        let offset = u64::from_be_bytes(buf);
        let data_len = view
            .len()
            .checked_sub(DATA_SEGMENT_OFFSET)
            .and_then(|len| len.checked_sub(offset))
            .ok_or_else(index_out_of_order)?;
        return Ok((offset, data_len));
    }

    // One 16-byte read covers this entry and the next one, whose
    // difference is the bucket length.
    let mut buf = [0u8; 16];
    view.read_at(&mut buf, entry_offset)?;
    let offset = u64::from_be_bytes(buf[0..8].try_into().unwrap());
    let next = u64::from_be_bytes(buf[8..16].try_into().unwrap());
    let length = next.checked_sub(offset).ok_or_else(index_out_of_order)?;
    Ok((offset, length))
}

/// The 24-bit integer value of a prefix.
pub(crate) fn prefix_index(prefix: [u8; 3]) -> u32 {
    u32::from_be_bytes([0, prefix[0], prefix[1], prefix[2]])
}

fn index_out_of_order() -> crate::Error {
    io::Error::new(io::ErrorKind::InvalidData, "index entries out of order").into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_index() {
        assert_eq!(prefix_index([0x00, 0x00, 0x00]), 0);
        assert_eq!(prefix_index([0x00, 0x00, 0x01]), 1);
        assert_eq!(prefix_index([0x5B, 0xAA, 0x60]), 0x5BAA60);
        assert_eq!(prefix_index([0xFF, 0xFF, 0xFF]), 0xFFFFFF);
    }
}
