#![allow(dead_code)]

//! Shared helpers that synthesize complete database files for tests.

use std::fs;
use std::path::Path;

use hibp_offline::{Record, INDEX_SEGMENT_SIZE};

/// Builds a complete database image (index segment plus data segment)
/// containing the given `(hash, count)` entries. Hashes must be unique.
pub fn build_database(entries: &[([u8; 20], u32)]) -> Vec<u8> {
    let mut entries = entries.to_vec();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut image = vec![0u8; INDEX_SEGMENT_SIZE as usize];
    let mut data = Vec::with_capacity(entries.len() * 19);

    // Walk the sorted records, stamping the start offset of every bucket
    // up to and including each record's prefix. Prefixes skipped over get
    // the current offset, which makes them empty buckets.
    let mut next_prefix: u32 = 0;
    for (hash, count) in &entries {
        let prefix = u32::from_be_bytes([0, hash[0], hash[1], hash[2]]);
        while next_prefix <= prefix {
            stamp_entry(&mut image, next_prefix, data.len() as u64);
            next_prefix += 1;
        }
        data.extend_from_slice(&Record::from_hash(hash, *count).encode());
    }
    while next_prefix < 1 << 24 {
        stamp_entry(&mut image, next_prefix, data.len() as u64);
        next_prefix += 1;
    }

    image.extend_from_slice(&data);
    image
}

/// Writes a synthesized database for `entries` to `path`.
pub fn write_database(path: &Path, entries: &[([u8; 20], u32)]) {
    fs::write(path, build_database(entries)).unwrap();
}

fn stamp_entry(image: &mut [u8], prefix: u32, offset: u64) {
    let at = prefix as usize * 8;
    image[at..at + 8].copy_from_slice(&offset.to_be_bytes());
}

pub fn sha1(data: &[u8]) -> [u8; 20] {
    use sha1::{Digest, Sha1};
    Sha1::digest(data).into()
}

/// Decodes a 40-character hex literal into a 20-byte hash.
pub fn hash_from_hex(hex: &str) -> [u8; 20] {
    let bytes = hex.as_bytes();
    assert_eq!(bytes.len(), 40);

    let nibble = |c: u8| -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'A'..=b'F' => c - b'A' + 10,
            b'a'..=b'f' => c - b'a' + 10,
            _ => panic!("invalid hex char: {}", c as char),
        }
    };

    let mut hash = [0u8; 20];
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        hash[i] = (nibble(pair[0]) << 4) | nibble(pair[1]);
    }
    hash
}

/// A deterministic spread of hashes for round-trip tests, including
/// adjacent suffixes inside one bucket and records in the very first and
/// very last buckets.
pub fn sample_entries() -> Vec<([u8; 20], u32)> {
    let mut entries = Vec::new();

    // A bucket with several records, including adjacent suffixes.
    for i in 0..5u8 {
        let mut hash = [0u8; 20];
        hash[0..3].copy_from_slice(&[0x5B, 0xAA, 0x60]);
        hash[3] = i;
        hash[19] = 0xA0 + i;
        entries.push((hash, u32::from(i) + 1));
    }

    // Records in the first and last possible buckets.
    let mut first = [0u8; 20];
    first[19] = 0x01;
    entries.push((first, 11));

    let mut last = [0xFFu8; 20];
    last[19] = 0xFE;
    entries.push((last, 22));

    // A lone record in its own bucket.
    let mut lone = [0u8; 20];
    lone[0..3].copy_from_slice(&[0x77, 0x00, 0x01]);
    lone[10] = 0x42;
    entries.push((lone, 33));

    entries
}
