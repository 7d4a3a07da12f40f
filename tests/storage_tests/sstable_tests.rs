//! Tests for SSTable implementation
//!
//! These tests verify:
//! - SSTable creation and writing
//! - Point lookups via the in-memory index
//! - Tombstone handling
//! - Iteration, including seeking to a lower bound
//! - Range overlap checks
//! - File format validation

use std::path::{Path, PathBuf};

use ldbkit::storage::sstable::Lookup;
use ldbkit::storage::{SSTable, SSTableBuilder, SSTableReader};
use ldbkit::LdbError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_sstable() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.sst");
    (temp_dir, path)
}

/// Create an SSTable with numbered entries
fn create_sstable_with_entries(path: &Path, count: usize) -> SSTable {
    let mut builder = SSTableBuilder::new(path).unwrap();
    for i in 0..count {
        let key = format!("key{:05}", i);
        let value = format!("value{}", i);
        builder.add(key.as_bytes(), value.as_bytes()).unwrap();
    }
    builder.finish().unwrap()
}

fn collect_keys(reader: &SSTableReader, lower: Option<&[u8]>) -> Vec<Vec<u8>> {
    reader
        .iter_from(lower)
        .unwrap()
        .map(|entry| entry.unwrap().0)
        .collect()
}

// =============================================================================
// SSTableBuilder Tests
// =============================================================================

#[test]
fn test_builder_creates_file() {
    let (_temp, path) = setup_temp_sstable();

    let sstable = create_sstable_with_entries(&path, 5);

    assert!(path.exists());
    assert_eq!(sstable.entry_count(), 5);
    assert_eq!(sstable.min_key, b"key00000");
    assert_eq!(sstable.max_key, b"key00004");
    assert_eq!(sstable.file_size, std::fs::metadata(&path).unwrap().len());
}

#[test]
fn test_builder_rejects_unsorted_keys() {
    let (_temp, path) = setup_temp_sstable();

    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add(b"b", b"2").unwrap();

    assert!(matches!(builder.add(b"a", b"1"), Err(LdbError::Storage(_))));
    assert!(matches!(builder.add(b"b", b"again"), Err(LdbError::Storage(_))));
}

#[test]
fn test_builder_estimated_size_grows() {
    let (_temp, path) = setup_temp_sstable();

    let mut builder = SSTableBuilder::new(&path).unwrap();
    let empty = builder.estimated_size();
    builder.add(b"key", b"value").unwrap();

    // kind, key length and value length, then the key and value bytes
    assert_eq!(builder.estimated_size(), empty + 9 + 3 + 5);
    builder.add_tombstone(b"zz").unwrap();
    assert_eq!(builder.estimated_size(), empty + 17 + 9 + 2);
    assert_eq!(builder.entry_count(), 1);
}

// =============================================================================
// SSTableReader Tests
// =============================================================================

#[test]
fn test_reader_get() {
    let (_temp, path) = setup_temp_sstable();
    create_sstable_with_entries(&path, 100);

    let reader = SSTableReader::open(&path).unwrap();

    assert_eq!(reader.entry_count(), 100);
    assert_eq!(
        reader.get(b"key00042").unwrap(),
        Lookup::Value(b"value42".to_vec())
    );
    assert_eq!(reader.get(b"key00100").unwrap(), Lookup::Absent);
    assert_eq!(reader.get(b"aaa").unwrap(), Lookup::Absent);
}

#[test]
fn test_reader_tombstone() {
    let (_temp, path) = setup_temp_sstable();

    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add(b"alive", b"yes").unwrap();
    builder.add_tombstone(b"dead").unwrap();
    builder.finish().unwrap();

    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.get(b"dead").unwrap(), Lookup::Tombstone);

    let entries: Vec<_> = reader.iter().unwrap().map(|e| e.unwrap()).collect();
    assert_eq!(
        entries,
        vec![
            (b"alive".to_vec(), Some(b"yes".to_vec())),
            (b"dead".to_vec(), None),
        ]
    );
}

#[test]
fn test_reader_binary_and_empty_values() {
    let (_temp, path) = setup_temp_sstable();

    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add(&[0x00], &[]).unwrap();
    builder.add(&[0x00, 0xff], &[0xde, 0xad]).unwrap();
    builder.finish().unwrap();

    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.get(&[0x00]).unwrap(), Lookup::Value(vec![]));
    assert_eq!(reader.get(&[0x00, 0xff]).unwrap(), Lookup::Value(vec![0xde, 0xad]));
}

#[test]
fn test_iter_from_lower_bound() {
    let (_temp, path) = setup_temp_sstable();
    create_sstable_with_entries(&path, 5);

    let reader = SSTableReader::open(&path).unwrap();

    assert_eq!(collect_keys(&reader, None).len(), 5);
    assert_eq!(
        collect_keys(&reader, Some(b"key00003")),
        vec![b"key00003".to_vec(), b"key00004".to_vec()]
    );
    // Seeks to the first key at or after a bound that is not in the table
    assert_eq!(
        collect_keys(&reader, Some(b"key00002x")),
        vec![b"key00003".to_vec(), b"key00004".to_vec()]
    );
    assert!(collect_keys(&reader, Some(b"zzz")).is_empty());
}

#[test]
fn test_overlaps() {
    let (_temp, path) = setup_temp_sstable();

    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add(b"c", b"1").unwrap();
    builder.add(b"f", b"2").unwrap();
    builder.finish().unwrap();

    let reader = SSTableReader::open(&path).unwrap();

    assert!(reader.overlaps(None, None));
    assert!(reader.overlaps(Some(b"a"), Some(b"d")));
    assert!(reader.overlaps(Some(b"f"), None));
    // Upper bound is exclusive
    assert!(!reader.overlaps(Some(b"a"), Some(b"c")));
    assert!(!reader.overlaps(Some(b"g"), None));
    assert!(reader.covers(b"d"));
    assert!(!reader.covers(b"g"));
}

// =============================================================================
// Format Validation Tests
// =============================================================================

#[test]
fn test_open_rejects_bad_magic() {
    let (_temp, path) = setup_temp_sstable();
    create_sstable_with_entries(&path, 3);

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[0] = b'X';
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(SSTableReader::open(&path), Err(LdbError::Storage(_))));
}

#[test]
fn test_open_rejects_damaged_index() {
    let (_temp, path) = setup_temp_sstable();
    create_sstable_with_entries(&path, 3);

    let mut bytes = std::fs::read(&path).unwrap();
    // Last index byte sits just before the 24-byte footer
    let at = bytes.len() - 25;
    bytes[at] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(SSTableReader::open(&path), Err(LdbError::Storage(_))));
}

#[test]
fn test_full_scan_detects_damaged_record() {
    let (_temp, path) = setup_temp_sstable();
    create_sstable_with_entries(&path, 3);

    let mut bytes = std::fs::read(&path).unwrap();
    // Last byte of the first value ("value0"): 8-byte header + 9 + "key00000"
    bytes[8 + 9 + 8 + 5] ^= 0x01;
    std::fs::write(&path, bytes).unwrap();

    let reader = SSTableReader::open(&path).unwrap();
    let results: Vec<_> = reader.iter().unwrap().collect();

    assert_eq!(results.len(), 4);
    assert!(results[..3].iter().all(|r| r.is_ok()));
    assert!(matches!(results[3], Err(LdbError::Storage(_))));

    // Seeking past the first record skips verification
    assert_eq!(collect_keys(&reader, Some(b"key00001")).len(), 2);
}

#[test]
fn test_empty_table() {
    let (_temp, path) = setup_temp_sstable();
    let sstable = SSTableBuilder::new(&path).unwrap().finish().unwrap();

    assert_eq!(sstable.entry_count(), 0);
    assert!(sstable.min_key.is_empty());

    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.min_key(), None);
    assert!(!reader.overlaps(None, None));
    assert_eq!(reader.iter().unwrap().count(), 0);
}

#[test]
fn test_open_rejects_tiny_file() {
    let (_temp, path) = setup_temp_sstable();
    std::fs::write(&path, b"LDBT").unwrap();

    assert!(matches!(SSTableReader::open(&path), Err(LdbError::Storage(_))));
}
