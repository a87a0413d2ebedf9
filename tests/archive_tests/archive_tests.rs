//! Tests for the archive container
//!
//! These tests verify:
//! - Group creation order and duplicate sibling names
//! - Attribute persistence and replacement
//! - Discarding groups before finish
//! - Create modes
//! - Header, footer and checksum validation
//! - Writers refuse further work after a failed data write

use std::fs;
use std::path::PathBuf;

use fieldstore::archive::{ArchiveRead, ArchiveReader, ArchiveWrite, ArchiveWriter, GroupHandle};
use fieldstore::{CreateMode, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_archive() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.f3d");
    (temp_dir, path)
}

/// Child names of a group, in stored order
fn child_names(reader: &ArchiveReader, group: GroupHandle) -> Vec<String> {
    reader
        .list_children(group)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect()
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_empty_archive_has_only_root() {
    let (_temp, path) = setup_temp_archive();

    let writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let summary = writer.finish(false).unwrap();

    assert_eq!(summary.group_count, 1);
    assert_eq!(summary.attribute_count, 0);
    assert!(summary.file_size > 0);

    let reader = ArchiveReader::open(&path, true).unwrap();
    assert_eq!(reader.group_count(), 1);
    assert!(child_names(&reader, reader.root()).is_empty());
}

#[test]
fn test_groups_keep_creation_order() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let root = writer.root();
    let b = writer.create_group(root, "b").unwrap();
    writer.create_group(root, "a").unwrap();
    writer.create_group(b, "inner").unwrap();
    writer.create_group(root, "c").unwrap();
    writer.finish(false).unwrap();

    let reader = ArchiveReader::open(&path, true).unwrap();
    assert_eq!(child_names(&reader, reader.root()), vec!["b", "a", "c"]);

    let b = reader.find_child(reader.root(), "b").unwrap().unwrap();
    assert_eq!(child_names(&reader, b), vec!["inner"]);
}

#[test]
fn test_duplicate_sibling_names_allowed() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let root = writer.root();
    let first = writer.create_group(root, "velocity").unwrap();
    let second = writer.create_group(root, "velocity").unwrap();
    writer.write_value(first, "n", &1i32).unwrap();
    writer.write_value(second, "n", &2i32).unwrap();
    writer.finish(false).unwrap();

    let reader = ArchiveReader::open(&path, true).unwrap();
    let children = reader.list_children(reader.root()).unwrap();
    assert_eq!(children.len(), 2);

    let values: Vec<i32> = children
        .iter()
        .map(|c| reader.require_value(c.handle, "n").unwrap())
        .collect();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn test_attribute_values_roundtrip() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let group = writer.create_group(GroupHandle::ROOT, "g").unwrap();
    writer.write_value(group, "name", "density").unwrap();
    writer.write_value(group, "res", &[4i32, 5, 6]).unwrap();
    writer.write_attribute(group, "raw", b"\x00\x01\x02").unwrap();
    writer.finish(true).unwrap();

    let reader = ArchiveReader::open(&path, true).unwrap();
    let group = reader.find_child(reader.root(), "g").unwrap().unwrap();

    let name: String = reader.require_value(group, "name").unwrap();
    let res: [i32; 3] = reader.require_value(group, "res").unwrap();
    let raw = reader.read_attribute(group, "raw").unwrap().unwrap();

    assert_eq!(name, "density");
    assert_eq!(res, [4, 5, 6]);
    assert_eq!(&raw[..], b"\x00\x01\x02");
    assert_eq!(reader.attribute_keys(group), vec!["name", "res", "raw"]);
}

#[test]
fn test_attribute_rewrite_replaces_value() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    writer.write_value(GroupHandle::ROOT, "version", "0.0.1").unwrap();
    writer.write_value(GroupHandle::ROOT, "version", "0.0.2").unwrap();
    let summary = writer.finish(false).unwrap();
    assert_eq!(summary.attribute_count, 1);

    let reader = ArchiveReader::open(&path, true).unwrap();
    let version: String = reader.require_value(reader.root(), "version").unwrap();
    assert_eq!(version, "0.0.2");
}

#[test]
fn test_missing_attribute() {
    let (_temp, path) = setup_temp_archive();

    let writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    writer.finish(false).unwrap();

    let reader = ArchiveReader::open(&path, true).unwrap();
    assert!(reader.read_value::<i32>(reader.root(), "nope").unwrap().is_none());

    let result: Result<i32, _> = reader.require_value(reader.root(), "nope");
    assert!(matches!(result, Err(StoreError::MissingAttribute { .. })));
}

#[test]
fn test_empty_group_name_rejected() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let result = writer.create_group(GroupHandle::ROOT, "");
    assert!(matches!(result, Err(StoreError::InvalidName(_))));
}

// =============================================================================
// Discard Tests
// =============================================================================

#[test]
fn test_discard_removes_subtree() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let root = writer.root();
    let keep = writer.create_group(root, "keep").unwrap();
    let drop = writer.create_group(root, "drop").unwrap();
    let inner = writer.create_group(drop, "inner").unwrap();
    writer.write_value(inner, "payload", &[1u8; 16]).unwrap();
    writer.write_value(keep, "n", &7i32).unwrap();

    writer.discard_group(drop).unwrap();
    assert!(writer.find_child(root, "drop").is_none());

    let summary = writer.finish(false).unwrap();
    assert_eq!(summary.group_count, 2);
    assert_eq!(summary.attribute_count, 1);

    let reader = ArchiveReader::open(&path, true).unwrap();
    assert_eq!(child_names(&reader, reader.root()), vec!["keep"]);
}

#[test]
fn test_discard_root_rejected() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    assert!(writer.discard_group(GroupHandle::ROOT).is_err());
}

#[test]
fn test_write_to_discarded_group_fails() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let group = writer.create_group(GroupHandle::ROOT, "g").unwrap();
    writer.discard_group(group).unwrap();

    let result = writer.write_value(group, "n", &1i32);
    assert!(matches!(result, Err(StoreError::MissingGroup(_))));
}

#[test]
fn test_group_path() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let a = writer.create_group(GroupHandle::ROOT, "fire.0").unwrap();
    let b = writer.create_group(a, "scalar").unwrap();

    assert_eq!(writer.group_path(GroupHandle::ROOT), "/");
    assert_eq!(writer.group_path(b), "/fire.0/scalar");
}

// =============================================================================
// Create Mode Tests
// =============================================================================

#[test]
fn test_fail_on_existing() {
    let (_temp, path) = setup_temp_archive();
    fs::write(&path, b"existing").unwrap();

    let result = ArchiveWriter::create(&path, CreateMode::FailOnExisting);
    assert!(matches!(result, Err(StoreError::AlreadyExists(_))));

    // Existing contents untouched
    assert_eq!(fs::read(&path).unwrap(), b"existing");
}

#[test]
fn test_overwrite_truncates() {
    let (_temp, path) = setup_temp_archive();
    fs::write(&path, vec![0xAB; 4096]).unwrap();

    let writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let summary = writer.finish(false).unwrap();

    assert!(summary.file_size < 4096);
    assert!(ArchiveReader::open(&path, true).is_ok());
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_open_too_small() {
    let (_temp, path) = setup_temp_archive();
    fs::write(&path, b"F3DA").unwrap();

    let result = ArchiveReader::open(&path, true);
    assert!(matches!(result, Err(StoreError::CorruptArchive(_))));
}

#[test]
fn test_open_bad_magic() {
    let (_temp, path) = setup_temp_archive();
    fs::write(&path, vec![b'X'; 64]).unwrap();

    let result = ArchiveReader::open(&path, true);
    assert!(matches!(result, Err(StoreError::CorruptArchive(_))));
}

#[test]
fn test_open_missing_file() {
    let (_temp, path) = setup_temp_archive();

    let result = ArchiveReader::open(&path, true);
    assert!(matches!(result, Err(StoreError::Io(_))));
}

#[test]
fn test_checksum_detects_data_corruption() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    writer.write_attribute(GroupHandle::ROOT, "k", b"hello").unwrap();
    writer.finish(false).unwrap();

    // First data byte sits right after the 14-byte header
    let mut bytes = fs::read(&path).unwrap();
    bytes[14] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let result = ArchiveReader::open(&path, true);
    assert!(matches!(result, Err(StoreError::CorruptArchive(_))));

    // Without verification the index still loads
    let reader = ArchiveReader::open(&path, false).unwrap();
    let value = reader.read_attribute(reader.root(), "k").unwrap().unwrap();
    assert_ne!(&value[..], b"hello");
}

#[test]
fn test_truncated_index_detected() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let group = writer.create_group(GroupHandle::ROOT, "a_long_group_name").unwrap();
    writer.write_value(group, "n", &1i32).unwrap();
    writer.finish(false).unwrap();

    // Drop the footer and part of the index, then append a fresh footer
    // pointing at the original index offset
    let bytes = fs::read(&path).unwrap();
    let footer = bytes[bytes.len() - 16..].to_vec();
    let mut truncated = bytes[..bytes.len() - 24].to_vec();
    truncated.extend_from_slice(&footer);
    fs::write(&path, &truncated).unwrap();

    assert!(ArchiveReader::open(&path, true).is_err());
}

#[test]
fn test_oversized_group_count_rejected() {
    let (_temp, path) = setup_temp_archive();

    let writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    writer.finish(false).unwrap();

    // The header claims far more groups than the index can hold
    let mut bytes = fs::read(&path).unwrap();
    bytes[6..10].copy_from_slice(&u32::MAX.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let result = ArchiveReader::open(&path, true);
    assert!(matches!(result, Err(StoreError::CorruptArchive(_))));
}

// =============================================================================
// Write Failure Tests
// =============================================================================

#[cfg(target_os = "linux")]
#[test]
fn test_failed_write_poisons_writer() {
    // Every write to this device fails with ENOSPC
    let full = std::path::Path::new("/dev/full");
    if !full.exists() {
        return;
    }

    let mut writer = ArchiveWriter::create(full, CreateMode::Overwrite).unwrap();
    assert!(!writer.is_poisoned());

    // Larger than the write buffer, so it reaches the device immediately
    let large = vec![0u8; 1 << 16];
    let result = writer.write_attribute(GroupHandle::ROOT, "large", &large);
    assert!(matches!(result, Err(StoreError::Io(_))));
    assert!(writer.is_poisoned());

    let result = writer.write_attribute(GroupHandle::ROOT, "small", b"x");
    assert!(matches!(result, Err(StoreError::Poisoned(_))));
    let result = writer.create_group(GroupHandle::ROOT, "a");
    assert!(matches!(result, Err(StoreError::Poisoned(_))));
    assert!(matches!(writer.finish(false), Err(StoreError::Poisoned(_))));
}

// =============================================================================
// Walk Tests
// =============================================================================

#[test]
fn test_walk_is_preorder_with_depth() {
    let (_temp, path) = setup_temp_archive();

    let mut writer = ArchiveWriter::create(&path, CreateMode::Overwrite).unwrap();
    let root = writer.root();
    let a = writer.create_group(root, "a").unwrap();
    writer.create_group(a, "a1").unwrap();
    writer.create_group(root, "b").unwrap();
    writer.finish(false).unwrap();

    let reader = ArchiveReader::open(&path, true).unwrap();
    let walked: Vec<(usize, String)> = reader
        .walk()
        .map(|(depth, g)| (depth, reader.group_name(g).unwrap().to_string()))
        .collect();

    assert_eq!(
        walked,
        vec![
            (0, String::new()),
            (1, "a".to_string()),
            (2, "a1".to_string()),
            (1, "b".to_string()),
        ]
    );
}
