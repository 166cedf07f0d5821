use std::sync::Arc;

use anyhow::Result;
use base::{DiskEnv, Env, Options, ReadOptions, StorageIterator};
use tempfile::tempdir;

use crate::builder::TableBuilder;
use crate::reader::Table;

fn sample_entries(n: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..n)
        .map(|i| {
            (
                format!("key{i:04}").into_bytes(),
                format!("value-{i}-{}", "x".repeat(i % 17)).into_bytes(),
            )
        })
        .collect()
}

/// Builds a table under `options`, returning its path and size.
fn build_table_file(
    dir: &std::path::Path,
    options: &Options,
    entries: &[(Vec<u8>, Vec<u8>)],
) -> Result<(std::path::PathBuf, u64)> {
    let path = dir.join("test.sst");
    let env = DiskEnv;
    let file = env.new_writable_file(&path)?;
    let mut builder = TableBuilder::new(options, file);
    for (key, value) in entries {
        builder.add(key, value);
    }
    builder.finish()?;
    let size = builder.file_size();
    builder.file().sync()?;
    builder.file().close()?;
    assert_eq!(builder.num_entries(), entries.len() as u64);
    Ok((path, size))
}

fn open_table(options: &Options, path: &std::path::Path, size: u64) -> Result<Arc<Table>> {
    let env = DiskEnv;
    let file = env.new_random_access_file(path)?;
    Ok(Table::open(options, Arc::from(file), size)?)
}

// -------------------- Round trips --------------------

#[test]
fn single_block_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let options = Options::default();
    let entries = sample_entries(10);
    let (path, size) = build_table_file(dir.path(), &options, &entries)?;

    // The builder's size is the on-disk truth.
    assert_eq!(DiskEnv.file_size(&path)?, size);

    let table = open_table(&options, &path, size)?;
    let mut iter = table.iter(&ReadOptions::default());
    let mut seen = Vec::new();
    iter.seek_to_first();
    while iter.valid() {
        seen.push((iter.key().to_vec(), iter.value().to_vec()));
        iter.next();
    }
    iter.status()?;
    assert_eq!(seen, entries);
    Ok(())
}

#[test]
fn multi_block_round_trip() -> Result<()> {
    let dir = tempdir()?;
    // A tiny block size forces a table with many data blocks.
    let options = Options {
        block_size: 128,
        block_restart_interval: 4,
        ..Options::default()
    };
    let entries = sample_entries(500);
    let (path, size) = build_table_file(dir.path(), &options, &entries)?;

    let table = open_table(&options, &path, size)?;
    let read = ReadOptions {
        verify_checksums: true,
    };
    let mut iter = table.iter(&read);
    let mut seen = Vec::new();
    iter.seek_to_first();
    while iter.valid() {
        seen.push((iter.key().to_vec(), iter.value().to_vec()));
        iter.next();
    }
    iter.status()?;
    assert_eq!(seen, entries);
    Ok(())
}

// -------------------- Seeking --------------------

#[test]
fn seek_positions_across_blocks() -> Result<()> {
    let dir = tempdir()?;
    let options = Options {
        block_size: 64,
        ..Options::default()
    };
    let entries = sample_entries(300);
    let (path, size) = build_table_file(dir.path(), &options, &entries)?;
    let table = open_table(&options, &path, size)?;

    let mut iter = table.iter(&ReadOptions::default());

    iter.seek(b"key0150");
    assert!(iter.valid());
    assert_eq!(iter.key(), b"key0150");

    // A target between stored keys lands on the next key, possibly in the
    // next block.
    iter.seek(b"key0150a");
    assert_eq!(iter.key(), b"key0151");

    iter.seek(b"");
    assert_eq!(iter.key(), b"key0000");

    iter.seek(b"zzz");
    assert!(!iter.valid());
    Ok(())
}

#[test]
fn reverse_scan_and_direction_changes() -> Result<()> {
    let dir = tempdir()?;
    let options = Options {
        block_size: 64,
        ..Options::default()
    };
    let entries = sample_entries(120);
    let (path, size) = build_table_file(dir.path(), &options, &entries)?;
    let table = open_table(&options, &path, size)?;

    let mut iter = table.iter(&ReadOptions::default());
    iter.seek_to_last();
    let mut seen = Vec::new();
    while iter.valid() {
        seen.push(iter.key().to_vec());
        iter.prev();
    }
    seen.reverse();
    let expected: Vec<Vec<u8>> = entries.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(seen, expected);

    // Flip direction in the middle, across a block boundary.
    iter.seek(b"key0060");
    iter.prev();
    assert_eq!(iter.key(), b"key0059");
    iter.next();
    assert_eq!(iter.key(), b"key0060");
    Ok(())
}

// -------------------- Validation --------------------

#[test]
fn open_rejects_garbage_and_short_files() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("bogus.sst");
    std::fs::write(&path, b"this is not an sstable, clearly")?;

    let env = DiskEnv;
    let size = env.file_size(&path)?;
    let file: Arc<dyn base::RandomAccessFile> = Arc::from(env.new_random_access_file(&path)?);
    let err = Table::open(&Options::default(), Arc::clone(&file), size).unwrap_err();
    assert!(err.is_corruption());

    let err = Table::open(&Options::default(), file, 3).unwrap_err();
    assert!(err.is_corruption());
    Ok(())
}

#[test]
fn corrupt_data_block_fails_checksum_verification() -> Result<()> {
    let dir = tempdir()?;
    let options = Options::default();
    let entries = sample_entries(50);
    let (path, size) = build_table_file(dir.path(), &options, &entries)?;

    // Flip one byte inside the first data block; the footer and index at
    // the tail stay intact, so the table still opens.
    let mut bytes = std::fs::read(&path)?;
    bytes[5] ^= 0xff;
    std::fs::write(&path, &bytes)?;

    let table = open_table(&options, &path, size)?;
    let read = ReadOptions {
        verify_checksums: true,
    };
    let mut iter = table.iter(&read);
    iter.seek_to_first();
    assert!(!iter.valid());
    assert!(iter.status().unwrap_err().is_corruption());
    Ok(())
}
