//! End-to-end flows: batch → log → memtable → table → merged reads.

use std::sync::Arc;

use anyhow::Result;
use base::{
    log_file_name, parse_internal_key, BytewiseComparator, DiskEnv, Env, InternalKeyComparator,
    LookupKey, ReadOptions, StorageIterator, ValueType,
};
use batch::WriteBatch;
use tempfile::tempdir;

use crate::tests::helpers::{internal_key_options, new_memtable};
use crate::{build_table, FileMetaData, TableCache};

#[test]
fn batch_survives_the_log_and_replays_into_the_memtable() -> Result<()> {
    let dir = tempdir()?;
    let env = DiskEnv;
    let log_path = log_file_name(dir.path(), 1);

    // The write path: encode a batch, append it to the log, sync.
    let mut batch = WriteBatch::new();
    batch.set_sequence(10);
    batch.put(b"a", b"1");
    batch.delete(b"b");
    batch.put(b"c", b"3");
    {
        let file = env.new_writable_file(&log_path)?;
        let mut log = wal::Writer::new(file);
        log.add_record(batch.contents())?;
        log.file().sync()?;
    }

    // The recovery path: replay every log record into a fresh memtable.
    let mem = new_memtable();
    let mut reader = wal::Reader::new(std::fs::File::open(&log_path)?);
    let mut max_sequence = 0;
    while let Some(record) = reader.read_record()? {
        let mut replayed = WriteBatch::new();
        replayed.set_contents(&record);
        batch::insert_into(&replayed, &mem)?;
        max_sequence = max_sequence.max(replayed.sequence() + u64::from(replayed.count()) - 1);
    }

    assert_eq!(max_sequence, 12);
    assert_eq!(mem.len(), 3);
    assert_eq!(mem.get(&LookupKey::new(b"a", 12)).unwrap().unwrap(), b"1");
    assert!(mem
        .get(&LookupKey::new(b"b", 12))
        .unwrap()
        .unwrap_err()
        .is_not_found());
    assert_eq!(mem.get(&LookupKey::new(b"c", 12)).unwrap().unwrap(), b"3");
    // Before the batch's sequence window nothing is visible.
    assert!(mem.get(&LookupKey::new(b"c", 11)).is_none());
    Ok(())
}

#[test]
fn reads_fan_out_over_memtable_and_table_newest_first() -> Result<()> {
    let dir = tempdir()?;
    let options = internal_key_options();
    let env: Arc<dyn Env> = Arc::new(DiskEnv);
    let cache = TableCache::new(dir.path(), Arc::clone(&env), &options);

    // Older state, flushed to a table: a=old, b=old, d=old.
    let flushed = new_memtable();
    flushed.add(1, ValueType::Value, b"a", b"a-old");
    flushed.add(2, ValueType::Value, b"b", b"b-old");
    flushed.add(3, ValueType::Value, b"d", b"d-old");
    let mut meta = FileMetaData {
        number: 1,
        ..FileMetaData::default()
    };
    build_table(
        dir.path(),
        env.as_ref(),
        &options,
        &cache,
        &mut flushed.iter(),
        &mut meta,
    )?;

    // Newer state still in memory: a rewritten, b deleted, c added.
    let mem = new_memtable();
    mem.add(10, ValueType::Value, b"a", b"a-new");
    mem.add(11, ValueType::Deletion, b"b", b"");
    mem.add(12, ValueType::Value, b"c", b"c-new");

    let cmp = Arc::new(InternalKeyComparator::new(Arc::new(BytewiseComparator)));
    let children: Vec<Box<dyn StorageIterator>> = vec![
        Box::new(mem.iter()),
        cache.new_iterator(&ReadOptions::default(), 1, meta.file_size),
    ];
    let mut merged = sstable::new_merging_iterator(cmp, children);

    // The unified stream: user keys ascending, and for each user key the
    // newest version first.
    let mut seen = Vec::new();
    merged.seek_to_first();
    while merged.valid() {
        let parsed = parse_internal_key(merged.key()).unwrap();
        seen.push((
            parsed.user_key.to_vec(),
            parsed.sequence,
            parsed.value_type,
            merged.value().to_vec(),
        ));
        merged.next();
    }
    merged.status()?;

    assert_eq!(
        seen,
        vec![
            (b"a".to_vec(), 10, ValueType::Value, b"a-new".to_vec()),
            (b"a".to_vec(), 1, ValueType::Value, b"a-old".to_vec()),
            (b"b".to_vec(), 11, ValueType::Deletion, b"".to_vec()),
            (b"b".to_vec(), 2, ValueType::Value, b"b-old".to_vec()),
            (b"c".to_vec(), 12, ValueType::Value, b"c-new".to_vec()),
            (b"d".to_vec(), 3, ValueType::Value, b"d-old".to_vec()),
        ]
    );

    // And the same stream walks backwards.
    merged.seek_to_last();
    let mut reversed = Vec::new();
    while merged.valid() {
        let parsed = parse_internal_key(merged.key()).unwrap();
        reversed.push((parsed.user_key.to_vec(), parsed.sequence));
        merged.prev();
    }
    reversed.reverse();
    let forward: Vec<(Vec<u8>, u64)> =
        seen.iter().map(|(k, s, _, _)| (k.clone(), *s)).collect();
    assert_eq!(reversed, forward);
    Ok(())
}

#[test]
fn snapshot_reads_through_history() {
    // The full put/overwrite/delete lifecycle of one key, in memory.
    let mem = new_memtable();
    mem.add(1, ValueType::Value, b"k1", b"v1");
    mem.add(2, ValueType::Value, b"k1", b"v2");
    mem.add(3, ValueType::Deletion, b"k1", b"");

    assert_eq!(mem.get(&LookupKey::new(b"k1", 1)).unwrap().unwrap(), b"v1");
    assert_eq!(mem.get(&LookupKey::new(b"k1", 2)).unwrap().unwrap(), b"v2");
    assert!(mem
        .get(&LookupKey::new(b"k1", 3))
        .unwrap()
        .unwrap_err()
        .is_not_found());
    assert!(mem.get(&LookupKey::new(b"k2", 3)).is_none());
}
