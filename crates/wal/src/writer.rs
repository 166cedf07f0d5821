use base::{Result, WritableFile};
use codec::crc;

use crate::{RecordType, BLOCK_SIZE, HEADER_SIZE, MAX_RECORD_TYPE};

const ZEROES: [u8; HEADER_SIZE] = [0; HEADER_SIZE];

/// Appends logical records to a log file, fragmenting them across 32 KiB
/// blocks.
///
/// The writer only appends. Flush and fsync policy belongs to the caller,
/// which knows which records need to be durable before acknowledging.
/// Not thread-safe; the write path serializes access.
pub struct Writer {
    dest: Box<dyn WritableFile>,
    /// Bytes already written into the current block.
    block_offset: usize,
    /// CRC of each record-type byte, precomputed so per-record checksums
    /// only cover the payload.
    type_crc: [u32; MAX_RECORD_TYPE + 1],
}

fn type_crc_table() -> [u32; MAX_RECORD_TYPE + 1] {
    let mut table = [0u32; MAX_RECORD_TYPE + 1];
    for (t, slot) in table.iter_mut().enumerate() {
        *slot = crc::value(&[t as u8]);
    }
    table
}

impl Writer {
    /// A writer for a fresh log file.
    pub fn new(dest: Box<dyn WritableFile>) -> Writer {
        Writer {
            dest,
            block_offset: 0,
            type_crc: type_crc_table(),
        }
    }

    /// A writer appending to a log file that already holds `dest_length`
    /// bytes. The block cursor picks up exactly where the previous writer
    /// left off, so old and new records share the block framing.
    pub fn with_length(dest: Box<dyn WritableFile>, dest_length: u64) -> Writer {
        Writer {
            dest,
            block_offset: (dest_length % BLOCK_SIZE as u64) as usize,
            type_crc: type_crc_table(),
        }
    }

    /// Appends one logical record.
    ///
    /// An empty payload still emits a single `Full` record, so empty records
    /// survive a round trip.
    pub fn add_record(&mut self, payload: &[u8]) -> Result<()> {
        let mut left = payload;
        let mut begin = true;
        loop {
            let leftover = BLOCK_SIZE - self.block_offset;
            if leftover < HEADER_SIZE {
                // Too small for a header: fill with zeroes and start fresh.
                if leftover > 0 {
                    self.dest.append(&ZEROES[..leftover])?;
                }
                self.block_offset = 0;
            }

            let avail = BLOCK_SIZE - self.block_offset - HEADER_SIZE;
            let fragment_length = left.len().min(avail);
            let end = fragment_length == left.len();

            let record_type = match (begin, end) {
                (true, true) => RecordType::Full,
                (true, false) => RecordType::First,
                (false, true) => RecordType::Last,
                (false, false) => RecordType::Middle,
            };

            let (fragment, rest) = left.split_at(fragment_length);
            self.emit_physical_record(record_type, fragment)?;
            left = rest;
            begin = false;
            if end {
                return Ok(());
            }
        }
    }

    fn emit_physical_record(&mut self, t: RecordType, data: &[u8]) -> Result<()> {
        assert!(data.len() <= 0xffff); // length must fit in two bytes
        assert!(self.block_offset + HEADER_SIZE + data.len() <= BLOCK_SIZE);

        let crc = crc::mask(crc::extend(self.type_crc[t as usize], data));

        let mut header = [0u8; HEADER_SIZE];
        codec::encode_fixed32_into(&mut header[0..4], crc);
        header[4] = (data.len() & 0xff) as u8;
        header[5] = (data.len() >> 8) as u8;
        header[6] = t as u8;

        self.dest.append(&header)?;
        self.dest.append(data)?;
        self.block_offset += HEADER_SIZE + data.len();
        Ok(())
    }

    /// Hands the caller the sink, e.g. to flush or sync after a batch of
    /// records.
    pub fn file(&mut self) -> &mut dyn WritableFile {
        self.dest.as_mut()
    }
}
