use std::io::Read;

use base::{Error, Result};
use codec::crc;

use crate::{RecordType, BLOCK_SIZE, HEADER_SIZE};

/// Outcome of scanning for one physical record.
enum Physical {
    Record(RecordType, Vec<u8>),
    /// End of readable input, including a truncated tail from a crash
    /// mid-write.
    Eof,
}

/// Sequential reader for a block-framed log.
///
/// Generic over any [`Read`] implementor, so tests can replay from in-memory
/// buffers. Verifies every physical record's masked CRC and reassembles
/// fragmented logical records.
///
/// A truncated tail — a header or payload cut short at end of input — is
/// treated as a clean end of log: it is exactly what a crash in the middle
/// of an append leaves behind, and every record before it is intact.
/// Violations *inside* the readable stream (checksum mismatch, impossible
/// lengths, fragments out of order) are corruption.
pub struct Reader<R: Read> {
    src: R,
    /// Contents of the current block.
    buf: Vec<u8>,
    /// Read cursor within `buf`.
    pos: usize,
    /// True once `src` returned a short block.
    eof: bool,
}

impl<R: Read> Reader<R> {
    pub fn new(src: R) -> Reader<R> {
        Reader {
            src,
            buf: Vec::new(),
            pos: 0,
            eof: false,
        }
    }

    /// Returns the next logical record, or `None` at end of log.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let mut scratch: Vec<u8> = Vec::new();
        let mut in_fragmented_record = false;

        loop {
            match self.read_physical_record()? {
                Physical::Eof => {
                    // Mid-record EOF means the final append was cut short;
                    // the partial logical record is discarded.
                    return Ok(None);
                }
                Physical::Record(RecordType::Full, data) => {
                    if in_fragmented_record {
                        return Err(Error::corruption("partial record without end"));
                    }
                    return Ok(Some(data));
                }
                Physical::Record(RecordType::First, data) => {
                    if in_fragmented_record {
                        return Err(Error::corruption("partial record without end"));
                    }
                    scratch = data;
                    in_fragmented_record = true;
                }
                Physical::Record(RecordType::Middle, data) => {
                    if !in_fragmented_record {
                        return Err(Error::corruption("missing start of fragmented record"));
                    }
                    scratch.extend_from_slice(&data);
                }
                Physical::Record(RecordType::Last, data) => {
                    if !in_fragmented_record {
                        return Err(Error::corruption("missing start of fragmented record"));
                    }
                    scratch.extend_from_slice(&data);
                    return Ok(Some(scratch));
                }
            }
        }
    }

    fn read_physical_record(&mut self) -> Result<Physical> {
        loop {
            if self.buf.len() - self.pos < HEADER_SIZE {
                // Block trailer (or nothing buffered yet): move to the next
                // block. Trailer bytes are zero-fill emitted by the writer.
                if self.eof {
                    return Ok(Physical::Eof);
                }
                self.load_next_block()?;
                if self.buf.is_empty() {
                    return Ok(Physical::Eof);
                }
                continue;
            }

            let header = &self.buf[self.pos..self.pos + HEADER_SIZE];
            let length = usize::from(header[4]) | usize::from(header[5]) << 8;
            let type_byte = header[6];

            if type_byte == 0 && length == 0 {
                // Zero-filled region (block trailer or preallocation): the
                // rest of this block holds no records.
                self.pos = self.buf.len();
                continue;
            }

            if self.pos + HEADER_SIZE + length > self.buf.len() {
                if self.eof {
                    // Payload cut short by a crash.
                    return Ok(Physical::Eof);
                }
                return Err(Error::corruption("bad record length"));
            }

            let payload = &self.buf[self.pos + HEADER_SIZE..self.pos + HEADER_SIZE + length];
            let expected = crc::unmask(codec::decode_fixed32(&header[0..4]));
            let actual = crc::extend(crc::value(&[type_byte]), payload);
            if expected != actual {
                return Err(Error::corruption("log record checksum mismatch"));
            }

            let record_type = RecordType::from_u8(type_byte)?;
            let data = payload.to_vec();
            self.pos += HEADER_SIZE + length;
            return Ok(Physical::Record(record_type, data));
        }
    }

    /// Reads the next 32 KiB block (or whatever remains of the input).
    fn load_next_block(&mut self) -> Result<()> {
        self.buf.resize(BLOCK_SIZE, 0);
        self.pos = 0;
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            let read = self.src.read(&mut self.buf[filled..]).map_err(Error::from)?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        self.buf.truncate(filled);
        if filled < BLOCK_SIZE {
            self.eof = true;
        }
        Ok(())
    }
}
