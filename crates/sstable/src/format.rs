use base::{Error, Result};

/// Identifies a table file: "EBB1" read as little-endian bytes.
pub const TABLE_MAGIC: u32 = 0x3142_4245;

/// Footer bytes: one block handle (16) plus the magic (4).
pub const FOOTER_SIZE: usize = 20;

/// Bytes appended after every block: type (1) + masked crc32c (4).
pub const BLOCK_TRAILER_SIZE: usize = 5;

/// The only defined block type: raw, uncompressed bytes.
pub const BLOCK_TYPE_RAW: u8 = 0;

/// Position and length of a block within a table file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHandle {
    pub offset: u64,
    pub size: u64,
}

impl BlockHandle {
    pub fn encode_to(&self, dst: &mut Vec<u8>) {
        codec::put_fixed64(dst, self.offset);
        codec::put_fixed64(dst, self.size);
    }

    pub fn decode_from(input: &[u8]) -> Result<BlockHandle> {
        if input.len() < 16 {
            return Err(Error::corruption("bad block handle"));
        }
        Ok(BlockHandle {
            offset: codec::decode_fixed64(&input[0..8]),
            size: codec::decode_fixed64(&input[8..16]),
        })
    }
}

/// The fixed-size tail of a table file, pointing at the index block.
#[derive(Debug, Clone, Copy, Default)]
pub struct Footer {
    pub index_handle: BlockHandle,
}

impl Footer {
    pub fn encode_to(&self, dst: &mut Vec<u8>) {
        self.index_handle.encode_to(dst);
        codec::put_fixed32(dst, TABLE_MAGIC);
    }

    pub fn decode_from(input: &[u8]) -> Result<Footer> {
        if input.len() < FOOTER_SIZE {
            return Err(Error::corruption("footer too short"));
        }
        let magic = codec::decode_fixed32(&input[16..20]);
        if magic != TABLE_MAGIC {
            return Err(Error::corruption("not an sstable (bad magic number)"));
        }
        Ok(Footer {
            index_handle: BlockHandle::decode_from(&input[0..16])?,
        })
    }
}
