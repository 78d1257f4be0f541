use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;

use byteorder::{BigEndian, ByteOrder};
use lru::LruCache;
use tracing::debug;

use crate::consts::{
    BITMASK_INDEX_OFFSET, BITMASK_INDEX_WATER, BYTES_PER_INDEX_ENTRY, INDEX_ENTRIES_PER_BLOCK,
    SIZE_OF_INDEX_BLOCK,
};
use crate::error::MapFileError;
use crate::header::SubFileParameter;

/// One decoded 5-byte entry of a sub-file's block index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Byte offset of the block, relative to the sub-file start.
    pub offset: u64,
    /// Bit 39 of the raw entry: the block's tile is entirely water.
    pub is_water: bool,
}

impl IndexEntry {
    /// Splits the 40-bit raw value into the water flag and the 39-bit offset.
    pub fn from_raw(raw: u64) -> Self {
        Self {
            offset: raw & BITMASK_INDEX_OFFSET,
            is_water: raw & BITMASK_INDEX_WATER != 0,
        }
    }
}

/// LRU cache of fixed-size index blocks (128 entries of 5 bytes each).
///
/// Keys combine the sub-file's index segment address with the index block
/// number, so several sub-files share one cache. The cache itself does no
/// locking; the owner serializes access together with the file handle.
pub(crate) struct IndexCache {
    blocks: LruCache<(u64, u64), Vec<u8>>,
}

impl IndexCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            blocks: LruCache::new(capacity),
        }
    }

    /// Looks up the index entry for `block_number`, reading the containing
    /// index block from `reader` on a cache miss.
    pub(crate) fn get_index_entry<R: Read + Seek>(
        &mut self,
        sub_file: &SubFileParameter,
        block_number: u64,
        reader: &mut R,
    ) -> Result<IndexEntry, MapFileError> {
        if block_number >= sub_file.number_of_blocks {
            return Err(MapFileError::InvalidBlockNumber {
                block_number,
                number_of_blocks: sub_file.number_of_blocks,
            });
        }

        let index_block_number = block_number / INDEX_ENTRIES_PER_BLOCK;
        let key = (sub_file.index_start_address, index_block_number);

        if !self.blocks.contains(&key) {
            let block = Self::read_index_block(sub_file, index_block_number, reader)?;
            self.blocks.put(key, block);
        }
        // The entry was either present or just inserted.
        let index_block = self
            .blocks
            .get(&key)
            .ok_or_else(|| MapFileError::Format("index cache lookup failed".to_string()))?;

        let entry_offset =
            (block_number % INDEX_ENTRIES_PER_BLOCK) as usize * BYTES_PER_INDEX_ENTRY;
        if entry_offset + BYTES_PER_INDEX_ENTRY > index_block.len() {
            return Err(MapFileError::Format(format!(
                "index entry {block_number} lies outside its index block"
            )));
        }

        let raw = BigEndian::read_uint(&index_block[entry_offset..], BYTES_PER_INDEX_ENTRY);
        Ok(IndexEntry::from_raw(raw))
    }

    fn read_index_block<R: Read + Seek>(
        sub_file: &SubFileParameter,
        index_block_number: u64,
        reader: &mut R,
    ) -> Result<Vec<u8>, MapFileError> {
        let block_position =
            sub_file.index_start_address + index_block_number * SIZE_OF_INDEX_BLOCK;
        if block_position >= sub_file.index_end_address {
            return Err(MapFileError::Format(format!(
                "index block {index_block_number} starts past the index segment end"
            )));
        }

        // The final index block of a segment may be shorter than 640 bytes.
        let block_size =
            SIZE_OF_INDEX_BLOCK.min(sub_file.index_end_address - block_position) as usize;
        debug!(index_block_number, block_position, block_size, "index cache miss");

        let mut block = vec![0u8; block_size];
        reader.seek(SeekFrom::Start(block_position))?;
        reader.read_exact(&mut block)?;
        Ok(block)
    }
}
