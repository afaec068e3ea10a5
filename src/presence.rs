//! Sparse, block-lazy bitset over a decimal-digit-parameterized id domain.
//!
//! Records which ids in `[0, 10^length)` have been seen. The domain is split
//! into `10^sparse_prefix_length` blocks; a block's byte buffer is only
//! allocated once an id inside it is written, so a mostly-untouched domain of
//! 10^10 ids stays cheap. Blocks are never deallocated during the table's
//! lifetime. No internal locking: concurrent mutation needs external
//! exclusion, and `dump`/`load` must not be interleaved with it.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::SerializationError;

const HEADER_LEN: usize = 6;

pub struct SparsePresenceTable {
    domain: u64,
    block_effective_bits: u64,
    block_byte_size: usize,
    blocks: Vec<Option<Vec<u8>>>,
}

impl SparsePresenceTable {
    /// Create an empty table over `[0, 10^length)` with `10^sparse_prefix_length`
    /// lazily-allocated blocks.
    ///
    /// # Panics
    /// If the shape does not fit the serialization header: `block_count` must
    /// fit a `u16` and `block_byte_size` a `u32`.
    pub fn new(length: u32, sparse_prefix_length: u32) -> Self {
        assert!(
            sparse_prefix_length <= length && length <= 19,
            "invalid table shape: length {length}, sparse prefix {sparse_prefix_length}"
        );
        let block_count = 10usize.pow(sparse_prefix_length);
        assert!(
            block_count <= u16::MAX as usize,
            "block count {block_count} does not fit the u16 header field"
        );
        let block_effective_bits = 10u64.pow(length - sparse_prefix_length);
        let block_byte_size = block_effective_bits.div_ceil(8);
        assert!(
            block_byte_size <= u32::MAX as u64,
            "block byte size {block_byte_size} does not fit the u32 header field"
        );
        Self {
            domain: 10u64.pow(length),
            block_effective_bits,
            block_byte_size: block_byte_size as usize,
            blocks: vec![None; block_count],
        }
    }

    /// Like [`new`](Self::new), but with the given block prefixes allocated
    /// up front (all bits absent).
    pub fn with_preallocated(
        length: u32,
        sparse_prefix_length: u32,
        prefixes: impl IntoIterator<Item = usize>,
    ) -> Self {
        let mut table = Self::new(length, sparse_prefix_length);
        for prefix in prefixes {
            table.blocks[prefix] = Some(vec![0; table.block_byte_size]);
        }
        table
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_byte_size(&self) -> usize {
        self.block_byte_size
    }

    /// The raw buffer of a block, or `None` while it is unallocated.
    pub fn block(&self, prefix: usize) -> Option<&[u8]> {
        self.blocks[prefix].as_deref()
    }

    /// Indices of the blocks allocated so far, in order.
    pub fn allocated_blocks(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(i, block)| block.is_some().then_some(i))
    }

    fn locate(&self, id: u64) -> (usize, usize, u8) {
        assert!(
            id < self.domain,
            "id {id} outside the table domain [0, {})",
            self.domain
        );
        let block = (id / self.block_effective_bits) as usize;
        let bit_in_block = id % self.block_effective_bits;
        // bit 7 is the first bit of the byte
        (block, (bit_in_block / 8) as usize, 0x80 >> (bit_in_block % 8))
    }

    /// Whether `id` has been recorded. Never allocates.
    pub fn is_present(&self, id: u64) -> bool {
        let (block, byte, mask) = self.locate(id);
        match &self.blocks[block] {
            Some(buf) => buf[byte] & mask != 0,
            None => false,
        }
    }

    /// Alias of [`is_present`](Self::is_present).
    pub fn contains(&self, id: u64) -> bool {
        self.is_present(id)
    }

    /// Record `id`, allocating its block if needed. Idempotent.
    pub fn set_present(&mut self, id: u64) {
        let (block, byte, mask) = self.locate(id);
        let size = self.block_byte_size;
        let buf = self.blocks[block].get_or_insert_with(|| vec![0; size]);
        buf[byte] |= mask;
    }

    /// Test-and-set: record `id` and return whether it was already recorded.
    ///
    /// Allocates the block even when the answer is a miss; this matches the
    /// table's observable behavior relied on by its serialized form.
    pub fn present(&mut self, id: u64) -> bool {
        let (block, byte, mask) = self.locate(id);
        let size = self.block_byte_size;
        let buf = self.blocks[block].get_or_insert_with(|| vec![0; size]);
        let prior = buf[byte] & mask != 0;
        buf[byte] |= mask;
        prior
    }

    /// Write the table to `sink`: a `(block_count: u16 BE, block_byte_size:
    /// u32 BE)` header, then per block a one-byte allocated flag followed by
    /// the raw buffer when set. Returns the count of block-content bytes
    /// written, flags and header excluded.
    pub fn dump(&self, mut sink: impl Write) -> Result<u64, SerializationError> {
        sink.write_all(&(self.blocks.len() as u16).to_be_bytes())?;
        sink.write_all(&(self.block_byte_size as u32).to_be_bytes())?;
        let mut byte_count = 0u64;
        for block in &self.blocks {
            match block {
                None => sink.write_all(&[0])?,
                Some(buf) => {
                    sink.write_all(&[1])?;
                    sink.write_all(buf)?;
                    byte_count += buf.len() as u64;
                }
            }
        }
        Ok(byte_count)
    }

    /// Read a table previously written by [`dump`](Self::dump), replacing
    /// this table's slots wholesale (a clear flag leaves the slot unallocated,
    /// a set flag overwrites the buffer; nothing is merged).
    ///
    /// The header must match this table's own shape exactly; a mismatch fails
    /// before any slot is touched. A stream ending mid-block fails with the
    /// offending block index; slots overwritten before that point remain.
    /// Returns the count of block-content bytes read.
    pub fn load(&mut self, mut source: impl Read) -> Result<u64, SerializationError> {
        let mut header = [0u8; HEADER_LEN];
        let got = read_fully(&mut source, &mut header)?;
        if got != HEADER_LEN {
            return Err(SerializationError::TruncatedHeader {
                expected: HEADER_LEN,
                got,
            });
        }
        let block_count = u16::from_be_bytes([header[0], header[1]]);
        let block_byte_size = u32::from_be_bytes([header[2], header[3], header[4], header[5]]);
        if block_count as usize != self.blocks.len()
            || block_byte_size as u64 != self.block_byte_size as u64
        {
            return Err(SerializationError::ShapeMismatch {
                expected_block_count: self.blocks.len() as u16,
                expected_block_byte_size: self.block_byte_size as u32,
                actual_block_count: block_count,
                actual_block_byte_size: block_byte_size,
            });
        }
        let mut byte_count = 0u64;
        for index in 0..self.blocks.len() {
            let mut flag = [0u8; 1];
            if read_fully(&mut source, &mut flag)? != 1 {
                return Err(SerializationError::TruncatedBlock {
                    block: index,
                    expected: 1,
                    got: 0,
                });
            }
            if flag[0] == 0 {
                self.blocks[index] = None;
                continue;
            }
            let mut buf = vec![0u8; self.block_byte_size];
            let got = read_fully(&mut source, &mut buf)?;
            if got != self.block_byte_size {
                return Err(SerializationError::TruncatedBlock {
                    block: index,
                    expected: self.block_byte_size,
                    got,
                });
            }
            byte_count += got as u64;
            self.blocks[index] = Some(buf);
        }
        Ok(byte_count)
    }

    /// Load the table from a file; a missing file means an empty table and is
    /// not an error.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<u64, SerializationError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no presence table file, starting empty");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };
        let byte_count = self.load(BufReader::new(file))?;
        debug!(path = %path.display(), byte_count, "loaded presence table");
        Ok(byte_count)
    }

    /// Dump the table to a file, first renaming any existing file to a
    /// `.old`-suffixed backup. The backup is a crash-recovery artifact and is
    /// never restored automatically.
    pub fn store_file(&self, path: impl AsRef<Path>) -> Result<u64, SerializationError> {
        let path = path.as_ref();
        if path.exists() {
            let mut backup = path.as_os_str().to_owned();
            backup.push(".old");
            fs::rename(path, &backup)?;
        }
        let mut sink = BufWriter::new(File::create(path)?);
        let byte_count = self.dump(&mut sink)?;
        sink.flush()?;
        debug!(path = %path.display(), byte_count, "stored presence table");
        Ok(byte_count)
    }
}

/// Read until `buf` is full or the stream ends; returns the bytes read.
fn read_fully(mut source: impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
