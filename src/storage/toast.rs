//! # Out-of-Line Value References
//!
//! Large variable-length values can live outside the row. The row then stores
//! an 18-byte reference in place of the value:
//!
//! ```text
//! +--------+-----+-------------+----------+
//! | Marker | Tag | Total Size  | Chunk ID |
//! | 1 byte | 1 B | 8 bytes     | 8 bytes  |
//! | 0x01   | 18  | u64 LE      | u64 LE   |
//! +--------+-----+-------------+----------+
//! ```
//!
//! The codec never follows a reference while encoding or decoding a row. Only
//! converting a row into a composite value needs the bytes, and it gets them
//! through the [`Detoaster`] capability.
//!
//! ## Chunk ID Encoding
//!
//! chunk_id = (row_id << 16) | column_index
//!
//! ## In-Memory Store
//!
//! [`MemoryToastStore`] keeps chunks of `TOAST_CHUNK_SIZE` bytes keyed by
//! `(chunk_id, chunk_seq)`. It is the reference implementation used by tests,
//! benches and hosts that do not have a storage manager of their own.

use eyre::{ensure, Result};
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::error::RowError;
use crate::types::varlena::{self, VARATT_EXTERNAL_MARKER, VARTAG_ONDISK, VARTAG_ONDISK_SIZE};

pub const TOAST_POINTER_SIZE: usize = 2 + VARTAG_ONDISK_SIZE;
pub const TOAST_CHUNK_SIZE: usize = 2000;

/// Resolves an out-of-line reference to the inline value it stands for.
pub trait Detoaster {
    /// Returns the complete long-header image of the referenced value.
    fn detoast(&self, toast_pointer: &[u8]) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastPointer {
    pub total_size: u64,
    pub chunk_id: u64,
}

impl ToastPointer {
    pub fn new(row_id: u64, column_index: u16, total_size: u64) -> Self {
        let chunk_id = (row_id << 16) | (column_index as u64);
        Self {
            total_size,
            chunk_id,
        }
    }

    pub fn encode(&self) -> [u8; TOAST_POINTER_SIZE] {
        let mut buf = [0u8; TOAST_POINTER_SIZE];
        buf[0] = VARATT_EXTERNAL_MARKER;
        buf[1] = VARTAG_ONDISK;
        buf[2..10].copy_from_slice(&self.total_size.to_le_bytes());
        buf[10..18].copy_from_slice(&self.chunk_id.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure!(
            data.len() >= TOAST_POINTER_SIZE,
            RowError::corrupted(format!(
                "toast pointer too short: {} < {}",
                data.len(),
                TOAST_POINTER_SIZE
            ))
        );
        ensure!(
            data[0] == VARATT_EXTERNAL_MARKER && data[1] == VARTAG_ONDISK,
            RowError::corrupted(format!(
                "invalid toast pointer header: {:02x} {:02x}",
                data[0], data[1]
            ))
        );

        let mut total = [0u8; 8];
        let mut chunk = [0u8; 8];
        total.copy_from_slice(&data[2..10]);
        chunk.copy_from_slice(&data[10..18]);

        Ok(Self {
            total_size: u64::from_le_bytes(total),
            chunk_id: u64::from_le_bytes(chunk),
        })
    }

    pub fn row_id(&self) -> u64 {
        self.chunk_id >> 16
    }

    pub fn column_index(&self) -> u16 {
        (self.chunk_id & 0xFFFF) as u16
    }
}

pub fn is_toast_pointer(data: &[u8]) -> bool {
    data.len() == TOAST_POINTER_SIZE && data[0] == VARATT_EXTERNAL_MARKER && data[1] == VARTAG_ONDISK
}

pub fn chunk_count(total_size: usize) -> usize {
    total_size.div_ceil(TOAST_CHUNK_SIZE)
}

/// Chunked out-of-line storage held in memory.
#[derive(Debug, Default)]
pub struct MemoryToastStore {
    chunks: RwLock<HashMap<(u64, u32), Vec<u8>>>,
}

impl MemoryToastStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `payload` out of line and returns the reference image to store in
    /// the row in its place.
    pub fn store(&self, row_id: u64, column_index: u16, payload: &[u8]) -> Vec<u8> {
        let pointer = ToastPointer::new(row_id, column_index, payload.len() as u64);
        let mut chunks = self.chunks.write();
        for (seq, chunk) in payload.chunks(TOAST_CHUNK_SIZE).enumerate() {
            chunks.insert((pointer.chunk_id, seq as u32), chunk.to_vec());
        }
        pointer.encode().to_vec()
    }

    pub fn chunk_total(&self) -> usize {
        self.chunks.read().len()
    }
}

impl Detoaster for MemoryToastStore {
    fn detoast(&self, toast_pointer: &[u8]) -> Result<Vec<u8>> {
        let pointer = ToastPointer::decode(toast_pointer)?;
        let total_size = pointer.total_size as usize;

        let chunks = self.chunks.read();
        let mut payload = Vec::with_capacity(total_size);
        for seq in 0..chunk_count(total_size) {
            let chunk = chunks
                .get(&(pointer.chunk_id, seq as u32))
                .ok_or_else(|| {
                    RowError::corrupted(format!(
                        "toast chunk {} of value {:#x} not found",
                        seq, pointer.chunk_id
                    ))
                })?;
            payload.extend_from_slice(chunk);
        }
        ensure!(
            payload.len() == total_size,
            RowError::corrupted(format!(
                "toast value {:#x} has {} bytes, pointer says {}",
                pointer.chunk_id,
                payload.len(),
                total_size
            ))
        );

        Ok(varlena::long_from_payload(&payload))
    }
}
