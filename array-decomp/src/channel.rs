//! Two-phase chunk exchange: the offset travels first on its own tag, then
//! the values on another. The chunk length is never sent; both sides derive
//! it from the shared partition.
use crate::{Chunk, CommGroup, Error, Result};
use tracing::trace;

/// Tag carrying the chunk offset.
pub const OFFSET_TAG: u32 = 1;
/// Tag carrying the chunk values.
pub const CHUNK_TAG: u32 = 2;

pub struct ChunkChannel<'a, C> {
    comm: &'a C,
}

impl<'a, C: CommGroup> ChunkChannel<'a, C> {
    pub fn new(comm: &'a C) -> Self {
        ChunkChannel { comm }
    }

    /// Send the chunk's offset and then its values to `dest`.
    pub async fn send_chunk(&self, dest: u32, chunk: &Chunk) -> Result<()> {
        let offset = chunk.offset as u64;
        self.comm.send(&offset, dest, OFFSET_TAG).await?;
        self.comm.send(&chunk.values, dest, CHUNK_TAG).await?;
        trace!(peer = dest, offset, len = chunk.len(), "chunk sent");
        Ok(())
    }

    /// Receive an offset and then `expected_len` values from `source`.
    ///
    /// The chunk must fit inside an array of `array_len` elements.
    pub async fn recv_chunk(
        &self,
        source: u32,
        expected_len: usize,
        array_len: usize,
    ) -> Result<Chunk> {
        let offset: u64 = self.comm.recv(source, OFFSET_TAG).await?;
        let values: Vec<f64> = self.comm.recv(source, CHUNK_TAG).await?;

        if values.len() != expected_len {
            return Err(Error::transport(
                source,
                CHUNK_TAG,
                format!("expected {} values, got {}", expected_len, values.len()),
            ));
        }
        let offset = usize::try_from(offset)
            .ok()
            .filter(|offset| offset.checked_add(values.len()).map_or(false, |end| end <= array_len))
            .ok_or_else(|| {
                Error::transport(
                    source,
                    OFFSET_TAG,
                    format!("offset {} does not fit an array of {} elements", offset, array_len),
                )
            })?;

        trace!(peer = source, offset, len = values.len(), "chunk received");
        Ok(Chunk::new(offset, values))
    }
}
