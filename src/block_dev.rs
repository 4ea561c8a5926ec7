use crate::error::FsError;

pub trait BlockDevice {
    /// Returns the number of logical blocks on the device.
    fn num_blocks(&self) -> usize;

    /// Reads a block of data from the block device.
    /// buf.len() must be equal to block_size().
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), FsError>;

    /// Writes a block of data to the block device.
    /// buf.len() must be equal to block_size().
    fn write_block(&mut self, block_id: usize, buf: &[u8]) -> Result<(), FsError>;

    /// Returns the size of each block in bytes.
    fn block_size(&self) -> usize {
        crate::config::BLOCK_SIZE
    }

    /// Checks `block_id` and the buffer length against the device shape.
    fn check_access(&self, block_id: usize, buf_len: usize) -> Result<(), FsError> {
        if block_id >= self.num_blocks() {
            return Err(FsError::BlockOutOfRange { block: block_id, count: self.num_blocks() });
        }
        if buf_len != self.block_size() {
            return Err(FsError::BadBufferSize { expected: self.block_size(), got: buf_len });
        }
        Ok(())
    }
}
