use std::ops::Range;

use crate::*;

/// A range in a flat buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetSize {
  pub offset: u32,
  pub size: u32,
}

impl OffsetSize {
  pub fn into_range(self) -> Range<usize> {
    self.offset as usize..(self.offset + self.size) as usize
  }
}

/// Lay out consecutive ranges of given sizes.
pub struct OffsetSizeBufferBuilder {
  current_offset: u32,
  buffer: Vec<OffsetSize>,
}

impl OffsetSizeBufferBuilder {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      current_offset: 0,
      buffer: Vec::with_capacity(capacity),
    }
  }

  pub fn push_size(&mut self, size: u32) {
    self.buffer.push(OffsetSize {
      offset: self.current_offset,
      size,
    });
    self.current_offset += size;
  }

  pub fn total_size(&self) -> u32 {
    self.current_offset
  }

  pub fn finish(self) -> Vec<OffsetSize> {
    self.buffer
  }
}
