/// Chunk-size policy for reads.
///
/// Decides how many bytes the read adapter asks the channel for on each
/// pull. Purely a configuration value; the adapter may emit shorter chunks
/// when the channel returns fewer bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buffers(usize);

impl Buffers {
  /// Smallest useful chunk, for tests and tiny streams.
  pub const MIN: Buffers = Buffers(128);
  /// 1 KiB chunks.
  pub const K1: Buffers = Buffers(1024);
  /// 4 KiB chunks.
  pub const K4: Buffers = Buffers(4 * 1024);
  /// 8 KiB chunks, the default.
  pub const K8: Buffers = Buffers(8 * 1024);
  /// 16 KiB chunks.
  pub const K16: Buffers = Buffers(16 * 1024);
  /// 64 KiB chunks.
  pub const K64: Buffers = Buffers(64 * 1024);

  /// Chunk size in bytes.
  #[must_use]
  pub const fn size(self) -> usize {
    self.0
  }
}

impl Default for Buffers {
  fn default() -> Self {
    Self::K8
  }
}
