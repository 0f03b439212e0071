//! Running XOR checksum of the serial frame.
//!
//! The builder and the receiver fold exactly the same byte ranges through the
//! same accumulator: header minus `SOH`, the full payload, then `ETX`.

/// XOR-fold `bytes` into `seed`.
#[inline]
pub fn checksum(seed: u8, bytes: &[u8]) -> u8 {
    bytes.iter().fold(seed, |acc, byte| acc ^ byte)
}

/// Incremental form of [`checksum`], for data arriving in pieces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Checksum(u8);

impl Checksum {
    /// Accumulator seeded with zero.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Fold a slice into the accumulator.
    #[inline]
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.0 = checksum(self.0, bytes);
        self
    }

    /// Fold a single byte into the accumulator.
    #[inline]
    pub fn push(&mut self, byte: u8) -> &mut Self {
        self.0 ^= byte;
        self
    }

    /// Current value.
    #[inline]
    pub const fn value(&self) -> u8 {
        self.0
    }
}
