//! Minimal abstraction for an asynchronous byte-oriented serial port. Allows
//! the library to plug into various implementations (embedded HAL UART,
//! desktop serial driver, in-memory pipe, etc.).
use futures_util::Future;

/// Contract to send and receive raw bytes asynchronously.
pub trait SerialPort {
    type Error: core::fmt::Debug;

    /// Write every byte of `bytes`. A frame is always handed over in one call.
    fn write<'a>(
        &'a mut self,
        bytes: &'a [u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;

    /// Wait until at least one byte is available and copy up to `buf.len()` bytes.
    ///
    /// Must be cancel-safe: the link service races this future against its
    /// timers and drops it when they win. Bytes must not be lost when that happens.
    fn read<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = Result<usize, Self::Error>> + 'a;
}
