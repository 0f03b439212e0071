//! Clock and delay abstraction providing the timing primitives required by
//! heartbeat and timeout logic.
use embassy_time::Instant;

/// Monotonic clock plus asynchronous delay.
pub trait LinkTimer {
    /// Current monotonic time (device uptime).
    fn now(&self) -> Instant;

    /// Asynchronously wait for `millis` milliseconds.
    fn delay_ms<'a>(&'a mut self, millis: u32) -> impl core::future::Future<Output = ()> + 'a;
}

/// [`LinkTimer`] backed by the embassy time driver of the firmware.
#[cfg(feature = "embassy-driver")]
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyTimer;

#[cfg(feature = "embassy-driver")]
impl LinkTimer for EmbassyTimer {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn delay_ms(&mut self, millis: u32) {
        embassy_time::Timer::after_millis(millis as u64).await
    }
}
