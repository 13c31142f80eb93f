//! `async` drivers for the displays on the TDS-8 controller.
//!
//! The crate is `no_std` and built on `embedded-hal-async`, so it runs on any executor and HAL that
//! implements those traits.
//!
//! ## Displays
//!
//! - [`epd5in79b`]: the 5.79" 792x272 black/white/red e-paper panel, driven over 4-wire SPI with
//!   DC, RESET, BUSY and power pins.
//! - [`er5517`]: the ER5517 graphics controller that drives the ER-TFT062-1 panel. The controller
//!   owns the framebuffer in its SDRAM and exposes a drawing engine, block transfer engine, PWM
//!   backlight, serial flash DMA and a character generator.
//! - [`gc9503`]: the panel-side GC9503 bridge on the same TFT, which only needs a bit-banged
//!   initialisation sequence before the ER5517 starts pushing RGB data.
//!
//! ## Hardware traits
//!
//! Drivers take a single `HW` type parameter that implements the traits in [`hw`] they need (SPI,
//! DC, reset, busy, power, delay). This keeps type signatures short at the cost of a small amount
//! of board set up code.
//!
//! ## Lifecycle
//!
//! The e-paper driver encodes its state in the type: [`Sleep`], [`Wake`] and [`Reset`] consume the
//! driver and return it in its new state, so operations that need an awake panel can't be called
//! on a sleeping one.
//!
//! Framebuffers are never rendered by this crate. Callers pass packed bytes through the views in
//! [`buffer`].
#![cfg_attr(not(test), no_std)]

pub mod buffer;
pub mod epd5in79b;
pub mod er5517;
pub mod gc9503;
pub mod hw;

mod log;
#[cfg(test)]
mod test_support;

use buffer::BufferView;

/// Displays that can be hardware reset.
#[allow(async_fn_in_trait)]
pub trait Reset<ERROR> {
    type DisplayOut;

    /// Pulses the reset line. Any sleep state is left behind.
    async fn reset(self) -> Result<Self::DisplayOut, ERROR>;
}

/// Displays with a low power mode.
#[allow(async_fn_in_trait)]
pub trait Sleep<SPI, ERROR> {
    type DisplayOut;

    async fn sleep(self, spi: &mut SPI) -> Result<Self::DisplayOut, ERROR>;
}

/// Displays that can leave their low power mode.
#[allow(async_fn_in_trait)]
pub trait Wake<SPI, ERROR> {
    type DisplayOut;

    /// Wakes the display and re-initialises it if the controller lost its configuration.
    async fn wake(self, spi: &mut SPI) -> Result<Self::DisplayOut, ERROR>;
}

/// Displays that show their RAM contents on request.
#[allow(async_fn_in_trait)]
pub trait Displayable<SPI, ERROR> {
    /// Refreshes the panel from display RAM. Completes once the refresh is finished.
    async fn update_display(&mut self, spi: &mut SPI) -> Result<(), ERROR>;
}

/// Displays that accept framebuffers of `FRAMES` planes at `BITS` bits per pixel.
#[allow(async_fn_in_trait)]
pub trait DisplaySimple<const BITS: usize, const FRAMES: usize, SPI, ERROR>:
    Displayable<SPI, ERROR>
{
    /// Writes the buffer into display RAM and refreshes the panel.
    async fn display_framebuffer(
        &mut self,
        spi: &mut SPI,
        buf: &dyn BufferView<BITS, FRAMES>,
    ) -> Result<(), ERROR>;

    /// Writes the buffer into display RAM without refreshing.
    async fn write_framebuffer(
        &mut self,
        spi: &mut SPI,
        buf: &dyn BufferView<BITS, FRAMES>,
    ) -> Result<(), ERROR>;
}

/// Displays that diff the current framebuffer against a base image during partial refreshes.
#[allow(async_fn_in_trait)]
pub trait DisplayPartial<const BITS: usize, const FRAMES: usize, SPI, ERROR>:
    DisplaySimple<BITS, FRAMES, SPI, ERROR>
{
    /// Writes the base image that the next refresh is compared against.
    async fn write_base_framebuffer(
        &mut self,
        spi: &mut SPI,
        buf: &dyn BufferView<BITS, FRAMES>,
    ) -> Result<(), ERROR>;
}
