//! Hardware access traits.
//!
//! A board implements the subset of these traits that a driver asks for. Every trait hands out
//! mutable references to peripherals the board owns, so a single struct can carry all pins, the
//! delay source and the shared [ErrorHw::Error] type.

use embedded_hal::{
    digital::{ErrorType as PinErrorType, InputPin, OutputPin, PinState},
    spi::ErrorType as SpiErrorType,
};
use embedded_hal_async::{delay::DelayNs, digital::Wait, spi::SpiDevice};

use crate::log::trace;

/// Provides the error type every hardware error is converted into.
///
/// Drivers add `From` bounds on this type for each pin and bus error they can encounter.
pub trait ErrorHw {
    type Error;
}

/// The SPI device used to talk to a display controller.
pub trait SpiHw {
    type Spi: SpiDevice;
}

/// Data/command select pin. Low selects a command byte, high selects parameter data.
pub trait DcHw {
    type Dc: OutputPin;

    fn dc(&mut self) -> &mut Self::Dc;
}

/// Hardware reset pin (active low).
pub trait ResetHw {
    type Reset: OutputPin;

    fn reset(&mut self) -> &mut Self::Reset;
}

/// Busy status pin.
pub trait BusyHw {
    type Busy: InputPin + Wait;

    fn busy(&mut self) -> &mut Self::Busy;

    /// The level at which [BusyHw::busy] reports that the controller is busy.
    ///
    /// Boards with an inverting level shifter can flip this without touching the driver.
    fn busy_when(&self) -> PinState;
}

/// Switch for the panel's supply rail.
pub trait PowerHw {
    type Power: OutputPin;

    fn power(&mut self) -> &mut Self::Power;
}

/// Delay source for reset pulses and settle times.
pub trait DelayHw {
    type Delay: DelayNs;

    fn delay(&mut self) -> &mut Self::Delay;
}

/// Awaits the busy pin.
pub(crate) trait BusyWait: ErrorHw {
    /// Returns immediately when idle, otherwise waits for the busy pin to be released.
    ///
    /// There is no timeout: a panel that never releases BUSY (e.g. unpowered) blocks forever.
    async fn wait_if_busy(&mut self) -> Result<(), Self::Error>;
}

/// Sends `<command>` then `<data>` style transfers, switching the DC pin between the two phases.
pub(crate) trait CommandDataSend: SpiHw + ErrorHw {
    /// Waits until idle, then sends `command` followed by `data` (if any).
    async fn send(
        &mut self,
        spi: &mut Self::Spi,
        command: u8,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    /// Waits until idle, then sends `command` followed by `count` copies of `value`.
    async fn send_repeated(
        &mut self,
        spi: &mut Self::Spi,
        command: u8,
        value: u8,
        count: usize,
    ) -> Result<(), Self::Error>;
}

/// Chunk size used when streaming a repeated byte.
const REPEAT_CHUNK: usize = 64;

impl<HW> BusyWait for HW
where
    HW: BusyHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>,
{
    async fn wait_if_busy(&mut self) -> Result<(), HW::Error> {
        let busy_when = self.busy_when();
        let busy = self.busy();
        let is_busy = match busy_when {
            PinState::High => busy.is_high()?,
            PinState::Low => busy.is_low()?,
        };
        if is_busy {
            trace!("Waiting for busy display");
            match busy_when {
                PinState::High => busy.wait_for_low().await?,
                PinState::Low => busy.wait_for_high().await?,
            }
        }
        Ok(())
    }
}

/// Waits for BUSY to clear and clocks out `command` with DC low.
async fn command_phase<HW>(hw: &mut HW, spi: &mut HW::Spi, command: u8) -> Result<(), HW::Error>
where
    HW: DcHw + BusyHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Busy as PinErrorType>::Error>,
{
    hw.wait_if_busy().await?;
    hw.dc().set_low()?;
    spi.write(&[command]).await?;
    Ok(())
}

impl<HW> CommandDataSend for HW
where
    HW: DcHw + BusyHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Busy as PinErrorType>::Error>,
{
    async fn send(
        &mut self,
        spi: &mut Self::Spi,
        command: u8,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        trace!("Sending command {:#x} with {} data bytes", command, data.len());
        command_phase(self, spi, command).await?;

        if !data.is_empty() {
            self.dc().set_high()?;
            spi.write(data).await?;
        }
        Ok(())
    }

    async fn send_repeated(
        &mut self,
        spi: &mut Self::Spi,
        command: u8,
        value: u8,
        count: usize,
    ) -> Result<(), Self::Error> {
        trace!("Sending command {:#x} with {} x {:#x}", command, count, value);
        command_phase(self, spi, command).await?;

        if count > 0 {
            self.dc().set_high()?;
            let chunk = [value; REPEAT_CHUNK];
            let mut remaining = count;
            while remaining > 0 {
                let len = remaining.min(REPEAT_CHUNK);
                spi.write(&chunk[..len]).await?;
                remaining -= len;
            }
        }
        Ok(())
    }
}
