//! Driver for the ER5517 graphics controller on the ER-TFT062-1 module.
//!
//! The controller is register mapped. The host selects a register with a command cycle and then
//! reads or writes it with data cycles, each framed by its own chip select over 4-wire SPI. The
//! framebuffer lives in the controller's SDRAM and is scanned out to the panel over an RGB
//! interface, so the host only pushes pixels and drawing commands.
//!
//! Every wait on the controller is a status poll bounded by [config::Limits::poll_limit], so a
//! missing or unpowered controller surfaces as [Error::Timeout] rather than a hang.

use embedded_hal::{
    digital::{ErrorType as PinErrorType, OutputPin},
    spi::ErrorType as SpiErrorType,
};
use embedded_hal_async::{
    delay::DelayNs,
    spi::{Operation, SpiDevice},
};
use thiserror::Error as ThisError;

use crate::{
    hw::{DelayHw, ErrorHw, ResetHw, SpiHw},
    log::{debug, info, trace, warn_log},
    Reset,
};

pub mod bte;
pub mod config;
pub mod draw;
pub mod flash;
pub mod memory;
pub mod pwm;
pub mod registers;
pub mod text;

use config::{encode_horizontal, encode_vertical, Config};
use registers::{aw_color, ccr, dpcr, icr, macr, mpwctr, pcsr, Register, Status};

/// Recommended SPI clock for the host interface.
pub const RECOMMENDED_SPI_HZ: u32 = 10_000_000;

/// First byte of each SPI transaction, selecting the cycle type.
const COMMAND_WRITE: u8 = 0x00;
const STATUS_READ: u8 = 0x40;
const DATA_WRITE: u8 = 0x80;
const DATA_READ: u8 = 0xC0;

const RESET_PULSE_MS: u32 = 100;
const RESET_SETTLE_MS: u32 = 200;
/// Pause between status reads while the controller checks itself.
const CHECK_INTERVAL_MS: u32 = 2;
/// Software reset register value that reloads the PLL settings.
const RECONFIGURE_PLL: u8 = 0x80;
/// SDRAM control register value that starts initialisation.
const SDRAM_INIT: u8 = 0x01;

/// Errors from the ER5517 driver.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, ThisError)]
pub enum Error<E> {
    /// The bus or a pin failed.
    #[error("hardware error")]
    Hw(E),
    /// The controller never reached the expected state.
    #[error("timed out waiting for {0:?}")]
    Timeout(PollTarget),
    /// The PLLs didn't report ready during the system check.
    #[error("controller not ready after {attempts} status checks")]
    NotReady { attempts: u16 },
    /// A coordinate, size or value doesn't fit its register.
    #[error("value out of range")]
    OutOfRange,
}

/// What a bounded wait was polling for.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    WriteFifoNotFull,
    WriteFifoEmpty,
    CoreIdle,
    SdramReady,
    DmaIdle,
    SpiTxEmpty,
    SpiRxNotEmpty,
}

/// Reset, or not yet initialised.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateUninitialized();

/// Clocks, SDRAM and panel interface are configured and the display is scanning out.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateReady();

/// Controls an ER5517.
///
/// Create it with [Er5517::new] and call [Er5517::init] to bring up the clocks, SDRAM and panel
/// interface. Drawing, block transfer, PWM, flash and text operations live on the ready driver
/// and are grouped in the submodules.
pub struct Er5517<HW, STATE> {
    hw: HW,
    config: Config,
    _state: STATE,
}

impl<HW> Er5517<HW, StateUninitialized> {
    pub fn new(hw: HW, config: Config) -> Self {
        Er5517 {
            hw,
            config,
            _state: StateUninitialized(),
        }
    }
}

impl<HW, STATE> Er5517<HW, STATE> {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gives back the hardware, e.g. to reuse the pins after shutting the display down.
    pub fn release(self) -> HW {
        self.hw
    }

    fn into_state<NEXT>(self, state: NEXT) -> Er5517<HW, NEXT> {
        Er5517 {
            hw: self.hw,
            config: self.config,
            _state: state,
        }
    }
}

impl<HW: ErrorHw, STATE> Er5517<HW, STATE> {
    fn hw_error<E>(e: E) -> Error<HW::Error>
    where
        HW::Error: From<E>,
    {
        Error::Hw(e.into())
    }
}

/// Bus access. Available in every state so that the init sequence and raw register pokes share
/// the same framing.
impl<HW, STATE> Er5517<HW, STATE>
where
    HW: SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>,
{
    async fn command(&mut self, spi: &mut HW::Spi, register: u8) -> Result<(), Error<HW::Error>> {
        spi.write(&[COMMAND_WRITE, register])
            .await
            .map_err(Self::hw_error)
    }

    async fn data(&mut self, spi: &mut HW::Spi, value: u8) -> Result<(), Error<HW::Error>> {
        spi.write(&[DATA_WRITE, value]).await.map_err(Self::hw_error)
    }

    async fn read_cycle(&mut self, spi: &mut HW::Spi, cycle: u8) -> Result<u8, Error<HW::Error>> {
        let mut value = [0u8];
        spi.transaction(&mut [Operation::Write(&[cycle]), Operation::Read(&mut value)])
            .await
            .map_err(Self::hw_error)?;
        Ok(value[0])
    }

    async fn read_data(&mut self, spi: &mut HW::Spi) -> Result<u8, Error<HW::Error>> {
        self.read_cycle(spi, DATA_READ).await
    }

    /// Reads the status register. It needs no register select.
    pub async fn status(&mut self, spi: &mut HW::Spi) -> Result<Status, Error<HW::Error>> {
        let bits = self.read_cycle(spi, STATUS_READ).await?;
        Ok(Status::from_bits_retain(bits))
    }

    pub async fn write_register(
        &mut self,
        spi: &mut HW::Spi,
        register: Register,
        value: u8,
    ) -> Result<(), Error<HW::Error>> {
        trace!("Writing {:#x} to register {:#x}", value, register.address());
        self.command(spi, register.address()).await?;
        self.data(spi, value).await
    }

    pub async fn read_register(
        &mut self,
        spi: &mut HW::Spi,
        register: Register,
    ) -> Result<u8, Error<HW::Error>> {
        self.command(spi, register.address()).await?;
        self.read_data(spi).await
    }

    /// Replaces the bits selected by `mask` with `bits`, leaving the rest of the register as read.
    pub async fn update_register(
        &mut self,
        spi: &mut HW::Spi,
        register: Register,
        mask: u8,
        bits: u8,
    ) -> Result<(), Error<HW::Error>> {
        self.command(spi, register.address()).await?;
        let current = self.read_data(spi).await?;
        self.data(spi, (current & !mask) | (bits & mask)).await
    }

    /// Sets or clears every bit in `mask`.
    pub(crate) async fn set_bits(
        &mut self,
        spi: &mut HW::Spi,
        register: Register,
        mask: u8,
        enable: bool,
    ) -> Result<(), Error<HW::Error>> {
        let bits = if enable { mask } else { 0 };
        self.update_register(spi, register, mask, bits).await
    }

    /// Writes `bytes` to consecutive registers starting at `start`.
    pub(crate) async fn write_bytes(
        &mut self,
        spi: &mut HW::Spi,
        start: Register,
        bytes: &[u8],
    ) -> Result<(), Error<HW::Error>> {
        let mut address = start.address();
        for byte in bytes {
            self.command(spi, address).await?;
            self.data(spi, *byte).await?;
            address = address.wrapping_add(1);
        }
        Ok(())
    }

    pub(crate) async fn write_u16(
        &mut self,
        spi: &mut HW::Spi,
        start: Register,
        value: u16,
    ) -> Result<(), Error<HW::Error>> {
        self.write_bytes(spi, start, &value.to_le_bytes()).await
    }

    pub(crate) async fn write_u24(
        &mut self,
        spi: &mut HW::Spi,
        start: Register,
        value: u32,
    ) -> Result<(), Error<HW::Error>> {
        self.write_bytes(spi, start, &value.to_le_bytes()[..3]).await
    }

    pub(crate) async fn write_u32(
        &mut self,
        spi: &mut HW::Spi,
        start: Register,
        value: u32,
    ) -> Result<(), Error<HW::Error>> {
        self.write_bytes(spi, start, &value.to_le_bytes()).await
    }

    /// Reads the status register until `reached` holds.
    async fn wait_status(
        &mut self,
        spi: &mut HW::Spi,
        target: PollTarget,
        reached: impl Fn(Status) -> bool,
    ) -> Result<(), Error<HW::Error>> {
        for _ in 0..self.config.limits.poll_limit {
            if reached(self.status(spi).await?) {
                return Ok(());
            }
        }
        warn_log!("Timed out waiting for {:?}", target);
        Err(Error::Timeout(target))
    }

    /// Selects `register` once, then reads it until `reached` holds. Returns the final value.
    pub(crate) async fn poll_register(
        &mut self,
        spi: &mut HW::Spi,
        register: Register,
        target: PollTarget,
        reached: impl Fn(u8) -> bool,
    ) -> Result<u8, Error<HW::Error>> {
        self.command(spi, register.address()).await?;
        for _ in 0..self.config.limits.poll_limit {
            let value = self.read_data(spi).await?;
            if reached(value) {
                return Ok(value);
            }
        }
        warn_log!("Timed out waiting for {:?}", target);
        Err(Error::Timeout(target))
    }

    pub(crate) async fn wait_write_fifo(
        &mut self,
        spi: &mut HW::Spi,
    ) -> Result<(), Error<HW::Error>> {
        self.wait_status(spi, PollTarget::WriteFifoNotFull, |status| {
            !status.contains(Status::WRITE_FIFO_FULL)
        })
        .await
    }

    pub async fn wait_write_fifo_empty(
        &mut self,
        spi: &mut HW::Spi,
    ) -> Result<(), Error<HW::Error>> {
        self.wait_status(spi, PollTarget::WriteFifoEmpty, |status| {
            status.contains(Status::WRITE_FIFO_EMPTY)
        })
        .await
    }

    /// Waits for the drawing engine, BTE and text engine to finish.
    pub async fn wait_core_idle(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        self.wait_status(spi, PollTarget::CoreIdle, |status| {
            !status.contains(Status::CORE_BUSY)
        })
        .await
    }

    async fn wait_sdram_ready(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        self.wait_status(spi, PollTarget::SdramReady, |status| {
            status.contains(Status::SDRAM_READY)
        })
        .await
    }

    /// Selects the memory data port so that following data cycles stream into memory.
    pub(crate) async fn start_memory_write(
        &mut self,
        spi: &mut HW::Spi,
    ) -> Result<(), Error<HW::Error>> {
        self.command(spi, Register::MemoryDataPort.address()).await
    }

    /// Writes one byte to the memory data port and waits for room in the write FIFO.
    pub(crate) async fn write_memory_byte(
        &mut self,
        spi: &mut HW::Spi,
        value: u8,
    ) -> Result<(), Error<HW::Error>> {
        self.data(spi, value).await?;
        self.wait_write_fifo(spi).await
    }
}

impl<HW, STATE> Er5517<HW, STATE>
where
    HW: SpiHw + ResetHw + DelayHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error> + From<<HW::Reset as PinErrorType>::Error>,
{
    /// Pulses the reset line and waits for the controller to come back.
    pub async fn hardware_reset(&mut self) -> Result<(), Error<HW::Error>> {
        debug!("Resetting ER5517");
        self.hw.reset().set_low().map_err(Self::hw_error)?;
        self.hw.delay().delay_ms(RESET_PULSE_MS).await;
        self.hw.reset().set_high().map_err(Self::hw_error)?;
        self.hw.delay().delay_ms(RESET_SETTLE_MS).await;
        Ok(())
    }

    /// Waits for the controller to leave its power-on self check with the PLLs locked.
    ///
    /// While the inhibit bit is set the controller is still checking itself. After
    /// [config::Limits::reset_attempts] inhibited reads in a row it is reset again, unless that
    /// limit is 0.
    pub async fn system_check(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        let limits = self.config.limits;
        let mut inhibited: u8 = 0;
        for _ in 0..limits.max_check_rounds {
            let status = self.status(spi).await?;
            if status.contains(Status::INHIBIT) {
                inhibited = inhibited.saturating_add(1);
                if limits.reset_attempts != 0 && inhibited >= limits.reset_attempts {
                    debug!("Controller still inhibited, resetting");
                    inhibited = 0;
                    self.hardware_reset().await?;
                }
            } else {
                inhibited = 0;
                self.hw.delay().delay_ms(CHECK_INTERVAL_MS).await;
                let chip = self
                    .read_register(spi, Register::ChipConfiguration)
                    .await?;
                if chip & ccr::PLL_READY != 0 {
                    debug!("System check passed");
                    return Ok(());
                }
                self.write_register(spi, Register::ChipConfiguration, ccr::PLL_READY)
                    .await?;
            }
            self.hw.delay().delay_ms(CHECK_INTERVAL_MS).await;
        }
        warn_log!("ER5517 system check failed");
        Err(Error::NotReady {
            attempts: limits.max_check_rounds,
        })
    }

    /// Programs the scan, memory and core PLLs and makes the controller reload them.
    pub async fn init_pll(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        let pll = self.config.pll;
        let clocks = [
            (Register::ScanPllControl1, Register::ScanPllControl2, pll.scan),
            (Register::MemoryPllControl1, Register::MemoryPllControl2, pll.memory),
            (Register::CorePllControl1, Register::CorePllControl2, pll.core),
        ];
        for (control, multiplier, clock) in clocks {
            self.write_register(spi, control, clock.control()).await?;
            self.write_register(spi, multiplier, clock.multiplier_low())
                .await?;
        }

        self.command(spi, Register::SoftwareReset.address()).await?;
        self.hw.delay().delay_us(1).await;
        self.data(spi, RECONFIGURE_PLL).await?;
        self.hw.delay().delay_ms(1).await;
        Ok(())
    }

    pub async fn init_sdram(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        let sdram = self.config.sdram;
        self.write_register(spi, Register::SdramAttributes, sdram.attributes)
            .await?;
        self.write_register(spi, Register::SdramMode, sdram.mode)
            .await?;
        self.write_u16(spi, Register::SdramRefreshInterval, sdram.refresh_interval)
            .await?;
        self.write_register(spi, Register::SdramControl, SDRAM_INIT)
            .await?;
        self.wait_sdram_ready(spi).await?;
        self.hw.delay().delay_ms(1).await;
        Ok(())
    }

    /// Brings the controller up from reset: clocks, SDRAM, host and panel interfaces, then a
    /// full-panel main window and canvas on layer 0. The display is switched on at the end.
    pub async fn init(
        mut self,
        spi: &mut HW::Spi,
    ) -> Result<Er5517<HW, StateReady>, Error<HW::Error>> {
        debug!("Initialising ER5517");
        self.hardware_reset().await?;
        self.system_check(spi).await?;
        self.init_pll(spi).await?;
        self.init_sdram(spi).await?;

        self.update_register(
            spi,
            Register::ChipConfiguration,
            ccr::TFT_WIDTH | ccr::HOST_BUS_16BIT,
            ccr::TFT_18BIT | ccr::HOST_BUS_16BIT,
        )
        .await?;
        self.update_register(
            spi,
            Register::MemoryAccessControl,
            macr::HOST_FORMAT | macr::READ_DIRECTION | macr::WRITE_DIRECTION,
            macr::HOST_RGB565,
        )
        .await?;
        self.update_register(
            spi,
            Register::InputControl,
            icr::TEXT_MODE | icr::MEMORY_SELECT,
            0,
        )
        .await?;

        let signals = self.config.signals;
        self.update_register(
            spi,
            Register::DisplayConfiguration,
            dpcr::PCLK_FALLING
                | dpcr::HSCAN_RIGHT_TO_LEFT
                | dpcr::VSCAN_BOTTOM_TO_TOP
                | dpcr::PIXEL_ORDER,
            signals.display_configuration(),
        )
        .await?;
        self.update_register(
            spi,
            Register::PanelSignals,
            pcsr::HSYNC_HIGH | pcsr::VSYNC_HIGH | pcsr::DE_LOW,
            signals.polarities(),
        )
        .await?;
        self.write_panel_timing(spi).await?;

        self.update_register(
            spi,
            Register::MainWindowControl,
            mpwctr::MAIN_DEPTH,
            mpwctr::MAIN_16BPP,
        )
        .await?;
        self.update_register(
            spi,
            Register::CanvasAddressing,
            aw_color::LINEAR | aw_color::CANVAS_DEPTH,
            aw_color::CANVAS_16BPP,
        )
        .await?;

        let mut ready = self.into_state(StateReady());
        ready.use_full_panel(spi).await?;
        ready.display_on(spi).await?;
        info!("ER5517 ready");
        Ok(ready)
    }

    async fn write_panel_timing(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        let panel = self.config.panel;
        let (width, width_fine) = encode_horizontal(panel.width).ok_or(Error::OutOfRange)?;
        let (back_porch, back_porch_fine) =
            encode_horizontal(panel.h_back_porch).ok_or(Error::OutOfRange)?;
        let (front_porch, _) = encode_horizontal(panel.h_front_porch).ok_or(Error::OutOfRange)?;
        let (hsync, _) = encode_horizontal(panel.h_sync_width).ok_or(Error::OutOfRange)?;
        let height = encode_vertical(panel.height).ok_or(Error::OutOfRange)?;
        let v_back_porch = encode_vertical(panel.v_back_porch).ok_or(Error::OutOfRange)?;
        let v_front_porch = encode_vertical(panel.v_front_porch)
            .and_then(|v| u8::try_from(v).ok())
            .ok_or(Error::OutOfRange)?;
        let vsync = encode_vertical(panel.v_sync_width)
            .and_then(|v| u8::try_from(v).ok())
            .ok_or(Error::OutOfRange)?;

        self.write_register(spi, Register::HorizontalWidth, width)
            .await?;
        self.write_register(spi, Register::HorizontalWidthFine, width_fine)
            .await?;
        self.write_u16(spi, Register::VerticalHeight, height).await?;
        self.write_register(spi, Register::HorizontalNonDisplay, back_porch)
            .await?;
        self.write_register(spi, Register::HorizontalNonDisplayFine, back_porch_fine)
            .await?;
        self.write_register(spi, Register::HsyncStart, front_porch)
            .await?;
        self.write_register(spi, Register::HsyncWidth, hsync).await?;
        self.write_u16(spi, Register::VerticalNonDisplay, v_back_porch)
            .await?;
        self.write_register(spi, Register::VsyncStart, v_front_porch)
            .await?;
        self.write_register(spi, Register::VsyncWidth, vsync).await
    }
}

impl<HW> Er5517<HW, StateReady>
where
    HW: SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>,
{
    /// Starts scanning the main window out to the panel.
    pub async fn display_on(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        self.set_bits(spi, Register::DisplayConfiguration, dpcr::DISPLAY_ON, true)
            .await
    }

    /// Stops scan out. SDRAM contents are kept.
    pub async fn display_off(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        self.set_bits(spi, Register::DisplayConfiguration, dpcr::DISPLAY_ON, false)
            .await
    }
}

impl<HW, STATE> Reset<Error<HW::Error>> for Er5517<HW, STATE>
where
    HW: SpiHw + ResetHw + DelayHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error> + From<<HW::Reset as PinErrorType>::Error>,
{
    type DisplayOut = Er5517<HW, StateUninitialized>;

    async fn reset(mut self) -> Result<Self::DisplayOut, Error<HW::Error>> {
        self.hardware_reset().await?;
        Ok(self.into_state(StateUninitialized()))
    }
}


#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::digital::Transaction as PinTransaction;

    use super::{testing::*, *};
    use crate::test_support::{reset_pulse, run};

    #[test]
    fn test_register_write_uses_command_then_data_cycle() {
        let mut bus = Bus::default();
        bus.command(0x12).data(0x40);
        let mut spi = bus.spi();
        let mut er = ready();

        run(er.write_register(&mut spi, Register::DisplayConfiguration, 0x40));

        done(er, spi);
    }

    #[test]
    fn test_update_register_keeps_unmasked_bits() {
        let mut bus = Bus::default();
        bus.update(0x12, 0b1010_0101, 0b1010_0011);
        let mut spi = bus.spi();
        let mut er = ready();

        run(er.update_register(&mut spi, Register::DisplayConfiguration, 0b0000_0111, 0b11));

        done(er, spi);
    }

    #[test]
    fn test_multi_byte_writes_are_little_endian() {
        let mut bus = Bus::default();
        bus.write_bytes(0x20, &[0x78, 0x56, 0x34, 0x12])
            .write_bytes(0xD2, &[0x33, 0x22, 0x11])
            .write_bytes(0x24, &[0x68, 0x01]);
        let mut spi = bus.spi();
        let mut er = ready();

        run(er.write_u32(&mut spi, Register::MainImageStart, 0x1234_5678));
        run(er.write_u24(&mut spi, Register::ForegroundColor, 0x0011_2233));
        run(er.write_u16(&mut spi, Register::MainImageWidth, 360));

        done(er, spi);
    }

    #[test]
    fn test_status_wait_polls_until_reached() {
        let mut bus = Bus::default();
        bus.status(0x08).status(0x08).status(0x00);
        let mut spi = bus.spi();
        let mut er = ready();

        run(er.wait_core_idle(&mut spi));

        done(er, spi);
    }

    #[test]
    fn test_status_wait_times_out() {
        let mut bus = Bus::default();
        bus.status(0x80).status(0x80).status(0x80);
        let mut spi = bus.spi();
        let mut er = ready();

        let err = expect_error(er.wait_write_fifo(&mut spi));
        assert!(matches!(err, Error::Timeout(PollTarget::WriteFifoNotFull)));

        done(er, spi);
    }

    #[test]
    fn test_display_on_and_off_toggle_bit_six() {
        let mut bus = Bus::default();
        bus.update(0x12, 0x88, 0xC8).update(0x12, 0xC8, 0x88);
        let mut spi = bus.spi();
        let mut er = ready();

        run(er.display_on(&mut spi));
        run(er.display_off(&mut spi));

        done(er, spi);
    }

    fn uninitialized(reset: &[PinTransaction]) -> Er5517<TestHw, StateUninitialized> {
        Er5517::new(TestHw::new(reset), test_config())
    }

    #[test]
    fn test_system_check_sets_pll_ready_until_locked() {
        let mut bus = Bus::default();
        bus.status(0x00)
            .command(0x01)
            .read(0x00)
            .write(0x01, 0x80)
            .status(0x00)
            .command(0x01)
            .read(0x80);
        let mut spi = bus.spi();
        let mut er = uninitialized(&[]);

        run(er.system_check(&mut spi));

        spi.done();
        er.release().reset.done();
    }

    #[test]
    fn test_system_check_resets_while_inhibited() {
        let mut bus = Bus::default();
        bus.status(0x02)
            .status(0x02)
            .status(0x00)
            .command(0x01)
            .read(0x80);
        let mut spi = bus.spi();
        let mut er = uninitialized(&reset_pulse());

        run(er.system_check(&mut spi));

        spi.done();
        er.release().reset.done();
    }

    #[test]
    fn test_system_check_without_resets() {
        let mut bus = Bus::default();
        bus.status(0x02)
            .status(0x02)
            .status(0x02)
            .status(0x00)
            .command(0x01)
            .read(0x80);
        let mut spi = bus.spi();
        let mut config = test_config();
        config.limits.reset_attempts = 0;
        let mut er = Er5517::new(TestHw::new(&[]), config);

        run(er.system_check(&mut spi));

        spi.done();
        er.release().reset.done();
    }

    #[test]
    fn test_system_check_gives_up() {
        let mut bus = Bus::default();
        for _ in 0..4 {
            bus.status(0x00).command(0x01).read(0x00).write(0x01, 0x80);
        }
        let mut spi = bus.spi();
        let mut er = uninitialized(&[]);

        let err = expect_error(er.system_check(&mut spi));
        assert!(matches!(err, Error::NotReady { attempts: 4 }));

        spi.done();
        er.release().reset.done();
    }

    #[test]
    fn test_init_pll_writes_all_three_clocks() {
        let mut bus = Bus::default();
        bus.write(0x05, 0x8A)
            .write(0x06, 28)
            .write(0x07, 0x8A)
            .write(0x08, 100)
            .write(0x09, 0x8A)
            .write(0x0A, 100)
            .write(0x00, 0x80);
        let mut spi = bus.spi();
        let mut er = uninitialized(&[]);

        run(er.init_pll(&mut spi));

        spi.done();
        er.release().reset.done();
    }

    #[test]
    fn test_init_sdram_waits_for_ready() {
        let mut bus = Bus::default();
        bus.write(0xE0, 0x29)
            .write(0xE1, 0x03)
            .write_u16(0xE2, 486)
            .write(0xE4, 0x01)
            .status(0x00)
            .status(0x04);
        let mut spi = bus.spi();
        let mut er = uninitialized(&[]);

        run(er.init_sdram(&mut spi));

        spi.done();
        er.release().reset.done();
    }

    #[test]
    fn test_init_runs_full_bring_up() {
        let mut bus = Bus::default();
        // System check, PLLs, SDRAM.
        bus.status(0x00).command(0x01).read(0x80);
        bus.write(0x05, 0x8A)
            .write(0x06, 28)
            .write(0x07, 0x8A)
            .write(0x08, 100)
            .write(0x09, 0x8A)
            .write(0x0A, 100)
            .write(0x00, 0x80);
        bus.write(0xE0, 0x29)
            .write(0xE1, 0x03)
            .write_u16(0xE2, 486)
            .write(0xE4, 0x01)
            .status(0x04);
        // Host and panel interfaces.
        bus.update(0x01, 0x90, 0x89)
            .update(0x02, 0xFF, 0x49)
            .update(0x03, 0x07, 0x00)
            .update(0x12, 0x07, 0x88)
            .update(0x13, 0xFF, 0x1F);
        bus.write(0x14, 44)
            .write(0x15, 0)
            .write_u16(0x1A, 959)
            .write(0x16, 1)
            .write(0x17, 4)
            .write(0x18, 1)
            .write(0x19, 0)
            .write_u16(0x1C, 19)
            .write(0x1E, 19)
            .write(0x1F, 1);
        bus.update(0x10, 0x00, 0x04).update(0x5E, 0x07, 0x01);
        // Full panel windows on layer 0.
        bus.write_u32(0x20, 0)
            .write_u16(0x24, 360)
            .write_u16(0x26, 0)
            .write_u16(0x28, 0)
            .write_u32(0x50, 0)
            .write_u16(0x54, 360)
            .write_u16(0x56, 0)
            .write_u16(0x58, 0)
            .write_u16(0x5A, 360)
            .write_u16(0x5C, 960);
        bus.update(0x12, 0x88, 0xC8);
        let mut spi = bus.spi();
        let er = uninitialized(&reset_pulse());

        let er = run(er.init(&mut spi));

        done(er, spi);
    }

    #[test]
    fn test_reset_returns_to_uninitialized() {
        let er = Er5517 {
            hw: TestHw::new(&reset_pulse()),
            config: test_config(),
            _state: StateReady(),
        };

        let er: Er5517<TestHw, StateUninitialized> = run(er.reset());

        er.release().reset.done();
    }
}
