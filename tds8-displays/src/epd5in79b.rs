//! Driver for the 5.79" black/white/red e-paper panel.
//!
//! The panel is 792x272 pixels in landscape orientation and uses an SSD16xx-family controller with
//! two RAM planes: one for black/white and one for red.

use embedded_graphics::{
    prelude::{Point, Size},
    primitives::Rectangle,
};
use embedded_hal::{
    digital::{ErrorType as PinErrorType, OutputPin, PinState},
    spi::{ErrorType as SpiErrorType, Phase, Polarity},
};
use embedded_hal_async::delay::DelayNs;

use crate::{
    buffer::{check_length, packed_length, BufferView, FrameSizeError},
    hw::{
        BusyHw, BusyWait as _, CommandDataSend as _, DcHw, DelayHw, ErrorHw, PowerHw, ResetHw,
        SpiHw,
    },
    log::{debug, debug_assert, info},
    DisplayPartial, DisplaySimple, Displayable, Reset, Sleep, Wake,
};

/// The width of the display (landscape orientation).
pub const DISPLAY_WIDTH: u16 = 792;
/// The height of the display (landscape orientation).
pub const DISPLAY_HEIGHT: u16 = 272;
/// The panel size as an embedded-graphics [Size].
pub const DISPLAY_SIZE: Size = Size::new(DISPLAY_WIDTH as u32, DISPLAY_HEIGHT as u32);
/// Bytes in one full-panel RAM plane.
pub const FRAME_LENGTH: usize = packed_length(DISPLAY_SIZE);

pub const RECOMMENDED_SPI_HZ: u32 = 4_000_000; // 4 MHz
/// Use this phase in conjunction with [RECOMMENDED_SPI_POLARITY] (SPI mode 0).
pub const RECOMMENDED_SPI_PHASE: Phase = Phase::CaptureOnFirstTransition;
/// Use this polarity in conjunction with [RECOMMENDED_SPI_PHASE] (SPI mode 0).
pub const RECOMMENDED_SPI_POLARITY: Polarity = Polarity::IdleLow;
/// The default pin state that indicates the display is busy.
pub const DEFAULT_BUSY_WHEN: PinState = PinState::High;

/// Time to let the supply settle after switching power on.
const POWER_SETTLE_MS: u32 = 100;
/// Length of each phase of the reset pulse.
const RESET_PULSE_MS: u32 = 100;
/// Time the controller needs after entering deep sleep before power can be cut.
const SLEEP_SETTLE_MS: u32 = 100;

/// X and Y increment, address counter moves along X first.
const DATA_ENTRY_X_THEN_Y: u8 = 0x03;
/// Display update sequence: clock and analog on, load temperature and waveform, display, power
/// down.
const UPDATE_SEQUENCE_FULL: u8 = 0xF7;
/// Deep sleep mode 1. RAM is retained, but a hardware reset is needed to leave it.
const DEEP_SLEEP_MODE_1: u8 = 0x01;
/// RAM value of a white pixel on the black/white plane, and "no red" on the red plane.
const BLANK: u8 = 0xFF;

/// Low-level commands for the panel. You probably want to use the methods on [Epd5In79B], but can
/// send commands directly with [Epd5In79B::send] for experimentation.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Enters deep sleep. Only a hardware reset wakes the controller.
    DeepSleepMode = 0x10,
    /// Sets how the address counter advances after each data byte.
    DataEntryModeSetting = 0x11,
    /// Restores all registers to their defaults (except deep sleep).
    SwReset = 0x12,
    /// Runs the sequence configured with [Command::DisplayUpdateControl2]. BUSY stays asserted
    /// until the refresh finishes.
    MasterActivation = 0x20,
    /// Selects the steps run by [Command::MasterActivation].
    DisplayUpdateControl2 = 0x22,
    /// Writes to the black/white RAM. 1 is white, 0 is black.
    WriteBlackWhiteRam = 0x24,
    /// Writes to the red RAM. 0 is red, 1 shows the black/white plane.
    WriteRedRam = 0x26,
    /// Sets the inclusive X range of the RAM window, in units of 8 pixels.
    SetRamXStartEnd = 0x44,
    /// Sets the inclusive Y range of the RAM window.
    SetRamYStartEnd = 0x45,
    /// Sets the X address counter, in units of 8 pixels.
    SetRamX = 0x4E,
    /// Sets the Y address counter.
    SetRamY = 0x4F,
}

impl Command {
    fn register(&self) -> u8 {
        *self as u8
    }
}

/// Controls the 5.79" black/white/red e-paper panel.
///
/// The driver starts in [StateUninitialized] and must be moved to [StateReady] with
/// [Epd5In79B::init] before framebuffers can be written. [Sleep] moves it to [StateAsleep], which
/// can only be left through [Wake] or [Reset].
pub struct Epd5In79B<HW, STATE> {
    hw: HW,
    _state: STATE,
}

trait StateInternal {}
#[allow(private_bounds)]
pub trait State: StateInternal {}
pub trait StateAwake: State {}

macro_rules! impl_base_state {
    ($state:ident) => {
        impl StateInternal for $state {}
        impl State for $state {}
    };
}

/// Powered, but the controller's registers are in an unknown state.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateUninitialized();
impl_base_state!(StateUninitialized);
impl StateAwake for StateUninitialized {}

/// Initialised and ready to accept framebuffers.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateReady();
impl_base_state!(StateReady);
impl StateAwake for StateReady {}

/// In deep sleep. RAM contents are kept, registers are not.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateAsleep();
impl_base_state!(StateAsleep);

impl<HW> Epd5In79B<HW, StateUninitialized> {
    pub fn new(hw: HW) -> Self {
        Epd5In79B {
            hw,
            _state: StateUninitialized(),
        }
    }
}

impl<HW, STATE> Epd5In79B<HW, STATE>
where
    HW: PowerHw + ErrorHw,
    HW::Error: From<<HW::Power as PinErrorType>::Error>,
    STATE: State,
{
    /// Switches the panel supply on. [Epd5In79B::init] does this too.
    pub async fn power_on(&mut self) -> Result<(), HW::Error> {
        self.hw.power().set_high()?;
        Ok(())
    }

    /// Switches the panel supply off. Put the panel to [Sleep] first.
    pub async fn power_off(&mut self) -> Result<(), HW::Error> {
        self.hw.power().set_low()?;
        Ok(())
    }

    /// Releases the hardware.
    pub fn release(self) -> HW {
        self.hw
    }
}

impl<HW, STATE> Epd5In79B<HW, STATE>
where
    HW: BusyHw + DcHw + ResetHw + PowerHw + DelayHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Reset as PinErrorType>::Error>
        + From<<HW::Power as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>,
    STATE: StateAwake,
{
    /// Powers up, resets and configures the panel for full-screen writes.
    pub async fn init(
        mut self,
        spi: &mut HW::Spi,
    ) -> Result<Epd5In79B<HW, StateReady>, HW::Error> {
        info!("Initialising 5.79\" EPD");
        self.hw.power().set_high()?;
        self.hw.delay().delay_ms(POWER_SETTLE_MS).await;

        reset_impl(&mut self.hw).await?;
        configure(&mut self.hw, spi).await?;

        Ok(Epd5In79B {
            hw: self.hw,
            _state: StateReady(),
        })
    }
}

impl<HW, STATE> Epd5In79B<HW, STATE>
where
    HW: BusyHw + DcHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>,
    STATE: StateAwake,
{
    /// Send the following command and data to the display. Waits until the display is no longer
    /// busy before sending.
    pub async fn send(
        &mut self,
        spi: &mut HW::Spi,
        command: Command,
        data: &[u8],
    ) -> Result<(), HW::Error> {
        self.hw.send(spi, command.register(), data).await
    }
}

impl<HW> Epd5In79B<HW, StateReady>
where
    HW: BusyHw + DcHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>
        + From<FrameSizeError>,
{
    /// Sets the RAM window that the next image data is written to.
    ///
    /// The x-axis only supports multiples of 8. Misaligned values panic in debug builds and shift
    /// the content otherwise. An empty rectangle leaves the window unchanged.
    pub async fn set_window(
        &mut self,
        spi: &mut HW::Spi,
        shape: Rectangle,
    ) -> Result<(), HW::Error> {
        if shape.size.width == 0 || shape.size.height == 0 {
            return Ok(());
        }
        let x_start = shape.top_left.x;
        let x_end = x_start + shape.size.width as i32 - 1;
        debug_assert!(
            x_start % 8 == 0 && x_end % 8 == 7,
            "window's top_left.x and width must be 8-bit aligned"
        );
        debug_assert!(fits_panel(&shape), "window must lie inside the panel");
        let x_bytes = [(x_start >> 3) as u8, (x_end >> 3) as u8];
        self.send(spi, Command::SetRamXStartEnd, &x_bytes).await?;

        let [y_start_low, y_start_high] = (shape.top_left.y as u16).to_le_bytes();
        let y_end = shape.top_left.y + shape.size.height as i32 - 1;
        let [y_end_low, y_end_high] = (y_end as u16).to_le_bytes();
        self.send(
            spi,
            Command::SetRamYStartEnd,
            &[y_start_low, y_start_high, y_end_low, y_end_high],
        )
        .await
    }

    /// Moves the RAM address counter, then waits for the controller to settle.
    ///
    /// The x-axis only supports multiples of 8.
    pub async fn set_cursor(
        &mut self,
        spi: &mut HW::Spi,
        position: Point,
    ) -> Result<(), HW::Error> {
        debug_assert!(position.x % 8 == 0, "position.x must be 8-bit aligned");
        debug_assert!(
            fits_panel(&Rectangle::new(position, Size::new(1, 1))),
            "position must lie inside the panel"
        );
        self.send(spi, Command::SetRamX, &[(position.x >> 3) as u8])
            .await?;
        self.send(spi, Command::SetRamY, &(position.y as u16).to_le_bytes())
            .await?;
        self.hw.wait_if_busy().await
    }

    /// Blanks both RAM planes and refreshes, leaving a white panel.
    pub async fn clear(&mut self, spi: &mut HW::Spi) -> Result<(), HW::Error> {
        debug!("Clearing EPD");
        self.select_full_window(spi).await?;
        self.hw
            .send_repeated(
                spi,
                Command::WriteBlackWhiteRam.register(),
                BLANK,
                FRAME_LENGTH,
            )
            .await?;
        self.hw
            .send_repeated(spi, Command::WriteRedRam.register(), BLANK, FRAME_LENGTH)
            .await?;
        self.update_display(spi).await
    }

    /// Writes full-panel black/white and red planes, then refreshes.
    ///
    /// A missing plane is written blank (white, or no red). Each given plane must be
    /// [FRAME_LENGTH] bytes long.
    pub async fn display_frame(
        &mut self,
        spi: &mut HW::Spi,
        black_white: Option<&[u8]>,
        red: Option<&[u8]>,
    ) -> Result<(), HW::Error> {
        for plane in [black_white, red].into_iter().flatten() {
            check_length(DISPLAY_SIZE, plane)?;
        }
        self.select_full_window(spi).await?;
        self.write_plane(spi, Command::WriteBlackWhiteRam, black_white)
            .await?;
        self.write_plane(spi, Command::WriteRedRam, red).await?;
        self.update_display(spi).await
    }

    /// Writes the same plane into both RAMs, then refreshes.
    ///
    /// Use this to lay down the base image before a run of partial updates through
    /// [DisplaySimple::display_framebuffer].
    pub async fn display_base_framebuffer(
        &mut self,
        spi: &mut HW::Spi,
        buf: &dyn BufferView<1, 1>,
    ) -> Result<(), HW::Error> {
        DisplaySimple::<1, 1, _, _>::write_framebuffer(self, spi, buf).await?;
        self.write_base_framebuffer(spi, buf).await?;
        self.update_display(spi).await
    }

    async fn select_full_window(&mut self, spi: &mut HW::Spi) -> Result<(), HW::Error> {
        self.set_window(spi, Rectangle::new(Point::zero(), DISPLAY_SIZE))
            .await?;
        self.set_cursor(spi, Point::zero()).await
    }

    async fn select_window_of(
        &mut self,
        spi: &mut HW::Spi,
        window: Rectangle,
    ) -> Result<(), HW::Error> {
        self.set_window(spi, window).await?;
        self.set_cursor(spi, window.top_left).await
    }

    async fn write_plane(
        &mut self,
        spi: &mut HW::Spi,
        command: Command,
        plane: Option<&[u8]>,
    ) -> Result<(), HW::Error> {
        match plane {
            Some(data) => self.send(spi, command, data).await,
            None => {
                self.hw
                    .send_repeated(spi, command.register(), BLANK, FRAME_LENGTH)
                    .await
            }
        }
    }
}

/// Pulses the reset line low.
async fn reset_impl<HW>(hw: &mut HW) -> Result<(), HW::Error>
where
    HW: ResetHw + DelayHw + ErrorHw,
    HW::Error: From<<HW::Reset as PinErrorType>::Error>,
{
    debug!("Resetting EPD");
    hw.reset().set_low()?;
    hw.delay().delay_ms(RESET_PULSE_MS).await;
    hw.reset().set_high()?;
    hw.delay().delay_ms(RESET_PULSE_MS).await;
    Ok(())
}

/// Software reset followed by a full-panel RAM window. Leaves the address counter at the origin.
async fn configure<HW>(hw: &mut HW, spi: &mut HW::Spi) -> Result<(), HW::Error>
where
    HW: BusyHw + DcHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>,
{
    hw.send(spi, Command::SwReset.register(), &[]).await?;
    hw.wait_if_busy().await?;

    hw.send(spi, Command::DataEntryModeSetting.register(), &[DATA_ENTRY_X_THEN_Y])
        .await?;

    let x_end = ((DISPLAY_WIDTH - 1) / 8) as u8;
    hw.send(spi, Command::SetRamXStartEnd.register(), &[0x00, x_end])
        .await?;
    let [y_end_low, y_end_high] = (DISPLAY_HEIGHT - 1).to_le_bytes();
    hw.send(
        spi,
        Command::SetRamYStartEnd.register(),
        &[0x00, 0x00, y_end_low, y_end_high],
    )
    .await?;

    hw.send(spi, Command::SetRamX.register(), &[0x00]).await?;
    hw.send(spi, Command::SetRamY.register(), &[0x00, 0x00])
        .await?;
    hw.wait_if_busy().await
}

impl<HW, STATE: State> Reset<HW::Error> for Epd5In79B<HW, STATE>
where
    HW: ResetHw + DelayHw + ErrorHw,
    HW::Error: From<<HW::Reset as PinErrorType>::Error>,
{
    /// A reset restores register defaults, so the panel has to be initialised again.
    type DisplayOut = Epd5In79B<HW, StateUninitialized>;

    async fn reset(mut self) -> Result<Self::DisplayOut, HW::Error> {
        reset_impl(&mut self.hw).await?;
        Ok(Epd5In79B {
            hw: self.hw,
            _state: StateUninitialized(),
        })
    }
}

impl<HW, STATE: StateAwake> Sleep<HW::Spi, HW::Error> for Epd5In79B<HW, STATE>
where
    HW: BusyHw + DcHw + DelayHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>,
{
    type DisplayOut = Epd5In79B<HW, StateAsleep>;

    async fn sleep(mut self, spi: &mut HW::Spi) -> Result<Self::DisplayOut, HW::Error> {
        debug!("Sleeping EPD");
        self.send(spi, Command::DeepSleepMode, &[DEEP_SLEEP_MODE_1])
            .await?;
        self.hw.delay().delay_ms(SLEEP_SETTLE_MS).await;
        Ok(Epd5In79B {
            hw: self.hw,
            _state: StateAsleep(),
        })
    }
}

impl<HW> Wake<HW::Spi, HW::Error> for Epd5In79B<HW, StateAsleep>
where
    HW: BusyHw + DcHw + ResetHw + DelayHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Reset as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>,
{
    type DisplayOut = Epd5In79B<HW, StateReady>;

    async fn wake(mut self, spi: &mut HW::Spi) -> Result<Self::DisplayOut, HW::Error> {
        debug!("Waking EPD");
        reset_impl(&mut self.hw).await?;
        configure(&mut self.hw, spi).await?;
        Ok(Epd5In79B {
            hw: self.hw,
            _state: StateReady(),
        })
    }
}

impl<HW> Displayable<HW::Spi, HW::Error> for Epd5In79B<HW, StateReady>
where
    HW: BusyHw + DcHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>
        + From<FrameSizeError>,
{
    async fn update_display(&mut self, spi: &mut HW::Spi) -> Result<(), HW::Error> {
        debug!("Updating display");
        self.send(spi, Command::DisplayUpdateControl2, &[UPDATE_SEQUENCE_FULL])
            .await?;
        self.send(spi, Command::MasterActivation, &[]).await?;
        self.hw.wait_if_busy().await
    }
}

impl<HW> DisplaySimple<1, 1, HW::Spi, HW::Error> for Epd5In79B<HW, StateReady>
where
    HW: BusyHw + DcHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>
        + From<FrameSizeError>,
{
    async fn display_framebuffer(
        &mut self,
        spi: &mut HW::Spi,
        buf: &dyn BufferView<1, 1>,
    ) -> Result<(), HW::Error> {
        self.write_framebuffer(spi, buf).await?;
        self.update_display(spi).await
    }

    async fn write_framebuffer(
        &mut self,
        spi: &mut HW::Spi,
        buf: &dyn BufferView<1, 1>,
    ) -> Result<(), HW::Error> {
        let [black_white] = buf.data();
        self.select_window_of(spi, buf.window()).await?;
        self.send(spi, Command::WriteBlackWhiteRam, black_white)
            .await
    }
}

impl<HW> DisplaySimple<1, 2, HW::Spi, HW::Error> for Epd5In79B<HW, StateReady>
where
    HW: BusyHw + DcHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>
        + From<FrameSizeError>,
{
    async fn display_framebuffer(
        &mut self,
        spi: &mut HW::Spi,
        buf: &dyn BufferView<1, 2>,
    ) -> Result<(), HW::Error> {
        self.write_framebuffer(spi, buf).await?;
        self.update_display(spi).await
    }

    async fn write_framebuffer(
        &mut self,
        spi: &mut HW::Spi,
        buf: &dyn BufferView<1, 2>,
    ) -> Result<(), HW::Error> {
        let [black_white, red] = buf.data();
        self.select_window_of(spi, buf.window()).await?;
        self.send(spi, Command::WriteBlackWhiteRam, black_white)
            .await?;
        self.send(spi, Command::WriteRedRam, red).await
    }
}

impl<HW> DisplayPartial<1, 1, HW::Spi, HW::Error> for Epd5In79B<HW, StateReady>
where
    HW: BusyHw + DcHw + SpiHw + ErrorHw,
    HW::Error: From<<HW::Busy as PinErrorType>::Error>
        + From<<HW::Dc as PinErrorType>::Error>
        + From<<HW::Spi as SpiErrorType>::Error>
        + From<FrameSizeError>,
{
    async fn write_base_framebuffer(
        &mut self,
        spi: &mut HW::Spi,
        buf: &dyn BufferView<1, 1>,
    ) -> Result<(), HW::Error> {
        let [plane] = buf.data();
        self.select_window_of(spi, buf.window()).await?;
        self.send(spi, Command::WriteRedRam, plane).await
    }
}

/// Whether `shape` is non-negative and ends inside the panel. Larger values would be truncated
/// when written to the 8 and 16 bit address registers.
fn fits_panel(shape: &Rectangle) -> bool {
    let bottom_right = shape.top_left + shape.size;
    shape.top_left.x >= 0
        && shape.top_left.y >= 0
        && bottom_right.x <= DISPLAY_WIDTH as i32
        && bottom_right.y <= DISPLAY_HEIGHT as i32
}

#[cfg(test)]
mod tests {
    use std::{vec, vec::Vec};

    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        digital::{Mock as PinMock, State as PinLevel, Transaction as PinTransaction},
        spi::{Mock as SpiMock, Transaction as SpiTransaction},
    };

    use super::*;
    use crate::{
        buffer::Frame,
        test_support::{reset_pulse, run, spi_write, TestError},
    };

    struct TestHw {
        dc: PinMock,
        reset: PinMock,
        busy: PinMock,
        power: PinMock,
        delay: NoopDelay,
    }

    impl ErrorHw for TestHw {
        type Error = TestError;
    }

    impl SpiHw for TestHw {
        type Spi = SpiMock<u8>;
    }

    impl DcHw for TestHw {
        type Dc = PinMock;

        fn dc(&mut self) -> &mut Self::Dc {
            &mut self.dc
        }
    }

    impl ResetHw for TestHw {
        type Reset = PinMock;

        fn reset(&mut self) -> &mut Self::Reset {
            &mut self.reset
        }
    }

    impl BusyHw for TestHw {
        type Busy = PinMock;

        fn busy(&mut self) -> &mut Self::Busy {
            &mut self.busy
        }

        fn busy_when(&self) -> PinState {
            DEFAULT_BUSY_WHEN
        }
    }

    impl PowerHw for TestHw {
        type Power = PinMock;

        fn power(&mut self) -> &mut Self::Power {
            &mut self.power
        }
    }

    impl DelayHw for TestHw {
        type Delay = NoopDelay;

        fn delay(&mut self) -> &mut Self::Delay {
            &mut self.delay
        }
    }

    /// Expected bus traffic, built up in the order the driver produces it.
    #[derive(Default)]
    struct Script {
        spi: Vec<SpiTransaction<u8>>,
        dc: Vec<PinTransaction>,
        busy: Vec<PinTransaction>,
        reset: Vec<PinTransaction>,
        power: Vec<PinTransaction>,
    }

    impl Script {
        fn idle_check(&mut self) -> &mut Self {
            self.busy.push(PinTransaction::get(PinLevel::Low));
            self
        }

        fn busy_until_done(&mut self) -> &mut Self {
            self.busy.push(PinTransaction::get(PinLevel::High));
            self.busy.push(PinTransaction::wait_for_state(PinLevel::Low));
            self
        }

        fn command(&mut self, command: u8, data: &[u8]) -> &mut Self {
            self.idle_check();
            self.dc.push(PinTransaction::set(PinLevel::Low));
            self.spi.extend(spi_write(&[command]));
            if !data.is_empty() {
                self.dc.push(PinTransaction::set(PinLevel::High));
                self.spi.extend(spi_write(data));
            }
            self
        }

        fn repeated(&mut self, command: u8, value: u8, count: usize) -> &mut Self {
            self.idle_check();
            self.dc.push(PinTransaction::set(PinLevel::Low));
            self.spi.extend(spi_write(&[command]));
            self.dc.push(PinTransaction::set(PinLevel::High));
            let mut remaining = count;
            while remaining > 0 {
                let len = remaining.min(64);
                self.spi.extend(spi_write(&vec![value; len]));
                remaining -= len;
            }
            self
        }

        fn full_window(&mut self) -> &mut Self {
            self.command(0x44, &[0x00, 0x62])
                .command(0x45, &[0x00, 0x00, 0x0F, 0x01])
                .command(0x4E, &[0x00])
                .command(0x4F, &[0x00, 0x00])
                .idle_check()
        }

        fn configure(&mut self) -> &mut Self {
            self.command(0x12, &[])
                .idle_check()
                .command(0x11, &[0x03])
                .command(0x44, &[0x00, 0x62])
                .command(0x45, &[0x00, 0x00, 0x0F, 0x01])
                .command(0x4E, &[0x00])
                .command(0x4F, &[0x00, 0x00])
                .idle_check()
        }

        fn update(&mut self) -> &mut Self {
            self.command(0x22, &[0xF7])
                .command(0x20, &[])
                .busy_until_done()
        }

        fn hw_reset(&mut self) -> &mut Self {
            self.reset.extend(reset_pulse());
            self
        }

        fn power_on(&mut self) -> &mut Self {
            self.power.push(PinTransaction::set(PinLevel::High));
            self
        }

        fn start(&self) -> Harness {
            Harness {
                spi: SpiMock::new(&self.spi),
                dc: PinMock::new(&self.dc),
                reset: PinMock::new(&self.reset),
                busy: PinMock::new(&self.busy),
                power: PinMock::new(&self.power),
            }
        }
    }

    struct Harness {
        spi: SpiMock<u8>,
        dc: PinMock,
        reset: PinMock,
        busy: PinMock,
        power: PinMock,
    }

    impl Harness {
        fn hw(&self) -> TestHw {
            TestHw {
                dc: self.dc.clone(),
                reset: self.reset.clone(),
                busy: self.busy.clone(),
                power: self.power.clone(),
                delay: NoopDelay,
            }
        }

        fn ready(&self) -> Epd5In79B<TestHw, StateReady> {
            Epd5In79B {
                hw: self.hw(),
                _state: StateReady(),
            }
        }

        fn done(mut self) {
            self.spi.done();
            self.dc.done();
            self.reset.done();
            self.busy.done();
            self.power.done();
        }
    }

    #[test]
    fn test_frame_length_matches_panel() {
        assert_eq!(FRAME_LENGTH, 99 * 272);
    }

    #[test]
    fn test_init_powers_resets_and_configures() {
        let mut script = Script::default();
        script.power_on().hw_reset().configure();
        let mut harness = script.start();

        let epd = Epd5In79B::new(harness.hw());
        run(epd.init(&mut harness.spi));

        harness.done();
    }

    #[test]
    fn test_display_frame_blanks_missing_red_plane() {
        let black_white = vec![0x0F; FRAME_LENGTH];
        let mut script = Script::default();
        script
            .full_window()
            .command(0x24, &black_white)
            .repeated(0x26, 0xFF, FRAME_LENGTH)
            .update();
        let mut harness = script.start();

        let mut epd = harness.ready();
        run(epd.display_frame(&mut harness.spi, Some(&black_white), None));

        harness.done();
    }

    #[test]
    fn test_display_frame_rejects_short_plane() {
        let mut harness = Script::default().start();
        let red = [0x00; 10];

        let mut epd = harness.ready();
        let result =
            embassy_futures::block_on(epd.display_frame(&mut harness.spi, None, Some(&red)));
        match result {
            Ok(()) => panic!("short plane must be rejected"),
            Err(TestError(message)) => assert!(message.contains("actual: 10"), "{message}"),
        }

        harness.done();
    }

    #[test]
    fn test_clear_blanks_both_planes() {
        let mut script = Script::default();
        script
            .full_window()
            .repeated(0x24, 0xFF, FRAME_LENGTH)
            .repeated(0x26, 0xFF, FRAME_LENGTH)
            .update();
        let mut harness = script.start();

        let mut epd = harness.ready();
        run(epd.clear(&mut harness.spi));

        harness.done();
    }

    #[test]
    fn test_write_framebuffer_targets_frame_window() {
        let data = [0xA5; 8];
        let window = Rectangle::new(Point::new(16, 8), Size::new(16, 4));
        let frame = Frame::new(window, &data).unwrap();

        let mut script = Script::default();
        script
            .command(0x44, &[2, 3])
            .command(0x45, &[8, 0, 11, 0])
            .command(0x4E, &[2])
            .command(0x4F, &[8, 0])
            .idle_check()
            .command(0x24, &data);
        let mut harness = script.start();

        let mut epd = harness.ready();
        run(DisplaySimple::<1, 1, _, _>::write_framebuffer(
            &mut epd,
            &mut harness.spi,
            &frame,
        ));

        harness.done();
    }

    #[test]
    fn test_tri_color_framebuffer_writes_both_planes() {
        let black_white = [0x00; 2];
        let red = [0xF0; 2];
        let frame =
            crate::buffer::TriColorFrame::full(Size::new(8, 2), &black_white, &red).unwrap();

        let mut script = Script::default();
        script
            .command(0x44, &[0, 0])
            .command(0x45, &[0, 0, 1, 0])
            .command(0x4E, &[0])
            .command(0x4F, &[0, 0])
            .idle_check()
            .command(0x24, &black_white)
            .command(0x26, &red)
            .update();
        let mut harness = script.start();

        let mut epd = harness.ready();
        run(DisplaySimple::<1, 2, _, _>::display_framebuffer(
            &mut epd,
            &mut harness.spi,
            &frame,
        ));

        harness.done();
    }

    #[test]
    fn test_base_framebuffer_goes_to_both_rams() {
        let data = [0x3C];
        let frame = Frame::full(Size::new(8, 1), &data).unwrap();

        let mut script = Script::default();
        for command in [0x24, 0x26] {
            script
                .command(0x44, &[0, 0])
                .command(0x45, &[0, 0, 0, 0])
                .command(0x4E, &[0])
                .command(0x4F, &[0, 0])
                .idle_check()
                .command(command, &data);
        }
        script.update();
        let mut harness = script.start();

        let mut epd = harness.ready();
        run(epd.display_base_framebuffer(&mut harness.spi, &frame));

        harness.done();
    }

    #[test]
    fn test_window_bounds() {
        assert!(fits_panel(&Rectangle::new(Point::zero(), DISPLAY_SIZE)));
        assert!(fits_panel(&Rectangle::new(Point::new(784, 271), Size::new(8, 1))));
        assert!(!fits_panel(&Rectangle::new(Point::new(-8, 0), Size::new(8, 1))));
        assert!(!fits_panel(&Rectangle::new(Point::new(0, -1), Size::new(8, 1))));
        assert!(!fits_panel(&Rectangle::new(Point::new(792, 0), Size::new(8, 1))));
        assert!(!fits_panel(&Rectangle::new(Point::new(0, 200), Size::new(8, 73))));
    }

    #[test]
    fn test_empty_window_is_ignored() {
        let mut harness = Script::default().start();

        let mut epd = harness.ready();
        run(epd.set_window(&mut harness.spi, Rectangle::new(Point::zero(), Size::zero())));

        harness.done();
    }

    #[test]
    fn test_sleep_then_wake_reconfigures() {
        let mut script = Script::default();
        script.command(0x10, &[0x01]).hw_reset().configure();
        let mut harness = script.start();

        let epd = harness.ready();
        let epd = run(epd.sleep(&mut harness.spi));
        let _epd: Epd5In79B<TestHw, StateReady> = run(epd.wake(&mut harness.spi));

        harness.done();
    }

    #[test]
    fn test_reset_requires_init_again() {
        let mut script = Script::default();
        script.hw_reset();
        let harness = script.start();

        let epd = harness.ready();
        let _epd: Epd5In79B<TestHw, StateUninitialized> = run(epd.reset());

        harness.done();
    }

    #[test]
    fn test_power_off_drops_supply() {
        let mut script = Script::default();
        script.power.push(PinTransaction::set(PinLevel::Low));
        let harness = script.start();

        let mut epd = harness.ready();
        run(epd.power_off());

        harness.done();
    }

    #[test]
    fn test_busy_pin_is_released_before_sending() {
        let mut script = Script::default();
        script.busy_until_done();
        script.dc.push(PinTransaction::set(PinLevel::Low));
        script.spi.extend(spi_write(&[0x12]));
        let mut harness = script.start();

        let mut epd = Epd5In79B::new(harness.hw());
        run(epd.send(&mut harness.spi, Command::SwReset, &[]));

        harness.done();
    }
}
