use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals;
use embassy_rp::spi::{self, Spi};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::Delay;
use embedded_hal::digital::PinState;
use tds8_displays::{
    epd5in79b,
    hw::{BusyHw, DcHw, DelayHw, ErrorHw, PowerHw, ResetHw, SpiHw},
};
use tds8_samples::Error;

// Define the resources needed to communicate with the display.
assign_resources::assign_resources! {
    spi_hw: SpiP {
        spi: SPI0,
        clk: PIN_2,
        tx: PIN_3,
        dma_tx: DMA_CH1,
        cs: PIN_5,
    },
    epd_hw: DisplayP {
        reset: PIN_7,
        dc: PIN_6,
        busy: PIN_8,
        power: PIN_9,
    },
}

/// Defines the hardware to use for connecting to the display.
pub struct DisplayHw<'a> {
    dc: Output<'a>,
    reset: Output<'a>,
    busy: Input<'a>,
    power: Output<'a>,
    delay: Delay,
}

impl DisplayHw<'_> {
    pub fn new(p: DisplayP) -> Self {
        let dc = Output::new(p.dc, Level::Low);
        let reset = Output::new(p.reset, Level::High);
        let busy = Input::new(p.busy, Pull::Down);
        let power = Output::new(p.power, Level::Low);

        Self {
            dc,
            reset,
            busy,
            power,
            delay: Delay,
        }
    }
}

type EpdSpiDevice<'a> =
    SpiDevice<'a, NoopRawMutex, Spi<'a, peripherals::SPI0, spi::Async>, Output<'a>>;

impl ErrorHw for DisplayHw<'_> {
    type Error = Error;
}

impl<'a> SpiHw for DisplayHw<'a> {
    type Spi = EpdSpiDevice<'a>;
}

impl<'a> DcHw for DisplayHw<'a> {
    type Dc = Output<'a>;

    fn dc(&mut self) -> &mut Self::Dc {
        &mut self.dc
    }
}

impl<'a> ResetHw for DisplayHw<'a> {
    type Reset = Output<'a>;

    fn reset(&mut self) -> &mut Self::Reset {
        &mut self.reset
    }
}

impl<'a> BusyHw for DisplayHw<'a> {
    type Busy = Input<'a>;

    fn busy(&mut self) -> &mut Self::Busy {
        &mut self.busy
    }

    fn busy_when(&self) -> PinState {
        epd5in79b::DEFAULT_BUSY_WHEN
    }
}

impl<'a> PowerHw for DisplayHw<'a> {
    type Power = Output<'a>;

    fn power(&mut self) -> &mut Self::Power {
        &mut self.power
    }
}

impl DelayHw for DisplayHw<'_> {
    type Delay = Delay;

    fn delay(&mut self) -> &mut Self::Delay {
        &mut self.delay
    }
}
