use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals;
use embassy_rp::spi::{self, Spi};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::Delay;
use tds8_displays::{
    gc9503::Gc9503Hw,
    hw::{DelayHw, ErrorHw, ResetHw, SpiHw},
};
use tds8_samples::Error;

// Define the resources needed to communicate with the display.
assign_resources::assign_resources! {
    spi_hw: SpiP {
        spi: SPI1,
        clk: PIN_10,
        tx: PIN_11,
        rx: PIN_12,
        dma_tx: DMA_CH3,
        dma_rx: DMA_CH4,
        cs: PIN_13,
    },
    controller_hw: ControllerP {
        reset: PIN_14,
    },
    bridge_hw: BridgeP {
        cs: PIN_16,
        clk: PIN_17,
        sdi: PIN_18,
    },
}

/// The ER5517's reset line. The host interface is the shared SPI bus.
pub struct ControllerHw<'a> {
    reset: Output<'a>,
    delay: Delay,
}

impl ControllerHw<'_> {
    pub fn new(p: ControllerP) -> Self {
        Self {
            reset: Output::new(p.reset, Level::High),
            delay: Delay,
        }
    }
}

type TftSpiDevice<'a> =
    SpiDevice<'a, NoopRawMutex, Spi<'a, peripherals::SPI1, spi::Async>, Output<'a>>;

impl ErrorHw for ControllerHw<'_> {
    type Error = Error;
}

impl<'a> SpiHw for ControllerHw<'a> {
    type Spi = TftSpiDevice<'a>;
}

impl<'a> ResetHw for ControllerHw<'a> {
    type Reset = Output<'a>;

    fn reset(&mut self) -> &mut Self::Reset {
        &mut self.reset
    }
}

impl DelayHw for ControllerHw<'_> {
    type Delay = Delay;

    fn delay(&mut self) -> &mut Self::Delay {
        &mut self.delay
    }
}

/// GPIOs wired to the GC9503's 3-wire SPI port.
pub struct BridgeHw<'a> {
    cs: Output<'a>,
    clk: Output<'a>,
    sdi: Output<'a>,
    delay: Delay,
}

impl BridgeHw<'_> {
    pub fn new(p: BridgeP) -> Self {
        Self {
            cs: Output::new(p.cs, Level::High),
            clk: Output::new(p.clk, Level::Low),
            sdi: Output::new(p.sdi, Level::Low),
            delay: Delay,
        }
    }
}

impl ErrorHw for BridgeHw<'_> {
    type Error = Error;
}

impl DelayHw for BridgeHw<'_> {
    type Delay = Delay;

    fn delay(&mut self) -> &mut Self::Delay {
        &mut self.delay
    }
}

impl<'a> Gc9503Hw for BridgeHw<'a> {
    type Cs = Output<'a>;
    type Clk = Output<'a>;
    type Sdi = Output<'a>;

    fn cs(&mut self) -> &mut Self::Cs {
        &mut self.cs
    }

    fn clk(&mut self) -> &mut Self::Clk {
        &mut self.clk
    }

    fn sdi(&mut self) -> &mut Self::Sdi {
        &mut self.sdi
    }
}
