//! Exercises the 5.79" black/white/red e-paper driver on the TDS-8 controller.

#![no_std]
#![no_main]

mod hw;

use defmt::{expect, info};
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::spi::{self, Spi};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Timer;
use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::Rectangle;
use hw::*;
use static_cell::StaticCell;
use tds8_displays::{
    buffer::{packed_length, Frame, TriColorFrame},
    epd5in79b::{self, Epd5In79B, DISPLAY_SIZE, FRAME_LENGTH},
    DisplaySimple, Reset, Sleep, Wake,
};
use {defmt_rtt as _, panic_probe as _};

/// Bytes per row of a full-panel plane.
const ROW_BYTES: usize = FRAME_LENGTH / DISPLAY_SIZE.height as usize;
const BADGE: Size = Size::new(128, 64);
const BADGE_LENGTH: usize = packed_length(BADGE);

static BLACK_WHITE: StaticCell<[u8; FRAME_LENGTH]> = StaticCell::new();
static RED: StaticCell<[u8; FRAME_LENGTH]> = StaticCell::new();

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let resources = split_resources!(p);
    let mut config = spi::Config::default();
    config.frequency = epd5in79b::RECOMMENDED_SPI_HZ;
    // embassy-rp uses the synchronous phase and polarity enums, so we have to map these.
    config.phase = match epd5in79b::RECOMMENDED_SPI_PHASE {
        embedded_hal_async::spi::Phase::CaptureOnFirstTransition => {
            spi::Phase::CaptureOnFirstTransition
        }
        embedded_hal_async::spi::Phase::CaptureOnSecondTransition => {
            spi::Phase::CaptureOnSecondTransition
        }
    };
    config.polarity = match epd5in79b::RECOMMENDED_SPI_POLARITY {
        embedded_hal_async::spi::Polarity::IdleHigh => spi::Polarity::IdleHigh,
        embedded_hal_async::spi::Polarity::IdleLow => spi::Polarity::IdleLow,
    };

    let raw_spi: Mutex<NoopRawMutex, _> = Mutex::new(Spi::new_txonly(
        resources.spi_hw.spi,
        resources.spi_hw.clk,
        resources.spi_hw.tx,
        resources.spi_hw.dma_tx,
        config,
    ));

    // CS is active low.
    let cs_pin = Output::new(resources.spi_hw.cs, Level::High);
    let mut spi = SpiDevice::new(&raw_spi, cs_pin);
    let epd = Epd5In79B::new(DisplayHw::new(resources.epd_hw));

    info!("Initializing EPD");
    let mut epd = expect!(epd.init(&mut spi).await, "Failed to initialize EPD");

    info!("Clearing");
    expect!(epd.clear(&mut spi).await, "Failed to clear EPD");
    Timer::after_secs(2).await;

    // Black top half, red band across the bottom quarter.
    let black_white = BLACK_WHITE.init([0xFF; FRAME_LENGTH]);
    let red = RED.init([0xFF; FRAME_LENGTH]);
    let half = FRAME_LENGTH / 2;
    black_white[..half].fill(0x00);
    red[FRAME_LENGTH - FRAME_LENGTH / 4..].fill(0x00);
    // Vertical stripes down the middle of the black half.
    for row in black_white[..half].chunks_mut(ROW_BYTES) {
        for byte in row[ROW_BYTES / 3..2 * ROW_BYTES / 3].iter_mut().step_by(2) {
            *byte = 0xFF;
        }
    }

    info!("Displaying tri-colour frame");
    let frame = expect!(
        TriColorFrame::full(DISPLAY_SIZE, black_white, red),
        "Frame doesn't match the panel"
    );
    expect!(
        DisplaySimple::<1, 2, _, _>::display_framebuffer(&mut epd, &mut spi, &frame).await,
        "Failed to display frame"
    );
    Timer::after_secs(5).await;

    info!("Laying down base image for partial updates");
    expect!(
        epd.display_base_framebuffer(&mut spi, &frame.black_white()).await,
        "Failed to display base image"
    );

    info!("Displaying partial updates");
    let mut badge = [0xFF; BADGE_LENGTH];
    for step in 0..4u8 {
        let filled = BADGE_LENGTH * (step as usize + 1) / 4;
        badge[..filled].fill(0x00);
        let window = Rectangle::new(Point::new(8 * 80, 180), BADGE);
        let update = expect!(Frame::new(window, &badge), "Badge doesn't match window");
        expect!(
            DisplaySimple::<1, 1, _, _>::display_framebuffer(&mut epd, &mut spi, &update).await,
            "Failed to display badge"
        );
        Timer::after_millis(500).await;
    }
    Timer::after_secs(4).await;

    info!("Sleeping EPD");
    let epd = expect!(epd.sleep(&mut spi).await, "Failed to put EPD to sleep");
    Timer::after_secs(2).await;

    info!("Waking EPD");
    let mut epd = expect!(epd.wake(&mut spi).await, "Failed to wake EPD");
    expect!(epd.clear(&mut spi).await, "Failed to clear EPD");

    info!("Resetting EPD");
    let epd = expect!(epd.reset().await, "Failed to reset EPD");
    let mut epd = expect!(epd.init(&mut spi).await, "Failed to re-initialize EPD");
    expect!(
        epd.display_frame(&mut spi, None, Some(&red[..])).await,
        "Failed to display red plane"
    );

    let mut epd = expect!(epd.sleep(&mut spi).await, "Failed to put EPD to sleep");
    expect!(epd.power_off().await, "Failed to cut EPD power");
    info!("Done");
}
