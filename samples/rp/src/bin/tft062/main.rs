//! Brings up the ER-TFT062-1 (GC9503 bridge and ER5517 controller) and runs through the
//! controller's drawing features.

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
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::{Point, RgbColor, Size};
use embedded_graphics::primitives::Rectangle;
use hw::*;
use tds8_displays::{
    er5517::{
        self,
        bte::{BteSurface, Rop},
        config::Config,
        draw::DrawStyle,
        text::{Enlargement, TextStyle},
        Er5517,
    },
    gc9503::Gc9503,
};
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let resources = split_resources!(p);
    let mut config = spi::Config::default();
    config.frequency = er5517::RECOMMENDED_SPI_HZ;

    let raw_spi: Mutex<NoopRawMutex, _> = Mutex::new(Spi::new(
        resources.spi_hw.spi,
        resources.spi_hw.clk,
        resources.spi_hw.tx,
        resources.spi_hw.rx,
        resources.spi_hw.dma_tx,
        resources.spi_hw.dma_rx,
        config,
    ));
    // CS is active low.
    let cs_pin = Output::new(resources.spi_hw.cs, Level::High);
    let mut spi = SpiDevice::new(&raw_spi, cs_pin);

    info!("Initializing GC9503");
    let mut bridge = Gc9503::new(BridgeHw::new(resources.bridge_hw));
    expect!(bridge.init().await, "Failed to initialize GC9503");

    info!("Initializing ER5517");
    let tft = Er5517::new(ControllerHw::new(resources.controller_hw), Config::default());
    let mut tft = expect!(tft.init(&mut spi).await, "Failed to initialize ER5517");
    expect!(tft.set_backlight(&mut spi, 80).await, "Failed to set backlight");

    let panel = tft.config().panel;
    let screen = Rectangle::new(Point::zero(), panel.size());
    expect!(tft.fill(&mut spi, screen, Rgb565::BLACK).await, "Failed to clear");

    info!("Drawing shapes");
    let center = screen.center();
    expect!(
        tft.draw_circle(&mut spi, center, 120, Rgb565::RED, DrawStyle::Filled)
            .await,
        "Failed to draw circle"
    );
    expect!(
        tft.draw_rectangle(
            &mut spi,
            Rectangle::with_center(center, Size::new(300, 300)),
            Rgb565::WHITE,
            DrawStyle::Outline,
        )
        .await,
        "Failed to draw rectangle"
    );
    expect!(
        tft.draw_line(&mut spi, Point::zero(), Point::new(359, 959), Rgb565::GREEN)
            .await,
        "Failed to draw line"
    );
    Timer::after_secs(2).await;

    info!("Writing gradient");
    let band = Rectangle::new(Point::new(0, 40), Size::new(panel.width as u32, 64));
    let gradient = (0..band.size.height).flat_map(|_| {
        (0..band.size.width).map(|x| Rgb565::new(0, (x * 63 / 359) as u8, 31))
    });
    expect!(
        tft.write_pixels(&mut spi, band, gradient).await,
        "Failed to write pixels"
    );
    expect!(
        tft.set_active_window(&mut spi, screen).await,
        "Failed to reset window"
    );

    info!("Copying with the BTE");
    let layer0 = tft.layer_address(0);
    let width = panel.width;
    expect!(
        tft.bte_memory_copy(
            &mut spi,
            &BteSurface::new(layer0, width, band.top_left),
            &BteSurface::new(layer0, width, Point::new(0, 860)),
            band.size,
            Rop::S0,
        )
        .await,
        "Failed to copy band"
    );
    expect!(
        tft.bte_solid_fill(
            &mut spi,
            &BteSurface::new(layer0, width, Point::new(20, 700)),
            Size::new(320, 40),
            Rgb565::YELLOW,
        )
        .await,
        "Failed to fill"
    );

    info!("Writing text");
    let style = TextStyle {
        width: Enlargement::X2,
        height: Enlargement::X2,
        transparent: true,
        foreground: Rgb565::WHITE,
        ..TextStyle::default()
    };
    expect!(tft.configure_text(&mut spi, &style).await, "Failed to set style");
    expect!(
        tft.write_text(&mut spi, Point::new(20, 140), b"TDS-8").await,
        "Failed to write text"
    );
    Timer::after_secs(4).await;

    info!("Fading out");
    for percent in (0..=80).rev().step_by(10) {
        expect!(tft.set_backlight(&mut spi, percent).await, "Failed to set backlight");
        Timer::after_millis(100).await;
    }
    expect!(tft.display_off(&mut spi).await, "Failed to switch off");
    expect!(bridge.sleep_in().await, "Failed to put GC9503 to sleep");
    info!("Done");
}
