//! Display memory layout: the main window that is scanned out, the canvas that drawing goes to,
//! and host pixel writes.
//!
//! SDRAM holds full-panel layers back to back at 16 bits per pixel. Showing one layer while
//! drawing on another gives tear-free updates.

use embedded_graphics::{
    pixelcolor::{IntoStorage, Rgb565},
    prelude::Point,
    primitives::Rectangle,
};
use embedded_hal::spi::ErrorType as SpiErrorType;

use super::{
    registers::{aw_color, Register},
    Er5517, Error, StateReady,
};
use crate::hw::{ErrorHw, SpiHw};

/// Largest coordinate or extent the window and cursor registers hold (13 bits).
pub const MAX_COORDINATE: u16 = 0x1FFF;

/// How the canvas is addressed by the engines and the memory port.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryMode {
    /// Block mode, addressed by X and Y within the canvas.
    Xy,
    /// Flat byte addresses.
    Linear,
}

pub(crate) fn coordinate<E>(value: i32) -> Result<u16, Error<E>> {
    u16::try_from(value)
        .ok()
        .filter(|v| *v <= MAX_COORDINATE)
        .ok_or(Error::OutOfRange)
}

pub(crate) fn extent<E>(value: u32) -> Result<u16, Error<E>> {
    u16::try_from(value)
        .ok()
        .filter(|v| *v <= MAX_COORDINATE)
        .ok_or(Error::OutOfRange)
}

pub(crate) fn is_empty(area: &Rectangle) -> bool {
    area.size.width == 0 || area.size.height == 0
}

impl<HW> Er5517<HW, StateReady>
where
    HW: SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>,
{
    /// Writes a point to a pair of X/Y registers.
    pub(crate) async fn write_point(
        &mut self,
        spi: &mut HW::Spi,
        x: Register,
        y: Register,
        point: Point,
    ) -> Result<(), Error<HW::Error>> {
        let px = coordinate(point.x)?;
        let py = coordinate(point.y)?;
        self.write_u16(spi, x, px).await?;
        self.write_u16(spi, y, py).await
    }

    /// Points scan out at the image starting at `address` that is `width` pixels wide.
    pub async fn set_main_image(
        &mut self,
        spi: &mut HW::Spi,
        address: u32,
        width: u16,
    ) -> Result<(), Error<HW::Error>> {
        self.write_u32(spi, Register::MainImageStart, address).await?;
        self.write_u16(spi, Register::MainImageWidth, width).await
    }

    /// Sets which point of the main image is shown at the panel's top left corner.
    pub async fn set_main_window_origin(
        &mut self,
        spi: &mut HW::Spi,
        origin: Point,
    ) -> Result<(), Error<HW::Error>> {
        self.write_point(spi, Register::MainWindowX, Register::MainWindowY, origin)
            .await
    }

    /// Points drawing and host writes at the image starting at `address`.
    pub async fn set_canvas(
        &mut self,
        spi: &mut HW::Spi,
        address: u32,
        width: u16,
    ) -> Result<(), Error<HW::Error>> {
        self.write_u32(spi, Register::CanvasStart, address).await?;
        self.write_u16(spi, Register::CanvasWidth, width).await
    }

    /// Clips drawing and host writes to `area` of the canvas.
    pub async fn set_active_window(
        &mut self,
        spi: &mut HW::Spi,
        area: Rectangle,
    ) -> Result<(), Error<HW::Error>> {
        let width = extent(area.size.width)?;
        let height = extent(area.size.height)?;
        self.write_point(
            spi,
            Register::ActiveWindowX,
            Register::ActiveWindowY,
            area.top_left,
        )
        .await?;
        self.write_u16(spi, Register::ActiveWindowWidth, width).await?;
        self.write_u16(spi, Register::ActiveWindowHeight, height)
            .await
    }

    pub async fn set_memory_mode(
        &mut self,
        spi: &mut HW::Spi,
        mode: MemoryMode,
    ) -> Result<(), Error<HW::Error>> {
        self.set_bits(
            spi,
            Register::CanvasAddressing,
            aw_color::LINEAR,
            mode == MemoryMode::Linear,
        )
        .await
    }

    /// SDRAM address of a full-panel layer.
    pub fn layer_address(&self, layer: u8) -> u32 {
        layer as u32 * self.config.panel.layer_bytes()
    }

    /// Scans out `layer`.
    pub async fn show_layer(
        &mut self,
        spi: &mut HW::Spi,
        layer: u8,
    ) -> Result<(), Error<HW::Error>> {
        let address = self.layer_address(layer);
        let width = self.config.panel.width;
        self.set_main_image(spi, address, width).await
    }

    /// Sends drawing to `layer` and opens the active window over the whole of it.
    pub async fn draw_on_layer(
        &mut self,
        spi: &mut HW::Spi,
        layer: u8,
    ) -> Result<(), Error<HW::Error>> {
        let address = self.layer_address(layer);
        let panel = self.config.panel;
        self.set_canvas(spi, address, panel.width).await?;
        self.set_active_window(spi, Rectangle::new(Point::zero(), panel.size()))
            .await
    }

    /// Shows and draws on layer 0 with no scroll offset.
    pub(crate) async fn use_full_panel(
        &mut self,
        spi: &mut HW::Spi,
    ) -> Result<(), Error<HW::Error>> {
        self.show_layer(spi, 0).await?;
        self.set_main_window_origin(spi, Point::zero()).await?;
        self.draw_on_layer(spi, 0).await
    }

    /// Moves the graphic mode write cursor.
    pub async fn set_pixel_cursor(
        &mut self,
        spi: &mut HW::Spi,
        position: Point,
    ) -> Result<(), Error<HW::Error>> {
        self.write_point(spi, Register::PixelCursorX, Register::PixelCursorY, position)
            .await
    }

    async fn write_pixel_data(
        &mut self,
        spi: &mut HW::Spi,
        color: Rgb565,
    ) -> Result<(), Error<HW::Error>> {
        let [low, high] = color.into_storage().to_le_bytes();
        self.write_memory_byte(spi, low).await?;
        self.write_memory_byte(spi, high).await
    }

    pub async fn draw_pixel(
        &mut self,
        spi: &mut HW::Spi,
        position: Point,
        color: Rgb565,
    ) -> Result<(), Error<HW::Error>> {
        self.set_pixel_cursor(spi, position).await?;
        self.start_memory_write(spi).await?;
        self.write_pixel_data(spi, color).await
    }

    /// Streams pixels into `area`, row by row. The active window is left on `area`.
    pub async fn write_pixels(
        &mut self,
        spi: &mut HW::Spi,
        area: Rectangle,
        pixels: impl IntoIterator<Item = Rgb565>,
    ) -> Result<(), Error<HW::Error>> {
        if is_empty(&area) {
            return Ok(());
        }
        self.set_active_window(spi, area).await?;
        self.set_pixel_cursor(spi, area.top_left).await?;
        self.start_memory_write(spi).await?;
        for pixel in pixels {
            self.write_pixel_data(spi, pixel).await?;
        }
        Ok(())
    }

    /// Streams a big-endian RGB565 image into `area`. The active window is left on `area`.
    ///
    /// `bytes` must hold exactly two bytes for every pixel in `area`.
    pub async fn write_image(
        &mut self,
        spi: &mut HW::Spi,
        area: Rectangle,
        bytes: &[u8],
    ) -> Result<(), Error<HW::Error>> {
        let expected = area.size.width as usize * area.size.height as usize * 2;
        if bytes.len() != expected {
            return Err(Error::OutOfRange);
        }
        if is_empty(&area) {
            return Ok(());
        }
        self.set_active_window(spi, area).await?;
        self.set_pixel_cursor(spi, area.top_left).await?;
        self.start_memory_write(spi).await?;
        for pixel in bytes.chunks_exact(2) {
            self.write_memory_byte(spi, pixel[1]).await?;
            self.write_memory_byte(spi, pixel[0]).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use embedded_graphics::prelude::{RgbColor, Size};

    use super::*;
    use crate::{er5517::testing::*, test_support::run};

    fn window(bus: &mut Bus, x: u16, y: u16, width: u16, height: u16) {
        bus.write_u16(0x56, x)
            .write_u16(0x58, y)
            .write_u16(0x5A, width)
            .write_u16(0x5C, height);
    }

    #[test]
    fn test_layers_are_full_panel_strides() {
        let er = ready();
        assert_eq!(er.layer_address(0), 0);
        assert_eq!(er.layer_address(2), 2 * 360 * 960 * 2);
        er.release().reset.done();
    }

    #[test]
    fn test_show_and_draw_on_layer() {
        let mut bus = Bus::default();
        bus.write_u32(0x20, 691_200).write_u16(0x24, 360);
        bus.write_u32(0x50, 1_382_400).write_u16(0x54, 360);
        window(&mut bus, 0, 0, 360, 960);
        let mut spi = bus.spi();
        let mut er = ready();

        run(er.show_layer(&mut spi, 1));
        run(er.draw_on_layer(&mut spi, 2));

        done(er, spi);
    }

    #[test]
    fn test_memory_mode_toggles_linear_bit() {
        let mut bus = Bus::default();
        bus.update(0x5E, 0x01, 0x05).update(0x5E, 0x05, 0x01);
        let mut spi = bus.spi();
        let mut er = ready();

        run(er.set_memory_mode(&mut spi, MemoryMode::Linear));
        run(er.set_memory_mode(&mut spi, MemoryMode::Xy));

        done(er, spi);
    }

    #[test]
    fn test_draw_pixel_writes_low_byte_first() {
        let mut bus = Bus::default();
        bus.write_u16(0x5F, 10).write_u16(0x61, 300);
        bus.command(0x04).data(0x00).idle().data(0xF8).idle();
        let mut spi = bus.spi();
        let mut er = ready();

        run(er.draw_pixel(&mut spi, Point::new(10, 300), Rgb565::RED));

        done(er, spi);
    }

    #[test]
    fn test_write_pixels_waits_for_fifo_room() {
        let mut bus = Bus::default();
        window(&mut bus, 4, 8, 2, 1);
        bus.write_u16(0x5F, 4).write_u16(0x61, 8).command(0x04);
        bus.data(0x1F).idle().data(0x00).idle();
        bus.data(0xE0).status(0x80).idle().data(0x07).idle();
        let mut spi = bus.spi();
        let mut er = ready();

        let area = Rectangle::new(Point::new(4, 8), Size::new(2, 1));
        run(er.write_pixels(&mut spi, area, [Rgb565::BLUE, Rgb565::GREEN]));

        done(er, spi);
    }

    #[test]
    fn test_write_image_swaps_big_endian_pairs() {
        let mut bus = Bus::default();
        window(&mut bus, 0, 0, 1, 2);
        bus.write_u16(0x5F, 0).write_u16(0x61, 0).command(0x04);
        bus.data(0x34).idle().data(0x12).idle();
        bus.data(0x78).idle().data(0x56).idle();
        let mut spi = bus.spi();
        let mut er = ready();

        let area = Rectangle::new(Point::zero(), Size::new(1, 2));
        run(er.write_image(&mut spi, area, &[0x12, 0x34, 0x56, 0x78]));

        done(er, spi);
    }

    #[test]
    fn test_write_image_rejects_wrong_length() {
        let mut spi = Bus::default().spi();
        let mut er = ready();

        let area = Rectangle::new(Point::zero(), Size::new(2, 1));
        let err = expect_error(er.write_image(&mut spi, area, &[0x12, 0x34, 0x56]));
        assert!(matches!(err, Error::OutOfRange));

        done(er, spi);
    }

    #[test]
    fn test_negative_cursor_is_out_of_range() {
        let mut spi = Bus::default().spi();
        let mut er = ready();

        let err = expect_error(er.set_pixel_cursor(&mut spi, Point::new(-1, 0)));
        assert!(matches!(err, Error::OutOfRange));
        let err = expect_error(er.set_pixel_cursor(&mut spi, Point::new(0, 0x2000)));
        assert!(matches!(err, Error::OutOfRange));

        done(er, spi);
    }

    #[test]
    fn test_empty_area_writes_nothing() {
        let mut spi = Bus::default().spi();
        let mut er = ready();

        let area = Rectangle::new(Point::new(5, 5), Size::new(0, 4));
        run(er.write_pixels(&mut spi, area, [Rgb565::RED]));

        done(er, spi);
    }
}
