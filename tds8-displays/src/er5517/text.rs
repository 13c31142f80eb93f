//! The character generator. Glyphs come from the internal CGROM, a Genitop font ROM on the serial
//! flash, or user-defined bitmaps in CGRAM, and are rasterised by the controller.

use embedded_graphics::{pixelcolor::Rgb565, prelude::Point};
use embedded_hal::spi::ErrorType as SpiErrorType;

use super::{
    registers::{icr, Register},
    Er5517, Error, StateReady,
};
use crate::{
    hw::{ErrorHw, SpiHw},
    log::trace,
};

const MAX_LINE_DISTANCE: u8 = 0x1F;
const MAX_CHARACTER_SPACING: u8 = 0x3F;

const FULL_ALIGNMENT: u8 = 1 << 7;
const TRANSPARENT: u8 = 1 << 6;
const ROTATE_90: u8 = 1 << 4;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FontSource {
    InternalCgrom = 0b00,
    Genitop = 0b01,
    UserDefined = 0b10,
}

/// Glyph cell size. Full width glyphs are twice as wide.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FontSize {
    Size8x16 = 0b00,
    Size12x24 = 0b01,
    Size16x32 = 0b10,
}

/// Character set of the internal CGROM.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Charset {
    Iso8859_1 = 0b00,
    Iso8859_2 = 0b01,
    Iso8859_3 = 0b10,
    Iso8859_4 = 0b11,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Enlargement {
    X1 = 0,
    X2 = 1,
    X3 = 2,
    X4 = 3,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub source: FontSource,
    pub size: FontSize,
    pub charset: Charset,
    /// Aligns half and full width glyphs to the full width grid.
    pub full_alignment: bool,
    /// Leaves the background behind glyphs untouched instead of filling it.
    pub transparent: bool,
    /// Rotates glyphs 90° counterclockwise and flips them, for portrait panels.
    pub rotate: bool,
    pub width: Enlargement,
    pub height: Enlargement,
    /// Extra pixels between lines, up to 31.
    pub line_distance: u8,
    /// Extra pixels between characters, up to 63.
    pub character_spacing: u8,
    pub foreground: Rgb565,
    pub background: Rgb565,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            source: FontSource::InternalCgrom,
            size: FontSize::Size8x16,
            charset: Charset::Iso8859_1,
            full_alignment: false,
            transparent: false,
            rotate: false,
            width: Enlargement::X1,
            height: Enlargement::X1,
            line_distance: 0,
            character_spacing: 0,
            foreground: Rgb565::new(31, 63, 31),
            background: Rgb565::new(0, 0, 0),
        }
    }
}

impl TextStyle {
    fn control0(&self) -> u8 {
        ((self.source as u8) << 6) | ((self.size as u8) << 4) | self.charset as u8
    }

    fn control1(&self) -> u8 {
        let mut bits = ((self.width as u8) << 2) | self.height as u8;
        if self.full_alignment {
            bits |= FULL_ALIGNMENT;
        }
        if self.transparent {
            bits |= TRANSPARENT;
        }
        if self.rotate {
            bits |= ROTATE_90;
        }
        bits
    }
}

impl<HW> Er5517<HW, StateReady>
where
    HW: SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>,
{
    /// Applies `style` to all text written afterwards.
    pub async fn configure_text(
        &mut self,
        spi: &mut HW::Spi,
        style: &TextStyle,
    ) -> Result<(), Error<HW::Error>> {
        if style.line_distance > MAX_LINE_DISTANCE
            || style.character_spacing > MAX_CHARACTER_SPACING
        {
            return Err(Error::OutOfRange);
        }
        self.write_register(spi, Register::CharacterControl0, style.control0())
            .await?;
        self.write_register(spi, Register::CharacterControl1, style.control1())
            .await?;
        self.write_register(spi, Register::LineDistance, style.line_distance)
            .await?;
        self.write_register(spi, Register::CharacterSpacing, style.character_spacing)
            .await?;
        self.set_foreground_color(spi, style.foreground).await?;
        self.set_background_color(spi, style.background).await
    }

    /// SDRAM address of the user-defined glyph bitmaps.
    pub async fn set_cgram_start(
        &mut self,
        spi: &mut HW::Spi,
        address: u32,
    ) -> Result<(), Error<HW::Error>> {
        self.write_u32(spi, Register::CgramStart, address).await
    }

    pub async fn set_text_cursor(
        &mut self,
        spi: &mut HW::Spi,
        position: Point,
    ) -> Result<(), Error<HW::Error>> {
        self.write_point(spi, Register::TextCursorX, Register::TextCursorY, position)
            .await
    }

    /// Renders `text` at `position` in the configured style. Bytes are character codes in the
    /// selected font, and the cursor advances and wraps at the active window.
    ///
    /// Text mode is left again even when a write times out, so graphics keep working.
    pub async fn write_text(
        &mut self,
        spi: &mut HW::Spi,
        position: Point,
        text: &[u8],
    ) -> Result<(), Error<HW::Error>> {
        trace!("Writing {} characters of text", text.len());
        self.set_bits(spi, Register::InputControl, icr::TEXT_MODE, true)
            .await?;
        let result = self.stream_text(spi, position, text).await;
        let restored = self
            .set_bits(spi, Register::InputControl, icr::TEXT_MODE, false)
            .await;
        result.and(restored)
    }

    async fn stream_text(
        &mut self,
        spi: &mut HW::Spi,
        position: Point,
        text: &[u8],
    ) -> Result<(), Error<HW::Error>> {
        self.set_text_cursor(spi, position).await?;
        self.start_memory_write(spi).await?;
        for byte in text {
            self.write_memory_byte(spi, *byte).await?;
        }
        self.wait_core_idle(spi).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        er5517::{testing::*, PollTarget},
        test_support::run,
    };

    #[test]
    fn test_control_registers() {
        let style = TextStyle {
            source: FontSource::UserDefined,
            size: FontSize::Size12x24,
            charset: Charset::Iso8859_4,
            full_alignment: true,
            rotate: true,
            width: Enlargement::X3,
            height: Enlargement::X2,
            ..TextStyle::default()
        };
        assert_eq!(style.control0(), 0x80 | 0x10 | 0x03);
        assert_eq!(style.control1(), 0x80 | 0x10 | 0x08 | 0x01);
    }

    #[test]
    fn test_configure_text_writes_style_and_colors() {
        let mut bus = Bus::default();
        bus.write(0xCC, 0x20)
            .write(0xCD, 0x45)
            .write(0xD0, 4)
            .write(0xD1, 2)
            .write_bytes(0xD2, &[0xF8, 0x00, 0x00])
            .write_bytes(0xD5, &[0x00, 0x03, 0xF8]);
        let mut spi = bus.spi();
        let mut er = ready();

        let style = TextStyle {
            size: FontSize::Size16x32,
            transparent: true,
            width: Enlargement::X2,
            height: Enlargement::X2,
            line_distance: 4,
            character_spacing: 2,
            foreground: Rgb565::new(31, 0, 0),
            background: Rgb565::new(0, 0, 31),
            ..TextStyle::default()
        };
        run(er.configure_text(&mut spi, &style));

        done(er, spi);
    }

    #[test]
    fn test_configure_text_rejects_wide_spacing() {
        let mut spi = Bus::default().spi();
        let mut er = ready();

        let style = TextStyle {
            line_distance: 32,
            ..TextStyle::default()
        };
        let err = expect_error(er.configure_text(&mut spi, &style));
        assert!(matches!(err, Error::OutOfRange));

        done(er, spi);
    }

    #[test]
    fn test_write_text_switches_mode_around_the_string() {
        let mut bus = Bus::default();
        bus.update(0x03, 0x00, 0x04)
            .write_u16(0x63, 10)
            .write_u16(0x65, 20)
            .command(0x04)
            .data(b'H')
            .idle()
            .data(b'i')
            .idle()
            .idle()
            .update(0x03, 0x04, 0x00);
        let mut spi = bus.spi();
        let mut er = ready();

        run(er.write_text(&mut spi, Point::new(10, 20), b"Hi"));

        done(er, spi);
    }

    #[test]
    fn test_write_text_leaves_text_mode_after_fifo_timeout() {
        let mut bus = Bus::default();
        bus.update(0x03, 0x00, 0x04)
            .write_u16(0x63, 0)
            .write_u16(0x65, 0)
            .command(0x04)
            .data(b'A')
            .status(0x80)
            .status(0x80)
            .status(0x80)
            .update(0x03, 0x04, 0x00);
        let mut spi = bus.spi();
        let mut er = ready();

        let err = expect_error(er.write_text(&mut spi, Point::zero(), b"AB"));
        assert!(matches!(err, Error::Timeout(PollTarget::WriteFifoNotFull)));

        done(er, spi);
    }

    #[test]
    fn test_cgram_start() {
        let mut bus = Bus::default();
        bus.write_u32(0xDB, 0x0015_1800);
        let mut spi = bus.spi();
        let mut er = ready();

        run(er.set_cgram_start(&mut spi, 0x0015_1800));

        done(er, spi);
    }
}
