//! Hardware accelerated primitives and the text/drawing colours.
//!
//! Each primitive loads its coordinates, starts the drawing engine and waits for the core to go
//! idle, so calls can be issued back to back. Coordinates are relative to the canvas and are
//! clipped by the active window.

use embedded_graphics::{
    pixelcolor::{IntoStorage, Rgb565},
    prelude::{Point, Size},
    primitives::Rectangle,
};
use embedded_hal::spi::ErrorType as SpiErrorType;

use super::{
    memory::{coordinate, extent, is_empty},
    registers::Register,
    Er5517, Error, StateReady,
};
use crate::hw::{ErrorHw, SpiHw};

const START_LINE: u8 = 0x80;
const START_TRIANGLE: u8 = 0x82;
const FILL_TRIANGLE: u8 = 0xA2;
const START_ELLIPSE: u8 = 0x80;
const START_CURVE: u8 = 0x90;
const START_RECTANGLE: u8 = 0xA0;
const START_ROUNDED_RECTANGLE: u8 = 0xB0;
/// Added to the shape control value to fill instead of outline.
const FILL_SHAPE: u8 = 0x40;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStyle {
    Outline,
    Filled,
}

/// Quarter of an ellipse drawn by [Er5517::draw_curve].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CurvePart {
    LowerLeft = 0,
    UpperLeft = 1,
    UpperRight = 2,
    LowerRight = 3,
}

/// The 24-bit colour register encoding of an RGB565 colour.
pub fn color_bytes(color: Rgb565) -> [u8; 3] {
    let raw = color.into_storage();
    [(raw >> 8) as u8, (raw >> 3) as u8, (raw << 3) as u8]
}

fn xy<E>(point: Point) -> Result<(u16, u16), Error<E>> {
    Ok((coordinate(point.x)?, coordinate(point.y)?))
}

fn radii<E>(size: Size) -> Result<(u16, u16), Error<E>> {
    Ok((extent(size.width)?, extent(size.height)?))
}

/// Inclusive corners of `area`, or `None` if it's empty.
fn corners<E>(area: &Rectangle) -> Result<Option<((u16, u16), (u16, u16))>, Error<E>> {
    match area.bottom_right() {
        Some(bottom_right) if !is_empty(area) => Ok(Some((xy(area.top_left)?, xy(bottom_right)?))),
        _ => Ok(None),
    }
}

fn shape_control(start: u8, style: DrawStyle) -> u8 {
    match style {
        DrawStyle::Outline => start,
        DrawStyle::Filled => start | FILL_SHAPE,
    }
}

impl<HW> Er5517<HW, StateReady>
where
    HW: SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>,
{
    /// Sets the colour used by the drawing engine and for text glyphs.
    pub async fn set_foreground_color(
        &mut self,
        spi: &mut HW::Spi,
        color: Rgb565,
    ) -> Result<(), Error<HW::Error>> {
        self.write_bytes(spi, Register::ForegroundColor, &color_bytes(color))
            .await
    }

    /// Sets the colour behind text glyphs.
    pub async fn set_background_color(
        &mut self,
        spi: &mut HW::Spi,
        color: Rgb565,
    ) -> Result<(), Error<HW::Error>> {
        self.write_bytes(spi, Register::BackgroundColor, &color_bytes(color))
            .await
    }

    async fn write_xy(
        &mut self,
        spi: &mut HW::Spi,
        x: Register,
        y: Register,
        (px, py): (u16, u16),
    ) -> Result<(), Error<HW::Error>> {
        self.write_u16(spi, x, px).await?;
        self.write_u16(spi, y, py).await
    }

    async fn run_engine(
        &mut self,
        spi: &mut HW::Spi,
        control: Register,
        value: u8,
    ) -> Result<(), Error<HW::Error>> {
        self.write_register(spi, control, value).await?;
        self.wait_core_idle(spi).await
    }

    pub async fn draw_line(
        &mut self,
        spi: &mut HW::Spi,
        start: Point,
        end: Point,
        color: Rgb565,
    ) -> Result<(), Error<HW::Error>> {
        let start = xy(start)?;
        let end = xy(end)?;
        self.set_foreground_color(spi, color).await?;
        self.write_xy(spi, Register::DrawStartX, Register::DrawStartY, start)
            .await?;
        self.write_xy(spi, Register::DrawEndX, Register::DrawEndY, end)
            .await?;
        self.run_engine(spi, Register::DrawLineControl, START_LINE)
            .await
    }

    pub async fn draw_triangle(
        &mut self,
        spi: &mut HW::Spi,
        vertices: [Point; 3],
        color: Rgb565,
        style: DrawStyle,
    ) -> Result<(), Error<HW::Error>> {
        let [a, b, c] = vertices;
        let (a, b, c) = (xy(a)?, xy(b)?, xy(c)?);
        self.set_foreground_color(spi, color).await?;
        self.write_xy(spi, Register::DrawStartX, Register::DrawStartY, a)
            .await?;
        self.write_xy(spi, Register::DrawEndX, Register::DrawEndY, b)
            .await?;
        self.write_xy(spi, Register::DrawPoint3X, Register::DrawPoint3Y, c)
            .await?;
        let control = match style {
            DrawStyle::Outline => START_TRIANGLE,
            DrawStyle::Filled => FILL_TRIANGLE,
        };
        self.run_engine(spi, Register::DrawLineControl, control).await
    }

    pub async fn draw_rectangle(
        &mut self,
        spi: &mut HW::Spi,
        area: Rectangle,
        color: Rgb565,
        style: DrawStyle,
    ) -> Result<(), Error<HW::Error>> {
        let Some((top_left, bottom_right)) = corners(&area)? else {
            return Ok(());
        };
        self.set_foreground_color(spi, color).await?;
        self.write_xy(spi, Register::DrawStartX, Register::DrawStartY, top_left)
            .await?;
        self.write_xy(spi, Register::DrawEndX, Register::DrawEndY, bottom_right)
            .await?;
        let control = shape_control(START_RECTANGLE, style);
        self.run_engine(spi, Register::DrawShapeControl, control)
            .await
    }

    /// Fills `area` with a solid colour.
    pub async fn fill(
        &mut self,
        spi: &mut HW::Spi,
        area: Rectangle,
        color: Rgb565,
    ) -> Result<(), Error<HW::Error>> {
        self.draw_rectangle(spi, area, color, DrawStyle::Filled)
            .await
    }

    /// Draws a rectangle with elliptical corners of the given horizontal and vertical radii.
    pub async fn draw_rounded_rectangle(
        &mut self,
        spi: &mut HW::Spi,
        area: Rectangle,
        corner_radii: Size,
        color: Rgb565,
        style: DrawStyle,
    ) -> Result<(), Error<HW::Error>> {
        let Some((top_left, bottom_right)) = corners(&area)? else {
            return Ok(());
        };
        let (rx, ry) = radii(corner_radii)?;
        self.set_foreground_color(spi, color).await?;
        self.write_xy(spi, Register::DrawStartX, Register::DrawStartY, top_left)
            .await?;
        self.write_xy(spi, Register::DrawEndX, Register::DrawEndY, bottom_right)
            .await?;
        self.write_u16(spi, Register::MajorRadius, rx).await?;
        self.write_u16(spi, Register::MinorRadius, ry).await?;
        let control = shape_control(START_ROUNDED_RECTANGLE, style);
        self.run_engine(spi, Register::DrawShapeControl, control)
            .await
    }

    async fn write_ellipse(
        &mut self,
        spi: &mut HW::Spi,
        center: Point,
        size: Size,
        color: Rgb565,
    ) -> Result<(), Error<HW::Error>> {
        let center = xy(center)?;
        let (rx, ry) = radii(size)?;
        self.set_foreground_color(spi, color).await?;
        self.write_u16(spi, Register::MajorRadius, rx).await?;
        self.write_u16(spi, Register::MinorRadius, ry).await?;
        self.write_xy(spi, Register::CenterX, Register::CenterY, center)
            .await
    }

    /// Draws an ellipse with horizontal radius `radii.width` and vertical radius `radii.height`.
    pub async fn draw_ellipse(
        &mut self,
        spi: &mut HW::Spi,
        center: Point,
        radii: Size,
        color: Rgb565,
        style: DrawStyle,
    ) -> Result<(), Error<HW::Error>> {
        self.write_ellipse(spi, center, radii, color).await?;
        let control = shape_control(START_ELLIPSE, style);
        self.run_engine(spi, Register::DrawShapeControl, control)
            .await
    }

    pub async fn draw_circle(
        &mut self,
        spi: &mut HW::Spi,
        center: Point,
        radius: u32,
        color: Rgb565,
        style: DrawStyle,
    ) -> Result<(), Error<HW::Error>> {
        self.draw_ellipse(spi, center, Size::new(radius, radius), color, style)
            .await
    }

    /// Draws one quarter of an ellipse.
    pub async fn draw_curve(
        &mut self,
        spi: &mut HW::Spi,
        center: Point,
        radii: Size,
        part: CurvePart,
        color: Rgb565,
        style: DrawStyle,
    ) -> Result<(), Error<HW::Error>> {
        self.write_ellipse(spi, center, radii, color).await?;
        let control = shape_control(START_CURVE | part as u8, style);
        self.run_engine(spi, Register::DrawShapeControl, control)
            .await
    }
}
