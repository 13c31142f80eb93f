//! Block transfer engine (BTE).
//!
//! The BTE combines a source window (S0), an optional second source (S1) and a destination window
//! in SDRAM. The low level setters map one-to-one onto registers. The `bte_*` operations set up a
//! whole 16bpp transfer, run it and wait for the core to go idle.

use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::{Point, Size},
};
use embedded_hal::spi::ErrorType as SpiErrorType;

use super::{draw::color_bytes, memory::extent, registers::Register, Er5517, Error, StateReady};
use crate::hw::{ErrorHw, SpiHw};

const BTE_ENABLE: u8 = 1 << 4;
const PATTERN_16X16: u8 = 1 << 0;
/// S0 depth (b6:5), S1 source (b4:2) and destination depth (b1:0) in 0x92.
const COLOR_DEPTH_FIELDS: u8 = 0x7F;
/// Alpha is set in 1/32 steps.
pub const ALPHA_OPAQUE: u8 = 32;

/// Raster operation applied to S0 and S1.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Rop {
    Black = 0x0,
    Nor = 0x1,
    NotS0AndS1 = 0x2,
    NotS0 = 0x3,
    S0AndNotS1 = 0x4,
    NotS1 = 0x5,
    Xor = 0x6,
    Nand = 0x7,
    And = 0x8,
    Xnor = 0x9,
    S1 = 0xA,
    NotS0OrS1 = 0xB,
    S0 = 0xC,
    S0OrNotS1 = 0xD,
    Or = 0xE,
    White = 0xF,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BteOperation {
    MpuWrite = 0x0,
    MpuRead = 0x1,
    MemoryCopyPositive = 0x2,
    MemoryCopyNegative = 0x3,
    MpuWriteWithChromaKey = 0x4,
    MemoryCopyWithChromaKey = 0x5,
    PatternFill = 0x6,
    PatternFillWithChromaKey = 0x7,
    ColorExpansion = 0x8,
    ColorExpansionWithChromaKey = 0x9,
    MemoryCopyWithOpacity = 0xA,
    MpuWriteWithOpacity = 0xB,
    SolidFill = 0xC,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    Bpp8,
    Bpp16,
    Bpp24,
}

impl ColorDepth {
    fn bits(self) -> u8 {
        match self {
            ColorDepth::Bpp8 => 0b00,
            ColorDepth::Bpp16 => 0b01,
            ColorDepth::Bpp24 => 0b10,
        }
    }
}

/// Where S1 pixels come from.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum S1Source {
    Bpp8 = 0b000,
    Bpp16 = 0b001,
    Bpp24 = 0b010,
    /// A single colour set with [Er5517::set_s1_constant_color].
    Constant = 0b011,
    Alpha8 = 0b100,
    Alpha16 = 0b101,
}

/// Constant S1 colour at the depth of the destination.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantColor {
    Bpp8(u8),
    Bpp16(Rgb565),
    /// `0xRRGGBB`.
    Bpp24(u32),
}

impl ConstantColor {
    pub fn register_bytes(self) -> [u8; 3] {
        match self {
            ConstantColor::Bpp8(t) => [t, t << 3, t << 6],
            ConstantColor::Bpp16(color) => color_bytes(color),
            ConstantColor::Bpp24(t) => [(t >> 16) as u8, (t >> 8) as u8, t as u8],
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSize {
    Size8x8,
    Size16x16,
}

/// A window into an image in SDRAM.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BteSurface {
    /// Start of the image.
    pub address: u32,
    /// Width of the whole image, in pixels.
    pub image_width: u16,
    /// Top left of the window within the image.
    pub position: Point,
}

impl BteSurface {
    pub const fn new(address: u32, image_width: u16, position: Point) -> Self {
        Self {
            address,
            image_width,
            position,
        }
    }
}

impl<HW> Er5517<HW, StateReady>
where
    HW: SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>,
{
    async fn write_surface(
        &mut self,
        spi: &mut HW::Spi,
        [start, width, x, y]: [Register; 4],
        surface: &BteSurface,
    ) -> Result<(), Error<HW::Error>> {
        self.write_u32(spi, start, surface.address).await?;
        self.write_u16(spi, width, surface.image_width).await?;
        self.write_point(spi, x, y, surface.position).await
    }

    pub async fn set_bte_source0(
        &mut self,
        spi: &mut HW::Spi,
        surface: &BteSurface,
    ) -> Result<(), Error<HW::Error>> {
        let registers = [
            Register::Source0Start,
            Register::Source0Width,
            Register::Source0X,
            Register::Source0Y,
        ];
        self.write_surface(spi, registers, surface).await
    }

    pub async fn set_bte_source1(
        &mut self,
        spi: &mut HW::Spi,
        surface: &BteSurface,
    ) -> Result<(), Error<HW::Error>> {
        let registers = [
            Register::Source1Start,
            Register::Source1Width,
            Register::Source1X,
            Register::Source1Y,
        ];
        self.write_surface(spi, registers, surface).await
    }

    pub async fn set_bte_destination(
        &mut self,
        spi: &mut HW::Spi,
        surface: &BteSurface,
    ) -> Result<(), Error<HW::Error>> {
        let registers = [
            Register::DestinationStart,
            Register::DestinationWidth,
            Register::DestinationX,
            Register::DestinationY,
        ];
        self.write_surface(spi, registers, surface).await
    }

    /// Overwrites the S1 start address registers with a constant colour.
    pub async fn set_s1_constant_color(
        &mut self,
        spi: &mut HW::Spi,
        color: ConstantColor,
    ) -> Result<(), Error<HW::Error>> {
        self.write_bytes(spi, Register::Source1Start, &color.register_bytes())
            .await
    }

    pub async fn set_bte_window_size(
        &mut self,
        spi: &mut HW::Spi,
        size: Size,
    ) -> Result<(), Error<HW::Error>> {
        let width = extent(size.width)?;
        let height = extent(size.height)?;
        self.write_u16(spi, Register::BteWidth, width).await?;
        self.write_u16(spi, Register::BteHeight, height).await
    }

    pub async fn set_bte_operation(
        &mut self,
        spi: &mut HW::Spi,
        operation: BteOperation,
        rop: Rop,
    ) -> Result<(), Error<HW::Error>> {
        let code = ((rop as u8) << 4) | operation as u8;
        self.write_register(spi, Register::BteControl1, code).await
    }

    pub async fn set_bte_color_depths(
        &mut self,
        spi: &mut HW::Spi,
        source0: ColorDepth,
        source1: S1Source,
        destination: ColorDepth,
    ) -> Result<(), Error<HW::Error>> {
        let bits = (source0.bits() << 5) | ((source1 as u8) << 2) | destination.bits();
        self.update_register(spi, Register::BteColor, COLOR_DEPTH_FIELDS, bits)
            .await
    }

    /// Opacity of S0 over S1 in 1/32 steps, up to [ALPHA_OPAQUE].
    pub async fn set_bte_alpha(
        &mut self,
        spi: &mut HW::Spi,
        alpha: u8,
    ) -> Result<(), Error<HW::Error>> {
        if alpha > ALPHA_OPAQUE {
            return Err(Error::OutOfRange);
        }
        self.write_register(spi, Register::AlphaBlending, alpha).await
    }

    pub async fn set_pattern_size(
        &mut self,
        spi: &mut HW::Spi,
        size: PatternSize,
    ) -> Result<(), Error<HW::Error>> {
        self.set_bits(
            spi,
            Register::BteControl0,
            PATTERN_16X16,
            size == PatternSize::Size16x16,
        )
        .await
    }

    /// Starts the configured transfer and waits for it to finish.
    pub async fn start_bte(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        self.set_bits(spi, Register::BteControl0, BTE_ENABLE, true)
            .await?;
        self.wait_core_idle(spi).await
    }

    async fn run_16bpp(
        &mut self,
        spi: &mut HW::Spi,
        size: Size,
        operation: BteOperation,
        rop: Rop,
    ) -> Result<(), Error<HW::Error>> {
        self.set_bte_color_depths(spi, ColorDepth::Bpp16, S1Source::Bpp16, ColorDepth::Bpp16)
            .await?;
        self.set_bte_window_size(spi, size).await?;
        self.set_bte_operation(spi, operation, rop).await?;
        self.start_bte(spi).await
    }

    /// Copies `size` pixels from `source` to `destination`, combining them with `rop`. The
    /// destination doubles as S1.
    pub async fn bte_memory_copy(
        &mut self,
        spi: &mut HW::Spi,
        source: &BteSurface,
        destination: &BteSurface,
        size: Size,
        rop: Rop,
    ) -> Result<(), Error<HW::Error>> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        self.set_bte_source0(spi, source).await?;
        self.set_bte_source1(spi, destination).await?;
        self.set_bte_destination(spi, destination).await?;
        self.run_16bpp(spi, size, BteOperation::MemoryCopyPositive, rop)
            .await
    }

    /// Fills a window with the foreground colour.
    pub async fn bte_solid_fill(
        &mut self,
        spi: &mut HW::Spi,
        destination: &BteSurface,
        size: Size,
        color: Rgb565,
    ) -> Result<(), Error<HW::Error>> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        self.set_bte_destination(spi, destination).await?;
        self.set_foreground_color(spi, color).await?;
        self.run_16bpp(spi, size, BteOperation::SolidFill, Rop::S0)
            .await
    }

    /// Blends `source0` over `source1` into `destination` with opacity `alpha`/32.
    pub async fn bte_blend(
        &mut self,
        spi: &mut HW::Spi,
        source0: &BteSurface,
        source1: &BteSurface,
        destination: &BteSurface,
        size: Size,
        alpha: u8,
    ) -> Result<(), Error<HW::Error>> {
        if alpha > ALPHA_OPAQUE {
            return Err(Error::OutOfRange);
        }
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        self.set_bte_source0(spi, source0).await?;
        self.set_bte_source1(spi, source1).await?;
        self.set_bte_destination(spi, destination).await?;
        self.set_bte_alpha(spi, alpha).await?;
        self.run_16bpp(spi, size, BteOperation::MemoryCopyWithOpacity, Rop::S0)
            .await
    }

    /// Copies `source` to `destination`, skipping pixels that match `key`.
    pub async fn bte_chroma_copy(
        &mut self,
        spi: &mut HW::Spi,
        source: &BteSurface,
        destination: &BteSurface,
        size: Size,
        key: Rgb565,
    ) -> Result<(), Error<HW::Error>> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        self.set_bte_source0(spi, source).await?;
        self.set_bte_destination(spi, destination).await?;
        self.set_background_color(spi, key).await?;
        self.run_16bpp(spi, size, BteOperation::MemoryCopyWithChromaKey, Rop::S0)
            .await
    }
}
