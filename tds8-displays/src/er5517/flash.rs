//! Serial flash interface: DMA from external flash into SDRAM, and the general purpose SPI master
//! that shares the same pins.
//!
//! The ER-TFT062-1 has no flash fitted by default. Boards that add one usually keep images there
//! and blit them in with [Er5517::dma_block].

use embedded_graphics::prelude::{Point, Size};
use embedded_hal::spi::{ErrorType as SpiErrorType, Mode, Phase, Polarity};

use super::{
    memory::{extent, MemoryMode},
    registers::{ccr, Register, SpiMasterControl, SpiMasterStatus},
    Er5517, Error, PollTarget, StateReady,
};
use crate::{
    hw::{ErrorHw, SpiHw},
    log::trace,
};

const SELECT_FLASH1: u8 = 1 << 7;
const DMA_MODE: u8 = 1 << 6;
const ADDRESS_32BIT: u8 = 1 << 5;
const WAVEFORM_MODE3: u8 = 1 << 4;
const DMA_START: u8 = 1 << 0;

/// Which of the two chip selects the flash sits on.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashInterface {
    Flash0,
    Flash1,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMode {
    /// The text engine reads glyphs from an external font ROM.
    Font,
    /// The host starts DMA transfers into SDRAM.
    Dma,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWidth {
    Bits24,
    Bits32,
}

/// SPI mode the flash is clocked in.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashWaveform {
    Mode0,
    Mode3,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DummyCycles {
    None = 0,
    Eight = 1,
    Sixteen = 2,
    TwentyFour = 3,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadCommand {
    /// 0x03 or 0x0B, depending on the dummy cycles.
    Single = 0b00,
    /// 0x3B, interleaved data.
    Dual0 = 0b10,
    /// 0xBB, interleaved address and data.
    Dual1 = 0b11,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialFlashConfig {
    pub interface: FlashInterface,
    pub mode: FlashMode,
    pub address_width: AddressWidth,
    pub waveform: FlashWaveform,
    pub dummy_cycles: DummyCycles,
    pub read_command: ReadCommand,
}

impl SerialFlashConfig {
    fn bits(&self) -> u8 {
        let mut bits = ((self.dummy_cycles as u8) << 2) | self.read_command as u8;
        if self.interface == FlashInterface::Flash1 {
            bits |= SELECT_FLASH1;
        }
        if self.mode == FlashMode::Dma {
            bits |= DMA_MODE;
        }
        if self.address_width == AddressWidth::Bits32 {
            bits |= ADDRESS_32BIT;
        }
        if self.waveform == FlashWaveform::Mode3 {
            bits |= WAVEFORM_MODE3;
        }
        bits
    }
}

/// A rectangular transfer from flash into the canvas.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaBlock {
    pub interface: FlashInterface,
    /// SPI clock is the core clock / ((clock_period + 1) * 2).
    pub clock_period: u8,
    /// Top left corner of the block on the canvas.
    pub destination: Point,
    pub size: Size,
    /// Width of the whole image stored in flash, in pixels.
    pub source_width: u16,
    pub source_address: u32,
}

/// A flat copy of `length` bytes from flash into SDRAM.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaLinear {
    pub interface: FlashInterface,
    pub clock_period: u8,
    pub source_address: u32,
    pub destination_address: u32,
    pub length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiMasterConfig {
    pub mode: Mode,
    /// Chip select driven by [Er5517::spi_master_select].
    pub chip_select: FlashInterface,
    pub clock_period: u8,
}

impl<HW> Er5517<HW, StateReady>
where
    HW: SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>,
{
    /// Hands the flash pins to the serial flash controller.
    pub async fn enable_serial_flash(
        &mut self,
        spi: &mut HW::Spi,
        enable: bool,
    ) -> Result<(), Error<HW::Error>> {
        self.set_bits(spi, Register::ChipConfiguration, ccr::SERIAL_FLASH, enable)
            .await
    }

    pub async fn configure_serial_flash(
        &mut self,
        spi: &mut HW::Spi,
        config: &SerialFlashConfig,
    ) -> Result<(), Error<HW::Error>> {
        self.write_register(spi, Register::SerialFlashControl, config.bits())
            .await
    }

    pub async fn select_flash_interface(
        &mut self,
        spi: &mut HW::Spi,
        interface: FlashInterface,
    ) -> Result<(), Error<HW::Error>> {
        self.set_bits(
            spi,
            Register::SerialFlashControl,
            SELECT_FLASH1,
            interface == FlashInterface::Flash1,
        )
        .await
    }

    pub async fn set_flash_mode(
        &mut self,
        spi: &mut HW::Spi,
        mode: FlashMode,
    ) -> Result<(), Error<HW::Error>> {
        self.set_bits(
            spi,
            Register::SerialFlashControl,
            DMA_MODE,
            mode == FlashMode::Dma,
        )
        .await
    }

    pub async fn set_spi_clock_period(
        &mut self,
        spi: &mut HW::Spi,
        period: u8,
    ) -> Result<(), Error<HW::Error>> {
        self.write_register(spi, Register::SpiClockPeriod, period)
            .await
    }

    pub async fn start_dma(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        self.set_bits(spi, Register::DmaControl, DMA_START, true)
            .await
    }

    pub async fn wait_dma(&mut self, spi: &mut HW::Spi) -> Result<(), Error<HW::Error>> {
        self.poll_register(spi, Register::DmaControl, PollTarget::DmaIdle, |value| {
            value & DMA_START == 0
        })
        .await?;
        Ok(())
    }

    async fn prepare_dma(
        &mut self,
        spi: &mut HW::Spi,
        interface: FlashInterface,
        memory: MemoryMode,
        clock_period: u8,
    ) -> Result<(), Error<HW::Error>> {
        self.enable_serial_flash(spi, true).await?;
        self.select_flash_interface(spi, interface).await?;
        self.set_memory_mode(spi, memory).await?;
        self.set_flash_mode(spi, FlashMode::Dma).await?;
        self.set_spi_clock_period(spi, clock_period).await
    }

    /// Copies an image block from flash onto the canvas and waits for it to land.
    pub async fn dma_block(
        &mut self,
        spi: &mut HW::Spi,
        transfer: &DmaBlock,
    ) -> Result<(), Error<HW::Error>> {
        let width = extent(transfer.size.width)?;
        let height = extent(transfer.size.height)?;
        trace!("DMA block from flash address {:#x}", transfer.source_address);
        self.prepare_dma(spi, transfer.interface, MemoryMode::Xy, transfer.clock_period)
            .await?;

        self.set_pixel_cursor(spi, transfer.destination).await?;
        self.write_point(
            spi,
            Register::DmaDestination,
            Register::DmaDestinationY,
            transfer.destination,
        )
        .await?;
        self.write_u16(spi, Register::DmaTransferSize, width).await?;
        self.write_u16(spi, Register::DmaBlockHeight, height).await?;
        self.write_u16(spi, Register::DmaSourceWidth, transfer.source_width)
            .await?;
        self.write_u32(spi, Register::DmaSourceStart, transfer.source_address)
            .await?;

        self.start_dma(spi).await?;
        self.wait_dma(spi).await
    }

    /// Copies `length` bytes from flash to an SDRAM address, then returns the canvas to block
    /// mode. The canvas is returned to block mode even when the transfer fails.
    pub async fn dma_linear(
        &mut self,
        spi: &mut HW::Spi,
        transfer: &DmaLinear,
    ) -> Result<(), Error<HW::Error>> {
        let result = self.run_dma_linear(spi, transfer).await;
        let restored = self.set_memory_mode(spi, MemoryMode::Xy).await;
        result.and(restored)
    }

    async fn run_dma_linear(
        &mut self,
        spi: &mut HW::Spi,
        transfer: &DmaLinear,
    ) -> Result<(), Error<HW::Error>> {
        trace!(
            "DMA {} bytes from flash address {:#x}",
            transfer.length,
            transfer.source_address
        );
        self.prepare_dma(
            spi,
            transfer.interface,
            MemoryMode::Linear,
            transfer.clock_period,
        )
        .await?;

        self.write_u32(spi, Register::DmaDestination, transfer.destination_address)
            .await?;
        self.write_u32(spi, Register::DmaTransferSize, transfer.length)
            .await?;
        self.write_u32(spi, Register::DmaSourceStart, transfer.source_address)
            .await?;

        self.wait_dma(spi).await?;
        self.start_dma(spi).await?;
        self.wait_dma(spi).await
    }

    /// Sets up the SPI master with its chip select released.
    pub async fn configure_spi_master(
        &mut self,
        spi: &mut HW::Spi,
        config: &SpiMasterConfig,
    ) -> Result<(), Error<HW::Error>> {
        let mut control = SpiMasterControl::empty();
        if config.chip_select == FlashInterface::Flash1 {
            control |= SpiMasterControl::SELECT_CS1;
        }
        if config.mode.polarity == Polarity::IdleHigh {
            control |= SpiMasterControl::CPOL;
        }
        if config.mode.phase == Phase::CaptureOnSecondTransition {
            control |= SpiMasterControl::CPHA;
        }
        self.write_register(spi, Register::SpiMasterControl, control.bits())
            .await?;
        self.set_spi_clock_period(spi, config.clock_period).await
    }

    /// Drives the SPI master chip select.
    pub async fn spi_master_select(
        &mut self,
        spi: &mut HW::Spi,
        active: bool,
    ) -> Result<(), Error<HW::Error>> {
        self.set_bits(
            spi,
            Register::SpiMasterControl,
            SpiMasterControl::SELECT_ACTIVE.bits(),
            active,
        )
        .await
    }

    pub async fn spi_master_status(
        &mut self,
        spi: &mut HW::Spi,
    ) -> Result<SpiMasterStatus, Error<HW::Error>> {
        let bits = self.read_register(spi, Register::SpiMasterStatus).await?;
        Ok(SpiMasterStatus::from_bits_retain(bits))
    }

    /// Clears the overflow and empty interrupt flags in `flags`.
    pub async fn clear_spi_master_flags(
        &mut self,
        spi: &mut HW::Spi,
        flags: SpiMasterStatus,
    ) -> Result<(), Error<HW::Error>> {
        let clearable = flags & (SpiMasterStatus::OVERFLOW | SpiMasterStatus::EMPTY);
        self.write_register(spi, Register::SpiMasterStatus, clearable.bits())
            .await
    }

    /// Clocks one byte out of the SPI master and returns the byte clocked in.
    pub async fn spi_master_transfer(
        &mut self,
        spi: &mut HW::Spi,
        byte: u8,
    ) -> Result<u8, Error<HW::Error>> {
        self.write_register(spi, Register::SpiMasterData, byte).await?;
        self.poll_register(
            spi,
            Register::SpiMasterStatus,
            PollTarget::SpiTxEmpty,
            |bits| SpiMasterStatus::from_bits_retain(bits).contains(SpiMasterStatus::TX_EMPTY),
        )
        .await?;
        self.poll_register(
            spi,
            Register::SpiMasterStatus,
            PollTarget::SpiRxNotEmpty,
            |bits| !SpiMasterStatus::from_bits_retain(bits).contains(SpiMasterStatus::RX_EMPTY),
        )
        .await?;
        self.read_register(spi, Register::SpiMasterData).await
    }
}
