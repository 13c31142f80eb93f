//! ER5517 register map.
//!
//! Multi-byte registers are little-endian and occupy consecutive addresses starting at the
//! variant's address.

use bitflags::bitflags;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// SRR. Bit 7 reconfigures the PLLs.
    SoftwareReset = 0x00,
    /// CCR. See [ccr].
    ChipConfiguration = 0x01,
    /// MACR. See [macr].
    MemoryAccessControl = 0x02,
    /// ICR. See [icr].
    InputControl = 0x03,
    /// MRWDP. Pixel and character data port.
    MemoryDataPort = 0x04,
    ScanPllControl1 = 0x05,
    ScanPllControl2 = 0x06,
    MemoryPllControl1 = 0x07,
    MemoryPllControl2 = 0x08,
    CorePllControl1 = 0x09,
    CorePllControl2 = 0x0A,
    /// MPWCTR. Main window colour depth.
    MainWindowControl = 0x10,
    /// DPCR. See [dpcr].
    DisplayConfiguration = 0x12,
    /// PCSR. See [pcsr].
    PanelSignals = 0x13,
    HorizontalWidth = 0x14,
    HorizontalWidthFine = 0x15,
    HorizontalNonDisplay = 0x16,
    HorizontalNonDisplayFine = 0x17,
    HsyncStart = 0x18,
    HsyncWidth = 0x19,
    /// 2 bytes.
    VerticalHeight = 0x1A,
    /// 2 bytes.
    VerticalNonDisplay = 0x1C,
    VsyncStart = 0x1E,
    VsyncWidth = 0x1F,
    /// 4 bytes.
    MainImageStart = 0x20,
    /// 2 bytes.
    MainImageWidth = 0x24,
    /// 2 bytes.
    MainWindowX = 0x26,
    /// 2 bytes.
    MainWindowY = 0x28,
    /// 4 bytes.
    CanvasStart = 0x50,
    /// 2 bytes.
    CanvasWidth = 0x54,
    ActiveWindowX = 0x56,
    ActiveWindowY = 0x58,
    ActiveWindowWidth = 0x5A,
    ActiveWindowHeight = 0x5C,
    /// AW_COLOR. See [aw_color].
    CanvasAddressing = 0x5E,
    PixelCursorX = 0x5F,
    PixelCursorY = 0x61,
    TextCursorX = 0x63,
    TextCursorY = 0x65,
    /// DCR0. Starts lines and triangles.
    DrawLineControl = 0x67,
    DrawStartX = 0x68,
    DrawStartY = 0x6A,
    DrawEndX = 0x6C,
    DrawEndY = 0x6E,
    DrawPoint3X = 0x70,
    DrawPoint3Y = 0x72,
    /// DCR1. Starts ellipses, curves and rectangles.
    DrawShapeControl = 0x76,
    MajorRadius = 0x77,
    MinorRadius = 0x79,
    CenterX = 0x7B,
    CenterY = 0x7D,
    PwmPrescaler = 0x84,
    PwmClockMux = 0x85,
    /// See [PwmControl].
    PwmConfiguration = 0x86,
    DeadZoneLength = 0x87,
    Timer0Compare = 0x88,
    Timer0Count = 0x8A,
    Timer1Compare = 0x8C,
    Timer1Count = 0x8E,
    BteControl0 = 0x90,
    BteControl1 = 0x91,
    BteColor = 0x92,
    Source0Start = 0x93,
    Source0Width = 0x97,
    Source0X = 0x99,
    Source0Y = 0x9B,
    /// Doubles as the S1 constant colour.
    Source1Start = 0x9D,
    Source1Width = 0xA1,
    Source1X = 0xA3,
    Source1Y = 0xA5,
    DestinationStart = 0xA7,
    DestinationWidth = 0xAB,
    DestinationX = 0xAD,
    DestinationY = 0xAF,
    BteWidth = 0xB1,
    BteHeight = 0xB3,
    AlphaBlending = 0xB5,
    /// Bit 0 starts a serial flash DMA and reads back as busy.
    DmaControl = 0xB6,
    SerialFlashControl = 0xB7,
    SpiMasterData = 0xB8,
    /// See [SpiMasterControl].
    SpiMasterControl = 0xB9,
    /// See [SpiMasterStatus].
    SpiMasterStatus = 0xBA,
    SpiClockPeriod = 0xBB,
    DmaSourceStart = 0xBC,
    /// Linear address (4 bytes), or X (2 bytes) in block mode.
    DmaDestination = 0xC0,
    /// Y in block mode.
    DmaDestinationY = 0xC2,
    /// Transfer count (4 bytes), or width (2 bytes) in block mode.
    DmaTransferSize = 0xC6,
    /// Height in block mode.
    DmaBlockHeight = 0xC8,
    DmaSourceWidth = 0xCA,
    CharacterControl0 = 0xCC,
    CharacterControl1 = 0xCD,
    LineDistance = 0xD0,
    CharacterSpacing = 0xD1,
    /// 3 bytes.
    ForegroundColor = 0xD2,
    /// 3 bytes.
    BackgroundColor = 0xD5,
    CgramStart = 0xDB,
    SdramAttributes = 0xE0,
    SdramMode = 0xE1,
    SdramRefreshInterval = 0xE2,
    SdramControl = 0xE4,
}

impl Register {
    pub const fn address(self) -> u8 {
        self as u8
    }
}

bitflags! {
    /// Status register, read with the dedicated status cycle.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        const WRITE_FIFO_FULL = 1 << 7;
        const WRITE_FIFO_EMPTY = 1 << 6;
        const READ_FIFO_FULL = 1 << 5;
        const READ_FIFO_EMPTY = 1 << 4;
        /// Drawing engine, BTE or text engine busy.
        const CORE_BUSY = 1 << 3;
        const SDRAM_READY = 1 << 2;
        /// Host access is inhibited while the controller checks itself after reset.
        const INHIBIT = 1 << 1;
        const INTERRUPT = 1 << 0;
    }
}

bitflags! {
    /// PWM configuration register (0x86).
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PwmControl: u8 {
        const PWM1_INVERT = 1 << 6;
        const PWM1_AUTO_RELOAD = 1 << 5;
        const PWM1_START = 1 << 4;
        const PWM0_DEAD_ZONE = 1 << 3;
        const PWM0_INVERT = 1 << 2;
        const PWM0_AUTO_RELOAD = 1 << 1;
        const PWM0_START = 1 << 0;
    }
}

bitflags! {
    /// SPI master control register (0xB9).
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpiMasterControl: u8 {
        const MASK_INTERRUPT = 1 << 6;
        /// Drive nSS on xnsfcs1 instead of xnsfcs0.
        const SELECT_CS1 = 1 << 5;
        const SELECT_ACTIVE = 1 << 4;
        const OVERFLOW_IRQ = 1 << 3;
        const EMPTY_IRQ = 1 << 2;
        const CPOL = 1 << 1;
        const CPHA = 1 << 0;
    }
}

bitflags! {
    /// SPI master status register (0xBA). Interrupt flags are cleared by writing them back.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpiMasterStatus: u8 {
        const TX_EMPTY = 1 << 7;
        const TX_FULL = 1 << 6;
        const RX_EMPTY = 1 << 5;
        const RX_FULL = 1 << 4;
        const OVERFLOW = 1 << 3;
        const EMPTY = 1 << 2;
    }
}

/// Chip configuration register fields.
pub mod ccr {
    pub const PLL_READY: u8 = 1 << 7;
    pub const TFT_WIDTH: u8 = 0b11 << 3;
    pub const TFT_18BIT: u8 = 0b01 << 3;
    pub const SERIAL_FLASH: u8 = 1 << 1;
    pub const HOST_BUS_16BIT: u8 = 1 << 0;
}

/// Memory access control register fields.
pub mod macr {
    pub const HOST_FORMAT: u8 = 0b11 << 6;
    pub const HOST_RGB565: u8 = 0b01 << 6;
    pub const READ_DIRECTION: u8 = 0b11 << 4;
    pub const WRITE_DIRECTION: u8 = 0b11 << 1;
}

/// Input control register fields.
pub mod icr {
    pub const TEXT_MODE: u8 = 1 << 2;
    pub const MEMORY_SELECT: u8 = 0b11;
}

/// Main window control register fields.
pub mod mpwctr {
    pub const MAIN_DEPTH: u8 = 0b11 << 2;
    pub const MAIN_16BPP: u8 = 0b01 << 2;
}

/// Display configuration register fields.
pub mod dpcr {
    pub const PCLK_FALLING: u8 = 1 << 7;
    pub const DISPLAY_ON: u8 = 1 << 6;
    pub const HSCAN_RIGHT_TO_LEFT: u8 = 1 << 4;
    pub const VSCAN_BOTTOM_TO_TOP: u8 = 1 << 3;
    pub const PIXEL_ORDER: u8 = 0b111;
}

/// Panel signal polarity register fields.
pub mod pcsr {
    pub const HSYNC_HIGH: u8 = 1 << 7;
    pub const VSYNC_HIGH: u8 = 1 << 6;
    pub const DE_LOW: u8 = 1 << 5;
}

/// Canvas addressing register fields.
pub mod aw_color {
    pub const LINEAR: u8 = 1 << 2;
    pub const CANVAS_DEPTH: u8 = 0b11;
    pub const CANVAS_16BPP: u8 = 0b01;
}
