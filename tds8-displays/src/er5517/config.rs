//! Board level configuration for the ER5517.
//!
//! [Config::default] matches the ER-TFT062-1 module: a 360x960 RGB panel behind a GC9503 bridge,
//! a 10 MHz crystal and 32 MB of SDRAM.

use embedded_graphics::prelude::Size;

use super::registers::{dpcr, pcsr};

/// One of the three PLLs.
///
/// The fields are stored as their raw register encodings.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PllConfig {
    /// Output divider (OD), bits 7:6 of the first control register.
    pub divider: u8,
    /// Input prescaler (R), bits 5:1 of the first control register.
    pub prescaler: u8,
    /// Feedback multiplier (N). Bit 8 shares the first control register.
    pub multiplier: u16,
}

impl PllConfig {
    pub const fn new(divider: u8, prescaler: u8, multiplier: u16) -> Self {
        Self {
            divider,
            prescaler,
            multiplier,
        }
    }

    /// Value of the first PLL control register.
    pub const fn control(&self) -> u8 {
        ((self.divider & 0b11) << 6)
            | ((self.prescaler & 0b1_1111) << 1)
            | ((self.multiplier >> 8) & 1) as u8
    }

    /// Value of the second PLL control register.
    pub const fn multiplier_low(&self) -> u8 {
        (self.multiplier & 0xFF) as u8
    }
}

/// Settings for the pixel scan, memory and core clocks.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PllSet {
    pub scan: PllConfig,
    pub memory: PllConfig,
    pub core: PllConfig,
}

impl Default for PllSet {
    fn default() -> Self {
        Self {
            scan: PllConfig::new(2, 5, 28),
            memory: PllConfig::new(2, 5, 100),
            core: PllConfig::new(2, 5, 100),
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdramConfig {
    /// Bank, row and column layout (0xE0).
    pub attributes: u8,
    /// CAS latency (0xE1).
    pub mode: u8,
    /// Auto refresh interval in memory clock cycles (0xE2/0xE3).
    pub refresh_interval: u16,
}

/// Auto refresh interval for a part that refreshes `rows` rows every `period_ms`, clocked at
/// `clock_mhz`.
///
/// `clock_mhz` must be in `1..=1000`.
pub const fn refresh_interval(period_ms: u32, rows: u32, clock_mhz: u32) -> u16 {
    let row_ns = period_ms as u64 * 1_000_000 / rows as u64;
    let clock_ns = 1000 / clock_mhz as u64;
    let cycles = (row_ns / clock_ns).saturating_sub(2);
    if cycles > u16::MAX as u64 {
        u16::MAX
    } else {
        cycles as u16
    }
}

impl Default for SdramConfig {
    fn default() -> Self {
        Self {
            attributes: 0x29,
            mode: 0x03,
            refresh_interval: refresh_interval(64, 8192, 60),
        }
    }
}

/// Panel resolution and porch timings, in pixel clocks and lines.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelTiming {
    pub width: u16,
    pub height: u16,
    pub h_back_porch: u16,
    pub h_front_porch: u16,
    pub h_sync_width: u16,
    pub v_back_porch: u16,
    pub v_front_porch: u16,
    pub v_sync_width: u16,
}

impl PanelTiming {
    pub const fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }

    /// Bytes in one full-panel layer at 16 bits per pixel.
    pub const fn layer_bytes(&self) -> u32 {
        self.width as u32 * self.height as u32 * 2
    }
}

impl Default for PanelTiming {
    fn default() -> Self {
        Self {
            width: 360,
            height: 960,
            h_back_porch: 20,
            h_front_porch: 20,
            h_sync_width: 2,
            v_back_porch: 20,
            v_front_porch: 20,
            v_sync_width: 2,
        }
    }
}

/// Encodes a horizontal timing value as `(coarse, fine)`: units of 8 pixels minus one, then the
/// remainder.
///
/// Returns `None` if the value doesn't fit the coarse register.
pub fn encode_horizontal(value: u16) -> Option<(u8, u8)> {
    if value < 8 {
        Some((0, value as u8))
    } else {
        let coarse = u8::try_from(value / 8 - 1).ok()?;
        Some((coarse, (value % 8) as u8))
    }
}

/// Encodes a vertical timing value, which the controller stores minus one.
pub fn encode_vertical(value: u16) -> Option<u16> {
    value.checked_sub(1)
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PclkEdge {
    Rising,
    Falling,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalScan {
    LeftToRight,
    RightToLeft,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalScan {
    TopToBottom,
    BottomToTop,
}

/// Order the colour channels are driven onto the panel data bus.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PixelOrder {
    Rgb = 0,
    Rbg = 1,
    Grb = 2,
    Gbr = 3,
    Brg = 4,
    Bgr = 5,
    Gray = 6,
}

/// Panel interface signal settings.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signals {
    pub pclk_edge: PclkEdge,
    pub hsync_polarity: Polarity,
    pub vsync_polarity: Polarity,
    pub de_polarity: Polarity,
    pub horizontal_scan: HorizontalScan,
    pub vertical_scan: VerticalScan,
    pub pixel_order: PixelOrder,
}

impl Signals {
    /// Bits for the display configuration register, excluding the display enable bit.
    pub(crate) fn display_configuration(&self) -> u8 {
        let mut bits = self.pixel_order as u8;
        if self.pclk_edge == PclkEdge::Falling {
            bits |= dpcr::PCLK_FALLING;
        }
        if self.horizontal_scan == HorizontalScan::RightToLeft {
            bits |= dpcr::HSCAN_RIGHT_TO_LEFT;
        }
        if self.vertical_scan == VerticalScan::BottomToTop {
            bits |= dpcr::VSCAN_BOTTOM_TO_TOP;
        }
        bits
    }

    /// Bits for the panel signal polarity register.
    pub(crate) fn polarities(&self) -> u8 {
        let mut bits = 0;
        if self.hsync_polarity == Polarity::ActiveHigh {
            bits |= pcsr::HSYNC_HIGH;
        }
        if self.vsync_polarity == Polarity::ActiveHigh {
            bits |= pcsr::VSYNC_HIGH;
        }
        if self.de_polarity == Polarity::ActiveLow {
            bits |= pcsr::DE_LOW;
        }
        bits
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self {
            pclk_edge: PclkEdge::Falling,
            hsync_polarity: Polarity::ActiveLow,
            vsync_polarity: Polarity::ActiveLow,
            de_polarity: Polarity::ActiveHigh,
            horizontal_scan: HorizontalScan::LeftToRight,
            vertical_scan: VerticalScan::BottomToTop,
            pixel_order: PixelOrder::Rgb,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub pll: PllSet,
    pub sdram: SdramConfig,
    pub panel: PanelTiming,
    pub signals: Signals,
    pub limits: Limits,
}

/// Bounds on the controller's polling loops.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Consecutive inhibited status reads during the system check before the chip is reset again.
    /// 0 never resets.
    pub reset_attempts: u8,
    /// Status reads during the system check before giving up.
    pub max_check_rounds: u16,
    /// Reads of a status bit before a wait times out.
    pub poll_limit: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            reset_attempts: 5,
            max_check_rounds: 50,
            poll_limit: 100_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plls_encode_as_expected() {
        let pll = PllSet::default();
        assert_eq!(pll.scan.control(), 0x8A);
        assert_eq!(pll.scan.multiplier_low(), 28);
        assert_eq!(pll.core.control(), 0x8A);
        assert_eq!(pll.core.multiplier_low(), 100);
    }

    #[test]
    fn test_pll_multiplier_high_bit() {
        let pll = PllConfig::new(1, 2, 0x1F0);
        assert_eq!(pll.control(), 0x40 | 0x04 | 0x01);
        assert_eq!(pll.multiplier_low(), 0xF0);
    }

    #[test]
    fn test_default_refresh_interval() {
        assert_eq!(SdramConfig::default().refresh_interval, 486);
    }

    #[test]
    fn test_long_refresh_period() {
        // 5 s over 8192 rows is 610_351 ns per row, or 38_146 cycles of 16 ns.
        assert_eq!(refresh_interval(5000, 8192, 60), 38_144);
        assert_eq!(refresh_interval(64_000, 1024, 100), u16::MAX);
    }

    #[test]
    fn test_horizontal_encoding() {
        assert_eq!(encode_horizontal(0), Some((0, 0)));
        assert_eq!(encode_horizontal(7), Some((0, 7)));
        assert_eq!(encode_horizontal(8), Some((0, 0)));
        assert_eq!(encode_horizontal(20), Some((1, 4)));
        assert_eq!(encode_horizontal(360), Some((44, 0)));
        assert_eq!(encode_horizontal(2048), Some((255, 0)));
        assert_eq!(encode_horizontal(2056), None);
    }

    #[test]
    fn test_vertical_encoding() {
        assert_eq!(encode_vertical(960), Some(959));
        assert_eq!(encode_vertical(0), None);
    }

    #[test]
    fn test_default_signal_bits() {
        let signals = Signals::default();
        assert_eq!(signals.display_configuration(), 0x80 | 0x08);
        assert_eq!(signals.polarities(), 0x00);
    }

    #[test]
    fn test_inverted_signal_bits() {
        let signals = Signals {
            pclk_edge: PclkEdge::Rising,
            hsync_polarity: Polarity::ActiveHigh,
            vsync_polarity: Polarity::ActiveHigh,
            de_polarity: Polarity::ActiveLow,
            horizontal_scan: HorizontalScan::RightToLeft,
            vertical_scan: VerticalScan::TopToBottom,
            pixel_order: PixelOrder::Bgr,
        };
        assert_eq!(signals.display_configuration(), 0x10 | 0x05);
        assert_eq!(signals.polarities(), 0xE0);
    }

    #[test]
    fn test_layer_bytes() {
        assert_eq!(PanelTiming::default().layer_bytes(), 360 * 960 * 2);
    }
}
