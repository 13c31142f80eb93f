//! Driver for the GC9503 source driver on the ER-TFT062-1 panel.
//!
//! The GC9503 only needs to be configured once after power up. Pixel data reaches it over the RGB
//! interface from the [ER5517](crate::er5517), so this driver just bit-bangs the vendor
//! initialisation sequence over the panel's 3-wire SPI port. Each 9-bit word is a D/C bit followed
//! by a byte, MSB first, clocked in on the rising edge with its own chip select.

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin, PinState};
use embedded_hal_async::delay::DelayNs;

use crate::{
    hw::{DelayHw, ErrorHw},
    log::{debug, trace},
};

/// Time the panel needs to leave sleep before the display can be switched on.
const SLEEP_OUT_MS: u32 = 120;
const DISPLAY_ON_MS: u32 = 20;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SleepIn = 0x10,
    SleepOut = 0x11,
    DisplayOff = 0x28,
    DisplayOn = 0x29,
}

impl Command {
    fn register(&self) -> u8 {
        *self as u8
    }
}

/// Gamma curve shared by all six positive and negative gamma tables.
const GAMMA: [u8; 52] = [
    0x00, 0x00, 0x00, 0x10, 0x00, 0x22, 0x00, 0x2C, 0x00, 0x2E, 0x00, 0x56, 0x00, 0x58, 0x00, 0x7C,
    0x00, 0x9A, 0x00, 0xCE, 0x00, 0xFA, 0x01, 0x4C, 0x01, 0x94, 0x01, 0x96, 0x01, 0xDA, 0x02, 0x32,
    0x02, 0x76, 0x02, 0xCC, 0x03, 0x18, 0x03, 0x55, 0x03, 0x6B, 0x03, 0x9B, 0x03, 0xAC, 0x03, 0xB8,
    0x03, 0xE0, 0x03, 0xFF,
];

/// Panel set up from the module vendor: power, timing, GOA mapping and gamma.
///
/// The first entry unlocks the manufacturer command set.
pub const INIT_SEQUENCE: &[(u8, &[u8])] = &[
    (0xF0, &[0x55, 0xAA, 0x52, 0x08, 0x00]),
    (0xF6, &[0x5A, 0x87]),
    (0xC1, &[0x3F]),
    (0xCD, &[0x25]),
    (0xC9, &[0x10]),
    (0xF8, &[0x8A]),
    (0xAC, &[0x45]),
    (0xA7, &[0x47]),
    (0xA0, &[0xCC]),
    (0x86, &[0x99, 0xA3, 0xA3, 0x31]),
    (0xFA, &[0x08, 0x08, 0x00, 0x04]),
    (0xA3, &[0x6E]),
    (0xFD, &[0x28, 0x3C, 0x00]),
    (0x9A, &[0x4A]),
    (0x9B, &[0x22]),
    (0x82, &[0x00, 0x00]),
    (0x80, &[0x54]),
    (0xB0, &[0x00, 0x25, 0x20, 0x15, 0x10]),
    (0xB1, &[0x32]),
    // 18-bit RGB.
    (0x3A, &[0x60]),
    (0x7A, &[0x0F, 0x13]),
    (0x7B, &[0x0F, 0x13]),
    (
        0x6D,
        &[
            0x0C, 0x03, 0x1E, 0x02, 0x08, 0x1A, 0x19, 0x03, 0x0D, 0x0E, 0x0F, 0x10, 0x1E, 0x1E,
            0x1E, 0x1E, 0x1E, 0x1E, 0x1E, 0x1E, 0x11, 0x12, 0x13, 0x14, 0x03, 0x19, 0x1A, 0x07,
            0x01, 0x1E, 0x03, 0x0C,
        ],
    ),
    (
        0x64,
        &[
            0x38, 0x04, 0x03, 0xC4, 0x03, 0x03, 0x38, 0x02, 0x03, 0xC6, 0x03, 0x03, 0x2C, 0x7A,
            0x2C, 0x7A,
        ],
    ),
    (
        0x65,
        &[
            0x38, 0x08, 0x03, 0xC0, 0x03, 0x03, 0x38, 0x06, 0x03, 0xC2, 0x03, 0x03, 0x2C, 0x7A,
            0x2C, 0x7A,
        ],
    ),
    (
        0x66,
        &[
            0x83, 0xD0, 0x03, 0xC4, 0x03, 0x03, 0x83, 0xD0, 0x03, 0xC4, 0x03, 0x03, 0x2C, 0x7A,
            0x2C, 0x7A,
        ],
    ),
    (0x60, &[0x38, 0x0C, 0x3C, 0x3C, 0x38, 0x0B, 0x3C, 0x3C]),
    (0x61, &[0xB3, 0xC4, 0x3C, 0x3C, 0xB3, 0xC4, 0x3C, 0x3C]),
    (0x62, &[0xB3, 0xC4, 0x3C, 0x3C, 0xB3, 0xC4, 0x3C, 0x3C]),
    (0x63, &[0x38, 0x0A, 0x3C, 0x3C, 0x38, 0x09, 0x3C, 0x3C]),
    (
        0x68,
        &[0x77, 0x08, 0x0A, 0x08, 0x09, 0x00, 0x00, 0x18, 0x0A, 0x08, 0x09, 0x00, 0x00],
    ),
    (0x69, &[0x14, 0x22, 0x14, 0x22, 0x44, 0x22, 0x08]),
    (0x6B, &[0x07]),
    (0xD1, &GAMMA),
    (0xD2, &GAMMA),
    (0xD3, &GAMMA),
    (0xD4, &GAMMA),
    (0xD5, &GAMMA),
    (0xD6, &GAMMA),
];

/// Pins for the GC9503's 3-wire SPI port, plus a delay source.
pub trait Gc9503Hw: DelayHw + ErrorHw {
    type Cs: OutputPin;
    type Clk: OutputPin;
    type Sdi: OutputPin;

    fn cs(&mut self) -> &mut Self::Cs;
    fn clk(&mut self) -> &mut Self::Clk;
    fn sdi(&mut self) -> &mut Self::Sdi;
}

/// Configures a GC9503 over bit-banged 9-bit SPI.
pub struct Gc9503<HW> {
    hw: HW,
}

impl<HW> Gc9503<HW>
where
    HW: Gc9503Hw,
    HW::Error: From<<HW::Cs as PinErrorType>::Error>
        + From<<HW::Clk as PinErrorType>::Error>
        + From<<HW::Sdi as PinErrorType>::Error>,
{
    pub fn new(hw: HW) -> Self {
        Gc9503 { hw }
    }

    /// Returns the pins and delay.
    pub fn release(self) -> HW {
        self.hw
    }

    /// Clocks out one bit on the rising edge.
    fn write_bit(&mut self, bit: bool) -> Result<(), HW::Error> {
        self.hw.clk().set_low()?;
        self.hw.sdi().set_state(PinState::from(bit))?;
        self.hw.clk().set_high()?;
        Ok(())
    }

    fn write_word(&mut self, is_data: bool, byte: u8) -> Result<(), HW::Error> {
        self.hw.cs().set_low()?;
        self.write_bit(is_data)?;
        for shift in (0..8).rev() {
            self.write_bit((byte >> shift) & 1 == 1)?;
        }
        self.hw.cs().set_high()?;
        Ok(())
    }

    pub fn write_command(&mut self, command: u8) -> Result<(), HW::Error> {
        self.write_word(false, command)
    }

    pub fn write_data(&mut self, value: u8) -> Result<(), HW::Error> {
        self.write_word(true, value)
    }

    /// Sends `command` followed by each byte of `data`.
    pub fn send(&mut self, command: u8, data: &[u8]) -> Result<(), HW::Error> {
        trace!("Sending command {:#x} with {} data bytes", command, data.len());
        self.write_command(command)?;
        for byte in data {
            self.write_data(*byte)?;
        }
        Ok(())
    }

    /// Puts the bus in its idle state, loads [INIT_SEQUENCE] and switches the display on.
    pub async fn init(&mut self) -> Result<(), HW::Error> {
        debug!("Initialising GC9503");
        self.hw.cs().set_high()?;
        self.hw.clk().set_low()?;
        self.hw.sdi().set_low()?;

        for (command, data) in INIT_SEQUENCE {
            self.send(*command, data)?;
        }

        self.sleep_out().await?;
        self.display_on().await
    }

    pub async fn sleep_in(&mut self) -> Result<(), HW::Error> {
        self.write_command(Command::SleepIn.register())
    }

    pub async fn sleep_out(&mut self) -> Result<(), HW::Error> {
        self.write_command(Command::SleepOut.register())?;
        self.hw.delay().delay_ms(SLEEP_OUT_MS).await;
        Ok(())
    }

    pub async fn display_on(&mut self) -> Result<(), HW::Error> {
        self.write_command(Command::DisplayOn.register())?;
        self.hw.delay().delay_ms(DISPLAY_ON_MS).await;
        Ok(())
    }

    pub async fn display_off(&mut self) -> Result<(), HW::Error> {
        self.write_command(Command::DisplayOff.register())
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        digital::{Mock as PinMock, State, Transaction as PinTransaction},
    };

    use super::*;
    use crate::test_support::{run, TestError};

    struct TestHw {
        cs: PinMock,
        clk: PinMock,
        sdi: PinMock,
        delay: NoopDelay,
    }

    impl ErrorHw for TestHw {
        type Error = TestError;
    }

    impl DelayHw for TestHw {
        type Delay = NoopDelay;

        fn delay(&mut self) -> &mut Self::Delay {
            &mut self.delay
        }
    }

    impl Gc9503Hw for TestHw {
        type Cs = PinMock;
        type Clk = PinMock;
        type Sdi = PinMock;

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

    fn level(high: bool) -> State {
        if high {
            State::High
        } else {
            State::Low
        }
    }

    /// Expected pin traffic for a sequence of 9-bit words.
    #[derive(Default)]
    struct Wire {
        cs: Vec<PinTransaction>,
        clk: Vec<PinTransaction>,
        sdi: Vec<PinTransaction>,
    }

    impl Wire {
        fn idle(&mut self) -> &mut Self {
            self.cs.push(PinTransaction::set(State::High));
            self.clk.push(PinTransaction::set(State::Low));
            self.sdi.push(PinTransaction::set(State::Low));
            self
        }

        fn word(&mut self, is_data: bool, byte: u8) -> &mut Self {
            self.cs.push(PinTransaction::set(State::Low));
            let bits = core::iter::once(is_data).chain((0..8).rev().map(|s| (byte >> s) & 1 == 1));
            for bit in bits {
                self.clk.push(PinTransaction::set(State::Low));
                self.sdi.push(PinTransaction::set(level(bit)));
                self.clk.push(PinTransaction::set(State::High));
            }
            self.cs.push(PinTransaction::set(State::High));
            self
        }

        fn send(&mut self, command: u8, data: &[u8]) -> &mut Self {
            self.word(false, command);
            for byte in data {
                self.word(true, *byte);
            }
            self
        }

        fn start(&self) -> Gc9503<TestHw> {
            Gc9503::new(TestHw {
                cs: PinMock::new(&self.cs),
                clk: PinMock::new(&self.clk),
                sdi: PinMock::new(&self.sdi),
                delay: NoopDelay,
            })
        }
    }

    fn done(driver: Gc9503<TestHw>) {
        let mut hw = driver.release();
        hw.cs.done();
        hw.clk.done();
        hw.sdi.done();
    }

    #[test]
    fn test_command_word_framing() {
        let edge = PinTransaction::set;
        let cs = [edge(State::Low), edge(State::High)];
        let clk: Vec<_> = (0..9)
            .flat_map(|_| [edge(State::Low), edge(State::High)])
            .collect();
        // D/C = 0, then 0x29 = 0b0010_1001.
        let sdi: Vec<_> = [0, 0, 0, 1, 0, 1, 0, 0, 1]
            .iter()
            .map(|bit| PinTransaction::set(level(*bit == 1)))
            .collect();

        let mut gc = Gc9503::new(TestHw {
            cs: PinMock::new(&cs),
            clk: PinMock::new(&clk),
            sdi: PinMock::new(&sdi),
            delay: NoopDelay,
        });
        run(gc.display_on());

        done(gc);
    }

    #[test]
    fn test_data_words_set_dc_bit() {
        let mut wire = Wire::default();
        wire.send(0xF6, &[0x5A, 0x87]);
        let mut gc = wire.start();

        gc.send(0xF6, &[0x5A, 0x87])
            .unwrap_or_else(|e| panic!("send failed: {}", e.0));

        done(gc);
    }

    #[test]
    fn test_init_streams_vendor_table() {
        let mut wire = Wire::default();
        wire.idle();
        for (command, data) in INIT_SEQUENCE {
            wire.send(*command, data);
        }
        wire.send(0x11, &[]).send(0x29, &[]);
        let mut gc = wire.start();

        run(gc.init());

        done(gc);
    }

    #[test]
    fn test_init_table_shape() {
        assert_eq!(INIT_SEQUENCE.len(), 39);
        assert_eq!(INIT_SEQUENCE[0], (0xF0, &[0x55, 0xAA, 0x52, 0x08, 0x00][..]));
        let gamma: Vec<_> = INIT_SEQUENCE
            .iter()
            .filter(|(command, _)| (0xD1..=0xD6).contains(command))
            .collect();
        assert_eq!(gamma.len(), 6);
        assert!(gamma.iter().all(|(_, data)| data.len() == 52));
    }

    #[test]
    fn test_sleep_and_display_off() {
        let mut wire = Wire::default();
        wire.send(0x28, &[]).send(0x10, &[]);
        let mut gc = wire.start();

        run(gc.display_off());
        run(gc.sleep_in());

        done(gc);
    }
}
