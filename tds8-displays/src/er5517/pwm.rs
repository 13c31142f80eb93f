//! The two PWM timers. PWM1 drives the panel backlight on the ER-TFT062-1.
//!
//! Each timer counts down from its count buffer and toggles its output when it passes the compare
//! buffer, so the duty cycle is `compare / count`.

use embedded_hal::spi::ErrorType as SpiErrorType;

use super::{
    registers::{PwmControl, Register},
    Er5517, Error, StateReady,
};
use crate::{
    hw::{ErrorHw, SpiHw},
    log::debug,
};

const PWM1_DIVIDER: u8 = 0b11 << 6;
const PWM0_DIVIDER: u8 = 0b11 << 4;
const PWM1_FUNCTION: u8 = 0b11 << 2;
const PWM0_FUNCTION: u8 = 0b11;

const BACKLIGHT_PRESCALER: u16 = 20;
const BACKLIGHT_PERIOD: u16 = 100;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Pwm0,
    Pwm1,
}

/// Divides the prescaled core clock before it reaches a timer.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClockDivider {
    By1 = 0,
    By2 = 1,
    By4 = 2,
    By8 = 3,
}

/// What the PWM0 pin outputs.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Pwm0Pin {
    GpioC7 = 0,
    Pwm = 2,
    CoreClock = 3,
}

/// What the PWM1 pin outputs.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Pwm1Pin {
    ErrorFlag = 0,
    Pwm = 2,
    OscillatorClock = 3,
}

/// Everything needed to start a timer in PWM mode.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmConfig {
    /// Shared by both timers, in `1..=256`.
    pub prescaler: u16,
    pub divider: ClockDivider,
    pub count: u16,
    pub compare: u16,
    pub invert: bool,
    pub auto_reload: bool,
}

impl Timer {
    fn start_bit(self) -> PwmControl {
        match self {
            Timer::Pwm0 => PwmControl::PWM0_START,
            Timer::Pwm1 => PwmControl::PWM1_START,
        }
    }

    fn invert_bit(self) -> PwmControl {
        match self {
            Timer::Pwm0 => PwmControl::PWM0_INVERT,
            Timer::Pwm1 => PwmControl::PWM1_INVERT,
        }
    }

    fn auto_reload_bit(self) -> PwmControl {
        match self {
            Timer::Pwm0 => PwmControl::PWM0_AUTO_RELOAD,
            Timer::Pwm1 => PwmControl::PWM1_AUTO_RELOAD,
        }
    }
}

impl<HW> Er5517<HW, StateReady>
where
    HW: SpiHw + ErrorHw,
    HW::Error: From<<HW::Spi as SpiErrorType>::Error>,
{
    async fn set_pwm_control(
        &mut self,
        spi: &mut HW::Spi,
        bits: PwmControl,
        enable: bool,
    ) -> Result<(), Error<HW::Error>> {
        self.set_bits(spi, Register::PwmConfiguration, bits.bits(), enable)
            .await
    }

    /// Sets the core clock prescaler shared by both timers. Accepts `1..=256`.
    pub async fn set_pwm_prescaler(
        &mut self,
        spi: &mut HW::Spi,
        prescaler: u16,
    ) -> Result<(), Error<HW::Error>> {
        let value = prescaler
            .checked_sub(1)
            .and_then(|v| u8::try_from(v).ok())
            .ok_or(Error::OutOfRange)?;
        self.write_register(spi, Register::PwmPrescaler, value).await
    }

    pub async fn set_pwm_clock_divider(
        &mut self,
        spi: &mut HW::Spi,
        timer: Timer,
        divider: ClockDivider,
    ) -> Result<(), Error<HW::Error>> {
        let (mask, bits) = match timer {
            Timer::Pwm0 => (PWM0_DIVIDER, (divider as u8) << 4),
            Timer::Pwm1 => (PWM1_DIVIDER, (divider as u8) << 6),
        };
        self.update_register(spi, Register::PwmClockMux, mask, bits)
            .await
    }

    pub async fn set_pwm0_pin(
        &mut self,
        spi: &mut HW::Spi,
        function: Pwm0Pin,
    ) -> Result<(), Error<HW::Error>> {
        self.update_register(spi, Register::PwmClockMux, PWM0_FUNCTION, function as u8)
            .await
    }

    pub async fn set_pwm1_pin(
        &mut self,
        spi: &mut HW::Spi,
        function: Pwm1Pin,
    ) -> Result<(), Error<HW::Error>> {
        self.update_register(
            spi,
            Register::PwmClockMux,
            PWM1_FUNCTION,
            (function as u8) << 2,
        )
        .await
    }

    pub async fn set_pwm_inverter(
        &mut self,
        spi: &mut HW::Spi,
        timer: Timer,
        invert: bool,
    ) -> Result<(), Error<HW::Error>> {
        self.set_pwm_control(spi, timer.invert_bit(), invert).await
    }

    /// Auto reload restarts the timer from its count buffer. Without it the timer is one-shot.
    pub async fn set_pwm_auto_reload(
        &mut self,
        spi: &mut HW::Spi,
        timer: Timer,
        auto_reload: bool,
    ) -> Result<(), Error<HW::Error>> {
        self.set_pwm_control(spi, timer.auto_reload_bit(), auto_reload)
            .await
    }

    pub async fn start_pwm(
        &mut self,
        spi: &mut HW::Spi,
        timer: Timer,
    ) -> Result<(), Error<HW::Error>> {
        self.set_pwm_control(spi, timer.start_bit(), true).await
    }

    pub async fn stop_pwm(
        &mut self,
        spi: &mut HW::Spi,
        timer: Timer,
    ) -> Result<(), Error<HW::Error>> {
        self.set_pwm_control(spi, timer.start_bit(), false).await
    }

    /// Inserts dead time between PWM0 and its complement.
    pub async fn set_pwm0_dead_zone(
        &mut self,
        spi: &mut HW::Spi,
        enable: bool,
    ) -> Result<(), Error<HW::Error>> {
        self.set_pwm_control(spi, PwmControl::PWM0_DEAD_ZONE, enable)
            .await
    }

    pub async fn set_dead_zone_length(
        &mut self,
        spi: &mut HW::Spi,
        length: u8,
    ) -> Result<(), Error<HW::Error>> {
        self.write_register(spi, Register::DeadZoneLength, length)
            .await
    }

    pub async fn set_timer_compare(
        &mut self,
        spi: &mut HW::Spi,
        timer: Timer,
        compare: u16,
    ) -> Result<(), Error<HW::Error>> {
        let register = match timer {
            Timer::Pwm0 => Register::Timer0Compare,
            Timer::Pwm1 => Register::Timer1Compare,
        };
        self.write_u16(spi, register, compare).await
    }

    pub async fn set_timer_count(
        &mut self,
        spi: &mut HW::Spi,
        timer: Timer,
        count: u16,
    ) -> Result<(), Error<HW::Error>> {
        let register = match timer {
            Timer::Pwm0 => Register::Timer0Count,
            Timer::Pwm1 => Register::Timer1Count,
        };
        self.write_u16(spi, register, count).await
    }

    /// Routes `timer` to its pin and starts it with `config`.
    pub async fn configure_pwm(
        &mut self,
        spi: &mut HW::Spi,
        timer: Timer,
        config: &PwmConfig,
    ) -> Result<(), Error<HW::Error>> {
        self.set_pwm_prescaler(spi, config.prescaler).await?;
        self.set_pwm_clock_divider(spi, timer, config.divider)
            .await?;
        match timer {
            Timer::Pwm0 => self.set_pwm0_pin(spi, Pwm0Pin::Pwm).await?,
            Timer::Pwm1 => self.set_pwm1_pin(spi, Pwm1Pin::Pwm).await?,
        }
        self.set_timer_count(spi, timer, config.count).await?;
        self.set_timer_compare(spi, timer, config.compare).await?;
        self.set_pwm_inverter(spi, timer, config.invert).await?;
        self.set_pwm_auto_reload(spi, timer, config.auto_reload)
            .await?;
        self.start_pwm(spi, timer).await
    }

    /// Sets the backlight brightness in percent. Values above 100 are treated as 100.
    pub async fn set_backlight(
        &mut self,
        spi: &mut HW::Spi,
        percent: u8,
    ) -> Result<(), Error<HW::Error>> {
        let compare = (percent as u16).min(BACKLIGHT_PERIOD);
        debug!("Setting backlight to {}%", compare);
        let config = PwmConfig {
            prescaler: BACKLIGHT_PRESCALER,
            divider: ClockDivider::By1,
            count: BACKLIGHT_PERIOD,
            compare,
            invert: false,
            auto_reload: true,
        };
        self.configure_pwm(spi, Timer::Pwm1, &config).await
    }
}
