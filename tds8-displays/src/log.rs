//! Crate-internal logging that follows the `defmt` and `log` cargo features.
//!
//! Firmware builds enable `defmt` and get their messages over RTT. Hosted builds, such as a
//! simulator, enable `log` instead. With neither feature the macros compile away, so arguments
//! must not carry side effects the drivers rely on.
//!
//! `warn_log!` avoids clashing with the built-in `warn` lint attribute name.

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        defmt::trace!($($arg)*);

        #[cfg(feature = "log")]
        log::trace!($($arg)*);
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)*);

        #[cfg(feature = "log")]
        log::debug!($($arg)*);
    };
}

macro_rules! info {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        defmt::info!($($arg)*);

        #[cfg(feature = "log")]
        log::info!($($arg)*);
    };
}

macro_rules! warn_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        defmt::warn!($($arg)*);

        #[cfg(feature = "log")]
        log::warn!($($arg)*);
    };
}

/// Soft-failure checks. Routed through defmt when it is enabled so the message goes out over RTT.
macro_rules! debug_assert {
    ($assertion:expr, $message:literal) => {
        #[cfg(feature = "defmt")]
        defmt::debug_assert!($assertion, $message);

        #[cfg(not(feature = "defmt"))]
        core::debug_assert!($assertion, $message);
    };
}

pub(crate) use {debug, debug_assert, info, trace, warn_log};
