//! Shared helpers for the mock-based driver tests.

use std::{format, string::String, vec::Vec};

use embassy_futures::block_on;
use embedded_hal_mock::eh1::{
    digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction},
    spi::Transaction as SpiTransaction,
};

/// Error type for test boards. Any `Debug` error converts into it.
///
/// It deliberately has no `Debug` impl so that the blanket `From` doesn't overlap with
/// `From<T> for T`.
pub struct TestError(pub String);

impl<E: core::fmt::Debug> From<E> for TestError {
    fn from(e: E) -> Self {
        TestError(format!("{e:?}"))
    }
}

/// Errors a test can report when an operation fails unexpectedly.
pub trait Failure {
    fn message(self) -> String;
}

impl Failure for TestError {
    fn message(self) -> String {
        self.0
    }
}

/// Drives `future` to completion and panics with the error message on failure.
pub fn run<T, E, F>(future: F) -> T
where
    F: core::future::Future<Output = Result<T, E>>,
    E: Failure,
{
    match block_on(future) {
        Ok(value) => value,
        Err(e) => panic!("operation failed: {}", e.message()),
    }
}

/// The three expectations produced by one `SpiDevice::write`.
pub fn spi_write(data: &[u8]) -> [SpiTransaction<u8>; 3] {
    [
        SpiTransaction::transaction_start(),
        SpiTransaction::write_vec(data.to_vec()),
        SpiTransaction::transaction_end(),
    ]
}

/// The four expectations produced by a write-then-read `SpiDevice::transaction`.
pub fn spi_write_read(write: &[u8], read: &[u8]) -> [SpiTransaction<u8>; 4] {
    [
        SpiTransaction::transaction_start(),
        SpiTransaction::write_vec(write.to_vec()),
        SpiTransaction::read_vec(read.to_vec()),
        SpiTransaction::transaction_end(),
    ]
}

pub fn idle_pin() -> PinMock {
    PinMock::new(&[])
}

/// A reset line that is pulsed low then released.
pub fn reset_pulse() -> Vec<PinTransaction> {
    Vec::from([
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
    ])
}
