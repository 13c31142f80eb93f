//! Borrowed framebuffer views.
//!
//! Drivers never render anything themselves: callers hand over packed bytes they already drew,
//! wrapped in a view that records which part of the panel the bytes cover.

use embedded_graphics::{
    prelude::{Point, Size},
    primitives::Rectangle,
};
use thiserror::Error as ThisError;

/// Number of bytes in a packed 1-bit-per-pixel plane. Rows are padded to a whole byte.
pub const fn packed_length(size: Size) -> usize {
    size.width.div_ceil(8) as usize * size.height as usize
}

/// Returned when a frame's byte count doesn't match its window.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[error("frame needs {expected} bytes but {actual} were given")]
pub struct FrameSizeError {
    pub expected: usize,
    pub actual: usize,
}

/// Checks that `data` is exactly as long as a packed plane for `size`.
pub fn check_length(size: Size, data: &[u8]) -> Result<(), FrameSizeError> {
    let expected = packed_length(size);
    if data.len() == expected {
        Ok(())
    } else {
        Err(FrameSizeError {
            expected,
            actual: data.len(),
        })
    }
}

/// A region of display memory split into `FRAMES` planes of `BITS` bits per pixel.
pub trait BufferView<const BITS: usize, const FRAMES: usize> {
    /// The panel area this buffer covers.
    fn window(&self) -> Rectangle;

    /// One slice per plane, in the order the panel expects them.
    fn data(&self) -> [&[u8]; FRAMES];
}

/// A single 1bpp plane. A set bit is white, a cleared bit is black.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    window: Rectangle,
    data: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Wraps `data` as the contents of `window`.
    pub fn new(window: Rectangle, data: &'a [u8]) -> Result<Self, FrameSizeError> {
        check_length(window.size, data)?;
        Ok(Self { window, data })
    }

    /// Wraps `data` as a frame anchored at the panel origin.
    pub fn full(size: Size, data: &'a [u8]) -> Result<Self, FrameSizeError> {
        Self::new(Rectangle::new(Point::zero(), size), data)
    }
}

impl BufferView<1, 1> for Frame<'_> {
    fn window(&self) -> Rectangle {
        self.window
    }

    fn data(&self) -> [&[u8]; 1] {
        [self.data]
    }
}

/// Black/white plus red planes over the same window.
///
/// The red plane is active-low: a cleared bit paints red, so `0xFF` everywhere means "no red".
#[derive(Debug, Clone, Copy)]
pub struct TriColorFrame<'a> {
    window: Rectangle,
    black_white: &'a [u8],
    red: &'a [u8],
}

impl<'a> TriColorFrame<'a> {
    pub fn new(
        window: Rectangle,
        black_white: &'a [u8],
        red: &'a [u8],
    ) -> Result<Self, FrameSizeError> {
        check_length(window.size, black_white)?;
        check_length(window.size, red)?;
        Ok(Self {
            window,
            black_white,
            red,
        })
    }

    pub fn full(size: Size, black_white: &'a [u8], red: &'a [u8]) -> Result<Self, FrameSizeError> {
        Self::new(Rectangle::new(Point::zero(), size), black_white, red)
    }

    /// The black/white plane on its own, e.g. for a partial refresh.
    pub fn black_white(&self) -> Frame<'a> {
        Frame {
            window: self.window,
            data: self.black_white,
        }
    }
}

impl BufferView<1, 2> for TriColorFrame<'_> {
    fn window(&self) -> Rectangle {
        self.window
    }

    fn data(&self) -> [&[u8]; 2] {
        [self.black_white, self.red]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_length_rounds_rows_up() {
        assert_eq!(packed_length(Size::new(8, 2)), 2);
        assert_eq!(packed_length(Size::new(9, 2)), 4);
        assert_eq!(packed_length(Size::new(792, 272)), 99 * 272);
        assert_eq!(packed_length(Size::zero()), 0);
    }

    #[test]
    fn test_frame_rejects_wrong_length() {
        let data = [0xFF; 3];
        let err = Frame::full(Size::new(16, 2), &data).unwrap_err();
        assert_eq!(
            err,
            FrameSizeError {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_frame_view_reports_window_and_data() {
        let data = [0xAA, 0x55];
        let window = Rectangle::new(Point::new(8, 4), Size::new(8, 2));
        let frame = Frame::new(window, &data).unwrap();
        assert_eq!(frame.window(), window);
        assert_eq!(frame.data(), [&data[..]]);
    }

    #[test]
    fn test_tri_color_frame_checks_both_planes() {
        let black_white = [0x00; 2];
        let red = [0xFF; 1];
        assert!(TriColorFrame::full(Size::new(8, 2), &black_white, &red).is_err());

        let red = [0xFF; 2];
        let frame = TriColorFrame::full(Size::new(8, 2), &black_white, &red).unwrap();
        assert_eq!(frame.data(), [&black_white[..], &red[..]]);
        assert_eq!(frame.black_white().data(), [&black_white[..]]);
    }
}
