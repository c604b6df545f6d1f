//! Controller input
//!
//! While the panel is visible the overlay takes the primary controller and
//! the handheld controls. Each poll reads the buttons newly pressed on both,
//! OR'd together; any non-zero mask is one PIN symbol and the mask itself is
//! the symbol's code.

use crate::error::Result;

/// A controller slot the overlay reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadId {
    /// First connected controller
    Primary,
    /// Controls attached to the console
    Handheld,
}

/// Pads acquired while the panel is visible
pub const OVERLAY_PADS: [PadId; 2] = [PadId::Primary, PadId::Handheld];

/// Platform controller services
pub trait InputDevice {
    /// Take the given pads for exclusive reading
    fn acquire(&mut self, pads: &[PadId]) -> Result<()>;

    /// Buttons pressed on `pad` since the previous poll
    fn pressed(&mut self, pad: PadId) -> u64;

    /// Give the pads back
    fn release(&mut self);
}

/// Buttons newly pressed on any overlay pad
pub fn poll_mask<D: InputDevice + ?Sized>(device: &mut D) -> u64 {
    OVERLAY_PADS
        .iter()
        .fold(0, |mask, pad| mask | device.pressed(*pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FixedInput {
        masks: HashMap<PadId, u64>,
    }

    impl InputDevice for FixedInput {
        fn acquire(&mut self, _pads: &[PadId]) -> Result<()> {
            Ok(())
        }

        fn pressed(&mut self, pad: PadId) -> u64 {
            self.masks.remove(&pad).unwrap_or(0)
        }

        fn release(&mut self) {}
    }

    #[test]
    fn test_masks_are_ored() {
        let mut input = FixedInput::default();
        input.masks.insert(PadId::Primary, 0b0001);
        input.masks.insert(PadId::Handheld, 0b0100);

        assert_eq!(poll_mask(&mut input), 0b0101);
        assert_eq!(poll_mask(&mut input), 0);
    }

    #[test]
    fn test_single_pad() {
        let mut input = FixedInput::default();
        input.masks.insert(PadId::Handheld, 1 << 12);
        assert_eq!(poll_mask(&mut input), 1 << 12);
    }
}
