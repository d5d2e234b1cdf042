//! Register driver for the RP1 (Pi 5 family).
//!
//! The RP1 moves GPIO behind a PCIe-attached I/O controller with a
//! per-pin register layout: each line has its own STATUS and CTRL pair.
//! Only level reads are wired up so far; the remaining capabilities
//! report [`Error::Unsupported`] through the device facade until they
//! grow a driver here.
//!
//! [`Error::Unsupported`]: crate::Error::Unsupported

use crate::reg::RegisterWindow;
use crate::{check_pins, Pin, Result};

/// Status register of pin 0. Each following pin is [`PIN_STRIDE`] words on.
pub const GPIO0_STATUS: usize = 0x000 >> 2;
/// Control register of pin 0.
pub const GPIO0_CTRL: usize = 0x004 >> 2;
/// Words from one pin's register pair to the next.
pub const PIN_STRIDE: usize = 2;

/// GPIO lines in the RP1's bank 0, the ones on the 40-pin header.
pub(crate) const PIN_COUNT: Pin = 28;

bitfield::bitfield! {
    /// Bit field view of a STATUS word.
    #[derive(Clone, Copy)]
    struct Status(u32);
    impl Debug;
    /// Input level after the pad's input stage.
    pub in_level, _: 23;
}

fn status(win: &RegisterWindow, pin: Pin) -> Status {
    Status(win.read(GPIO0_STATUS + usize::from(pin) * PIN_STRIDE))
}

pub(crate) fn read_pins(win: &RegisterWindow, count: Pin, pins: &[Pin]) -> Result<Vec<bool>> {
    check_pins(pins, count)?;
    Ok(pins.iter().map(|&pin| status(win, pin).in_level()).collect())
}

pub(crate) fn ops() -> crate::OpTable {
    crate::OpTable {
        pin_count: PIN_COUNT,
        read_pins: Some(read_pins),
        ..crate::OpTable::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn window(mem: &mut Vec<u32>) -> RegisterWindow {
        unsafe { RegisterWindow::new(mem.as_mut_ptr(), mem.len()) }.unwrap()
    }

    #[test]
    fn levels_come_from_each_pins_own_status_word() {
        let mut mem = vec![0u32; 64];
        mem[5 * PIN_STRIDE] = 1 << 23;
        mem[6 * PIN_STRIDE] = !(1 << 23);
        let win = window(&mut mem);
        let levels = read_pins(&win, PIN_COUNT, &[5, 6, 7]).unwrap();
        assert_eq!(levels, vec![true, false, false]);
    }

    #[test]
    fn pins_past_bank_zero_are_rejected() {
        let mut mem = vec![0u32; 64];
        let win = window(&mut mem);
        let err = read_pins(&win, PIN_COUNT, &[28]);
        assert_eq!(err.unwrap_err(), Error::InvalidPin(28));
    }

    #[test]
    fn only_level_reads_are_implemented() {
        let table = ops();
        assert!(table.read_pins.is_some());
        assert!(table.read_levels.is_none());
        assert!(table.set_function_pins.is_none());
        assert!(table.set_pull_mask.is_none());
        assert!(table.take_events.is_none());
    }
}
