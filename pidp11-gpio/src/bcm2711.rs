//! Register driver for the BCM2711 (Pi 4 family).
//!
//! The GPIO block is the BCM2835 one with four more pins and a new pull
//! resistor interface: instead of the code-and-strobe latch there is a
//! directly addressable 2-bit field per pin, which also reads back.
//! Everything except the pull control is delegated to [`bcm2835`].
//!
//! [`bcm2835`]: crate::bcm2835

use crate::reg::RegisterWindow;
use crate::{bcm2835, check_mask, check_pins};
use crate::{Pin, Pull, Result};

/// Pull control, pins 0-15.
pub const GPIO_PUP_PDN_CNTRL_REG0: usize = 0xE4 >> 2;
/// Pull control, pins 16-31.
pub const GPIO_PUP_PDN_CNTRL_REG1: usize = 0xE8 >> 2;
/// Pull control, pins 32-47.
pub const GPIO_PUP_PDN_CNTRL_REG2: usize = 0xEC >> 2;
/// Pull control, pins 48 and up.
pub const GPIO_PUP_PDN_CNTRL_REG3: usize = 0xF0 >> 2;

/// GPIO lines on the BCM2711.
pub(crate) const PIN_COUNT: Pin = 58;

// Up and down trade places relative to the older chips.
fn pull_code(pull: Pull) -> u32 {
    match pull {
        Pull::Off => 0,
        Pull::Up => 1,
        Pull::Down => 2,
    }
}

pub(crate) fn set_pull_pins(
    win: &RegisterWindow,
    count: Pin,
    pins: &[Pin],
    pull: Pull,
) -> Result<()> {
    check_pins(pins, count)?;
    for &pin in pins {
        let reg = GPIO_PUP_PDN_CNTRL_REG0 + usize::from(pin >> 4);
        let shift = u32::from(pin & 0xf) << 1;
        let value = (win.read(reg) & !(0b11 << shift)) | (pull_code(pull) << shift);
        win.write(reg, value);
    }
    Ok(())
}

pub(crate) fn set_pull_mask(
    win: &RegisterWindow,
    count: Pin,
    mask: u64,
    pull: Pull,
) -> Result<()> {
    check_mask(mask, count)?;
    for reg in 0..4 {
        let group = (mask >> (reg * 16)) & 0xffff;
        if group == 0 {
            continue;
        }
        let mut value = win.read(GPIO_PUP_PDN_CNTRL_REG0 + reg);
        for bit in 0..16u32 {
            if group & (1 << bit) != 0 {
                let shift = bit * 2;
                value = (value & !(0b11 << shift)) | (pull_code(pull) << shift);
            }
        }
        win.write(GPIO_PUP_PDN_CNTRL_REG0 + reg, value);
    }
    Ok(())
}

pub(crate) fn ops() -> crate::OpTable {
    crate::OpTable {
        pin_count: PIN_COUNT,
        set_pull_pins: Some(set_pull_pins),
        set_pull_mask: Some(set_pull_mask),
        ..bcm2835::ops()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcm2835::{GPFSEL5, GPPUD};
    use crate::{Error, Function};

    fn window(mem: &mut Vec<u32>) -> RegisterWindow {
        unsafe { RegisterWindow::new(mem.as_mut_ptr(), mem.len()) }.unwrap()
    }

    #[test]
    fn pull_fields_pack_two_bits_per_pin() {
        let mut mem = vec![0u32; 64];
        let win = window(&mut mem);
        set_pull_pins(&win, PIN_COUNT, &[0, 15, 16, 57], Pull::Up).unwrap();
        assert_eq!(mem[GPIO_PUP_PDN_CNTRL_REG0], 1 | 1 << 30);
        assert_eq!(mem[GPIO_PUP_PDN_CNTRL_REG1], 1);
        assert_eq!(mem[GPIO_PUP_PDN_CNTRL_REG3], 1 << 18);
        assert_eq!(mem[GPPUD], 0, "latch protocol must stay unused");
    }

    #[test]
    fn pull_codes_swap_up_and_down() {
        let mut mem = vec![0u32; 64];
        let win = window(&mut mem);
        set_pull_pins(&win, PIN_COUNT, &[2], Pull::Down).unwrap();
        set_pull_pins(&win, PIN_COUNT, &[3], Pull::Up).unwrap();
        assert_eq!(mem[GPIO_PUP_PDN_CNTRL_REG0], 0b10 << 4 | 0b01 << 6);
    }

    #[test]
    fn pull_updates_preserve_other_fields() {
        let mut mem = vec![0u32; 64];
        mem[GPIO_PUP_PDN_CNTRL_REG0] = 0b10; // pin 0 pulled down
        let win = window(&mut mem);
        set_pull_mask(&win, PIN_COUNT, 1 << 1, Pull::Up).unwrap();
        assert_eq!(mem[GPIO_PUP_PDN_CNTRL_REG0], 0b10 | 0b01 << 2);
        set_pull_mask(&win, PIN_COUNT, 1 << 1, Pull::Off).unwrap();
        assert_eq!(mem[GPIO_PUP_PDN_CNTRL_REG0], 0b10);
    }

    #[test]
    fn mask_form_matches_pin_list() {
        let mut by_list = vec![0u32; 64];
        let mut by_mask = vec![0u32; 64];
        let pins = [4, 20, 40, 57];
        let mask = crate::pins_to_mask(&pins);
        set_pull_pins(&window(&mut by_list), PIN_COUNT, &pins, Pull::Down).unwrap();
        set_pull_mask(&window(&mut by_mask), PIN_COUNT, mask, Pull::Down).unwrap();
        assert_eq!(by_list, by_mask);
    }

    #[test]
    fn four_extra_pins_are_in_range() {
        let mut mem = vec![0u32; 64];
        let win = window(&mut mem);
        bcm2835::set_function_pins(&win, PIN_COUNT, &[57], Function::Output).unwrap();
        assert_eq!(mem[GPFSEL5], 1 << 21);
        let err = bcm2835::set_function_pins(&win, PIN_COUNT, &[58], Function::Output);
        assert_eq!(err.unwrap_err(), Error::InvalidPin(58));
    }

    #[test]
    fn ops_table_carries_the_legacy_entries() {
        let table = ops();
        assert_eq!(table.pin_count, PIN_COUNT);
        assert!(table.set_function_pins.is_some());
        assert!(table.take_events.is_some());
    }
}
