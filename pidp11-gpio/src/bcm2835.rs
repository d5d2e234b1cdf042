//! Register driver for the BCM2835 family (Pi 1 through Pi 3).
//!
//! The BCM2837 carries the identical GPIO block, so [`Chip::Bcm2837`]
//! shares this driver. The BCM2711 reuses everything here except the
//! pull resistor control, which it replaces with direct registers.
//!
//! All register constants are word offsets into the GPIO block.
//!
//! [`Chip::Bcm2837`]: crate::Chip::Bcm2837

use std::thread;
use std::time::Duration;

use log::trace;

use crate::reg::RegisterWindow;
use crate::{check_mask, check_pins, valid_mask};
use crate::{Detect, Function, Pin, Pull, Result};

/// Function select 0, pins 0-9.
pub const GPFSEL0: usize = 0x00 >> 2;
/// Function select 1, pins 10-19.
pub const GPFSEL1: usize = 0x04 >> 2;
/// Function select 2, pins 20-29.
pub const GPFSEL2: usize = 0x08 >> 2;
/// Function select 3, pins 30-39.
pub const GPFSEL3: usize = 0x0C >> 2;
/// Function select 4, pins 40-49.
pub const GPFSEL4: usize = 0x10 >> 2;
/// Function select 5, pins 50 and up.
pub const GPFSEL5: usize = 0x14 >> 2;
/// Output set, pins 0-31.
pub const GPSET0: usize = 0x1C >> 2;
/// Output set, pins 32 and up.
pub const GPSET1: usize = 0x20 >> 2;
/// Output clear, pins 0-31.
pub const GPCLR0: usize = 0x28 >> 2;
/// Output clear, pins 32 and up.
pub const GPCLR1: usize = 0x2C >> 2;
/// Input level, pins 0-31.
pub const GPLEV0: usize = 0x34 >> 2;
/// Input level, pins 32 and up.
pub const GPLEV1: usize = 0x38 >> 2;
/// Event detect status, pins 0-31.
pub const GPEDS0: usize = 0x40 >> 2;
/// Event detect status, pins 32 and up.
pub const GPEDS1: usize = 0x44 >> 2;
/// Rising edge detect enable, pins 0-31.
pub const GPREN0: usize = 0x4C >> 2;
/// Rising edge detect enable, pins 32 and up.
pub const GPREN1: usize = 0x50 >> 2;
/// Falling edge detect enable, pins 0-31.
pub const GPFEN0: usize = 0x48 >> 2;
/// Falling edge detect enable, pins 32 and up.
pub const GPFEN1: usize = 0x5C >> 2;
/// High level detect enable, pins 0-31.
pub const GPHEN0: usize = 0x64 >> 2;
/// High level detect enable, pins 32 and up.
pub const GPHEN1: usize = 0x68 >> 2;
/// Low level detect enable, pins 0-31.
pub const GPLEN0: usize = 0x70 >> 2;
/// Low level detect enable, pins 32 and up.
pub const GPLEN1: usize = 0x74 >> 2;
/// Asynchronous rising edge detect enable, pins 0-31.
pub const GPAREN0: usize = 0x7C >> 2;
/// Asynchronous rising edge detect enable, pins 32 and up.
pub const GPAREN1: usize = 0x80 >> 2;
/// Asynchronous falling edge detect enable, pins 0-31.
pub const GPAFEN0: usize = 0x88 >> 2;
/// Asynchronous falling edge detect enable, pins 32 and up.
pub const GPAFEN1: usize = 0x8C >> 2;
/// Pull resistor code latch.
pub const GPPUD: usize = 0x94 >> 2;
/// Pull latch clock, pins 0-31.
pub const GPPUDCLK0: usize = 0x98 >> 2;
/// Pull latch clock, pins 32 and up.
pub const GPPUDCLK1: usize = 0x9C >> 2;

/// GPIO lines on the BCM2835/BCM2837.
pub(crate) const PIN_COUNT: Pin = 54;

/// Hold time between steps of the pull latch protocol.
const LATCH_SETTLE: Duration = Duration::from_micros(10);

/// Enable register pair per detect kind, in [`Detect`] bit order.
const DETECT_REGS: [(usize, usize); 6] = [
    (GPREN0, GPREN1),
    (GPFEN0, GPFEN1),
    (GPHEN0, GPHEN1),
    (GPLEN0, GPLEN1),
    (GPAREN0, GPAREN1),
    (GPAFEN0, GPAFEN1),
];

fn detect_selected(detect: Detect) -> [bool; 6] {
    [
        detect.rising(),
        detect.falling(),
        detect.level_high(),
        detect.level_low(),
        detect.async_rising(),
        detect.async_falling(),
    ]
}

/// Function select registers needed to cover `count` pins.
fn fsel_regs(count: Pin) -> usize {
    (usize::from(count) + 9) / 10
}

fn pull_code(pull: Pull) -> u32 {
    match pull {
        Pull::Off => 0,
        Pull::Down => 1,
        Pull::Up => 2,
    }
}

/// Route the listed pins to `function`, full width: all function
/// registers are read, merged, and written back in one pass.
pub(crate) fn set_function_pins(
    win: &RegisterWindow,
    count: Pin,
    pins: &[Pin],
    function: Function,
) -> Result<()> {
    check_pins(pins, count)?;
    let regs = fsel_regs(count);
    let mut fsel = [0u32; 6];
    for (i, value) in fsel.iter_mut().enumerate().take(regs) {
        *value = win.read(GPFSEL0 + i);
    }
    for &pin in pins {
        let reg = usize::from(pin / 10);
        let shift = u32::from(pin % 10) * 3;
        fsel[reg] = (fsel[reg] & !(0b111 << shift)) | (function.code() << shift);
    }
    for (i, value) in fsel.iter().enumerate().take(regs) {
        win.write(GPFSEL0 + i, *value);
    }
    Ok(())
}

/// Route every pin in `mask` to `function`, touching only the function
/// registers that carry a masked pin.
pub(crate) fn set_function_mask(
    win: &RegisterWindow,
    count: Pin,
    mask: u64,
    function: Function,
) -> Result<()> {
    check_mask(mask, count)?;
    for reg in 0..fsel_regs(count) {
        let group = (mask >> (reg * 10)) & 0x3ff;
        if group == 0 {
            continue;
        }
        let mut value = win.read(GPFSEL0 + reg);
        for bit in 0..10u32 {
            if group & (1 << bit) != 0 {
                let shift = bit * 3;
                value = (value & !(0b111 << shift)) | (function.code() << shift);
            }
        }
        win.write(GPFSEL0 + reg, value);
    }
    Ok(())
}

pub(crate) fn get_function_pins(
    win: &RegisterWindow,
    count: Pin,
    pins: &[Pin],
) -> Result<Vec<Function>> {
    check_pins(pins, count)?;
    Ok(pins
        .iter()
        .map(|&pin| {
            let value = win.read(GPFSEL0 + usize::from(pin / 10));
            Function::from_code(value >> (u32::from(pin % 10) * 3))
        })
        .collect())
}

/// Latch a pull state onto all pins in `mask`.
///
/// The latch protocol holds the code on `GPPUD` while `GPPUDCLK` strobes
/// the addressed pins, with a settle time between every step, so one
/// call takes around 40us of wall time.
pub(crate) fn set_pull_mask(
    win: &RegisterWindow,
    count: Pin,
    mask: u64,
    pull: Pull,
) -> Result<()> {
    check_mask(mask, count)?;
    trace!("latching pull {pull:?} onto {mask:#x}");
    win.write(GPPUD, pull_code(pull));
    thread::sleep(LATCH_SETTLE);
    win.write(GPPUDCLK0, mask as u32);
    win.write(GPPUDCLK1, (mask >> 32) as u32);
    thread::sleep(LATCH_SETTLE);
    win.write(GPPUD, 0);
    thread::sleep(LATCH_SETTLE);
    win.write(GPPUDCLK0, 0);
    win.write(GPPUDCLK1, 0);
    thread::sleep(LATCH_SETTLE);
    Ok(())
}

pub(crate) fn set_pull_pins(
    win: &RegisterWindow,
    count: Pin,
    pins: &[Pin],
    pull: Pull,
) -> Result<()> {
    check_pins(pins, count)?;
    set_pull_mask(win, count, crate::pins_to_mask(pins), pull)
}

pub(crate) fn write_mask(win: &RegisterWindow, count: Pin, mask: u64, high: bool) -> Result<()> {
    check_mask(mask, count)?;
    let (low_reg, high_reg) = if high {
        (GPSET0, GPSET1)
    } else {
        (GPCLR0, GPCLR1)
    };
    win.write(low_reg, mask as u32);
    win.write(high_reg, (mask >> 32) as u32);
    Ok(())
}

pub(crate) fn write_pins(win: &RegisterWindow, count: Pin, pins: &[Pin], high: bool) -> Result<()> {
    check_pins(pins, count)?;
    write_mask(win, count, crate::pins_to_mask(pins), high)
}

pub(crate) fn read_levels(win: &RegisterWindow, count: Pin) -> Result<u64> {
    let levels = u64::from(win.read(GPLEV0)) | u64::from(win.read(GPLEV1)) << 32;
    Ok(levels & valid_mask(count))
}

pub(crate) fn read_pins(win: &RegisterWindow, count: Pin, pins: &[Pin]) -> Result<Vec<bool>> {
    check_pins(pins, count)?;
    let levels = read_levels(win, count)?;
    Ok(pins.iter().map(|&pin| levels & (1 << pin) != 0).collect())
}

pub(crate) fn enable_detect_mask(
    win: &RegisterWindow,
    count: Pin,
    mask: u64,
    detect: Detect,
) -> Result<()> {
    check_mask(mask, count)?;
    let selected = detect_selected(detect);
    for (kind, (low_reg, high_reg)) in DETECT_REGS.into_iter().enumerate() {
        if selected[kind] {
            win.write(low_reg, win.read(low_reg) | mask as u32);
            win.write(high_reg, win.read(high_reg) | (mask >> 32) as u32);
        }
    }
    Ok(())
}

pub(crate) fn disable_detect_mask(
    win: &RegisterWindow,
    count: Pin,
    mask: u64,
    detect: Detect,
) -> Result<()> {
    check_mask(mask, count)?;
    let selected = detect_selected(detect);
    for (kind, (low_reg, high_reg)) in DETECT_REGS.into_iter().enumerate() {
        if selected[kind] {
            win.write(low_reg, win.read(low_reg) & !(mask as u32));
            win.write(high_reg, win.read(high_reg) & !((mask >> 32) as u32));
        }
    }
    Ok(())
}

pub(crate) fn enable_detect_pins(
    win: &RegisterWindow,
    count: Pin,
    pins: &[Pin],
    detect: Detect,
) -> Result<()> {
    check_pins(pins, count)?;
    enable_detect_mask(win, count, crate::pins_to_mask(pins), detect)
}

pub(crate) fn disable_detect_pins(
    win: &RegisterWindow,
    count: Pin,
    pins: &[Pin],
    detect: Detect,
) -> Result<()> {
    check_pins(pins, count)?;
    disable_detect_mask(win, count, crate::pins_to_mask(pins), detect)
}

pub(crate) fn get_detect_pins(
    win: &RegisterWindow,
    count: Pin,
    pins: &[Pin],
) -> Result<Vec<Detect>> {
    check_pins(pins, count)?;
    let enabled: Vec<u64> = DETECT_REGS
        .into_iter()
        .map(|(low_reg, high_reg)| {
            u64::from(win.read(low_reg)) | u64::from(win.read(high_reg)) << 32
        })
        .collect();
    Ok(pins
        .iter()
        .map(|&pin| {
            let bit = 1u64 << pin;
            let mut detect = Detect::default();
            detect.set_rising(enabled[0] & bit != 0);
            detect.set_falling(enabled[1] & bit != 0);
            detect.set_level_high(enabled[2] & bit != 0);
            detect.set_level_low(enabled[3] & bit != 0);
            detect.set_async_rising(enabled[4] & bit != 0);
            detect.set_async_falling(enabled[5] & bit != 0);
            detect
        })
        .collect())
}

/// Read pending events for all pins and acknowledge them in one go.
pub(crate) fn take_events(win: &RegisterWindow, count: Pin) -> Result<u64> {
    let valid = valid_mask(count);
    let events = u64::from(win.read(GPEDS0)) | u64::from(win.read(GPEDS1)) << 32;
    win.write(GPEDS0, valid as u32);
    win.write(GPEDS1, (valid >> 32) as u32);
    Ok(events & valid)
}

pub(crate) fn ops() -> crate::OpTable {
    crate::OpTable {
        pin_count: PIN_COUNT,
        set_function_pins: Some(set_function_pins),
        set_function_mask: Some(set_function_mask),
        get_function_pins: Some(get_function_pins),
        set_pull_pins: Some(set_pull_pins),
        set_pull_mask: Some(set_pull_mask),
        write_pins: Some(write_pins),
        write_mask: Some(write_mask),
        read_pins: Some(read_pins),
        read_levels: Some(read_levels),
        enable_detect_pins: Some(enable_detect_pins),
        enable_detect_mask: Some(enable_detect_mask),
        disable_detect_pins: Some(disable_detect_pins),
        disable_detect_mask: Some(disable_detect_mask),
        get_detect_pins: Some(get_detect_pins),
        take_events: Some(take_events),
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
    fn function_select_packs_three_bits_per_pin() {
        let mut mem = vec![0u32; 64];
        let win = window(&mut mem);
        set_function_pins(&win, PIN_COUNT, &[0, 9, 10, 53], Function::Output).unwrap();
        assert_eq!(mem[GPFSEL0], 1 | 1 << 27);
        assert_eq!(mem[GPFSEL1], 1);
        assert_eq!(mem[GPFSEL5], 1 << 9);
    }

    #[test]
    fn function_select_preserves_neighboring_fields() {
        let mut mem = vec![0u32; 64];
        mem[GPFSEL0] = 0b111 << 3; // pin 1 on an alternate function
        let win = window(&mut mem);
        set_function_pins(&win, PIN_COUNT, &[0, 2], Function::Output).unwrap();
        assert_eq!(mem[GPFSEL0], 1 | 0b111 << 3 | 1 << 6);
    }

    #[test]
    fn function_mask_matches_pin_list() {
        let mut by_list = vec![0u32; 64];
        let mut by_mask = vec![0u32; 64];
        let pins = [4, 17, 32, 53];
        let mask = crate::pins_to_mask(&pins);
        set_function_pins(&window(&mut by_list), PIN_COUNT, &pins, Function::Alt3).unwrap();
        set_function_mask(&window(&mut by_mask), PIN_COUNT, mask, Function::Alt3).unwrap();
        assert_eq!(by_list, by_mask);
    }

    #[test]
    fn function_read_back_decodes_fields() {
        let mut mem = vec![0u32; 64];
        let win = window(&mut mem);
        set_function_pins(&win, PIN_COUNT, &[13], Function::Alt2).unwrap();
        set_function_pins(&win, PIN_COUNT, &[14], Function::Output).unwrap();
        let functions = get_function_pins(&win, PIN_COUNT, &[13, 14, 15]).unwrap();
        assert_eq!(functions, vec![Function::Alt2, Function::Output, Function::Input]);
    }

    #[test]
    fn invalid_pin_is_rejected_before_any_write() {
        let mut mem = vec![0u32; 64];
        let win = window(&mut mem);
        let err = set_function_pins(&win, PIN_COUNT, &[3, 54], Function::Output);
        assert_eq!(err.unwrap_err(), Error::InvalidPin(54));
        assert!(mem.iter().all(|&word| word == 0));
    }

    #[test]
    fn invalid_mask_reports_the_lowest_bad_pin() {
        let mut mem = vec![0u32; 64];
        let win = window(&mut mem);
        let err = write_mask(&win, PIN_COUNT, 1 << 54 | 1 << 60, true);
        assert_eq!(err.unwrap_err(), Error::InvalidPin(54));
        assert!(mem.iter().all(|&word| word == 0));
    }

    #[test]
    fn writes_split_across_the_set_and_clear_banks() {
        let mut mem = vec![0u32; 64];
        let win = window(&mut mem);
        write_mask(&win, PIN_COUNT, 1 | 1 << 33, true).unwrap();
        assert_eq!(mem[GPSET0], 1);
        assert_eq!(mem[GPSET1], 2);
        write_mask(&win, PIN_COUNT, 1 << 31 | 1 << 32, false).unwrap();
        assert_eq!(mem[GPCLR0], 1 << 31);
        assert_eq!(mem[GPCLR1], 1);
    }

    #[test]
    fn levels_mask_off_lines_past_the_pin_count() {
        let mut mem = vec![0u32; 64];
        mem[GPLEV0] = !0;
        mem[GPLEV1] = !0;
        let win = window(&mut mem);
        assert_eq!(read_levels(&win, PIN_COUNT).unwrap(), (1 << 54) - 1);
    }

    #[test]
    fn read_pins_indexes_the_level_word() {
        let mut mem = vec![0u32; 64];
        mem[GPLEV0] = 1 << 2;
        mem[GPLEV1] = 1 << 8; // pin 40
        let win = window(&mut mem);
        let levels = read_pins(&win, PIN_COUNT, &[2, 3, 40]).unwrap();
        assert_eq!(levels, vec![true, false, true]);
    }

    #[test]
    fn pull_latch_leaves_no_residue() {
        let mut mem = vec![0u32; 64];
        let win = window(&mut mem);
        set_pull_mask(&win, PIN_COUNT, 0x30 | 1 << 40, Pull::Up).unwrap();
        assert_eq!(mem[GPPUD], 0);
        assert_eq!(mem[GPPUDCLK0], 0);
        assert_eq!(mem[GPPUDCLK1], 0);
    }

    #[test]
    fn detect_enable_merges_into_existing_bits() {
        let mut mem = vec![0u32; 64];
        mem[GPREN0] = 1;
        let win = window(&mut mem);
        let mut detect = Detect::default();
        detect.set_rising(true);
        detect.set_falling(true);
        enable_detect_mask(&win, PIN_COUNT, 1 << 5, detect).unwrap();
        assert_eq!(mem[GPREN0], 1 | 1 << 5);
        assert_eq!(mem[GPFEN0], 1 << 5);
        assert_eq!(mem[GPHEN0], 0);
    }

    #[test]
    fn detect_disable_clears_only_the_selected_kind() {
        let mut mem = vec![0u32; 64];
        mem[GPREN0] = 0b11;
        mem[GPFEN0] = 0b11;
        let win = window(&mut mem);
        let mut detect = Detect::default();
        detect.set_rising(true);
        disable_detect_mask(&win, PIN_COUNT, 1, detect).unwrap();
        assert_eq!(mem[GPREN0], 0b10);
        assert_eq!(mem[GPFEN0], 0b11);
    }

    #[test]
    fn detect_query_reports_per_pin_kinds() {
        let mut mem = vec![0u32; 64];
        mem[GPREN0] = 1 << 3;
        mem[GPLEN1] = 1 << 8; // pin 40
        let win = window(&mut mem);
        let kinds = get_detect_pins(&win, PIN_COUNT, &[3, 40, 5]).unwrap();
        assert!(kinds[0].rising());
        assert!(!kinds[0].level_low());
        assert!(kinds[1].level_low());
        assert!(!kinds[1].rising());
        assert_eq!(kinds[2], Detect::default());
    }

    #[test]
    fn events_are_read_and_acknowledged_together() {
        let mut mem = vec![0u32; 64];
        mem[GPEDS0] = 0b1010;
        mem[GPEDS1] = 1 << 10; // pin 42
        let win = window(&mut mem);
        let events = take_events(&win, PIN_COUNT).unwrap();
        assert_eq!(events, 0b1010 | 1 << 42);
        assert_eq!(mem[GPEDS0], u32::MAX);
        assert_eq!(mem[GPEDS1], 0x003f_ffff);
    }
}
