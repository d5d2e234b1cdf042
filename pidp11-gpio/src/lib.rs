//! A GPIO driver for the Raspberry Pi SoCs a PiDP-11 front panel hangs off.
//!
//! The driver is split in two layers:
//!
//! - Chip modules ([`bcm2835`], [`bcm2711`], [`rp1`]) hold the raw
//!   register routines for one GPIO generation each.
//! - [`Gpio`] wraps one chip's routines behind a uniform capability
//!   surface, so callers address pins the same way on every board.
//!
//! Pins are addressed either as pin lists (`&[Pin]`) or as bit masks
//! (`u64`, bit `n` for pin `n`). Every capability accepts both forms;
//! when a chip natively implements only one, the facade converts the
//! call, and when it implements neither, the call reports
//! [`Error::Unsupported`].
//!
//! The crate never maps device memory itself. Whoever owns the mapping
//! (typically an `mmap` of `/dev/gpiomem`) wraps it in a
//! [`RegisterWindow`] and hands it to [`Gpio::new`]:
//!
//! ```no_run
//! use pidp11_gpio::{Chip, Function, Gpio, RegisterWindow};
//!
//! # fn main() -> pidp11_gpio::Result<()> {
//! # let base = std::ptr::null_mut();
//! // `base` points at the chip's GPIO block, e.g. from /dev/gpiomem.
//! let window = unsafe { RegisterWindow::new(base, 64)? };
//! let gpio = Gpio::new(Chip::Bcm2711, window)?;
//! gpio.set_function_pins(&[20, 21], Function::Output)?;
//! gpio.write_pins(&[20], true)?;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

use std::fmt;

pub mod bcm2711;
pub mod bcm2835;
mod detect;
mod dynpin;
mod func;
mod pull;
mod reg;
pub mod rp1;

pub use detect::Detect;
pub use dynpin::DynPin;
pub use func::Function;
pub use pull::Pull;
pub use reg::RegisterWindow;

/// A GPIO line index.
pub type Pin = u8;

/// Shorthand for results of GPIO operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by GPIO operations.
///
/// None of these are transient; retrying the same call yields the same
/// error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A pin index past the end of the active chip's lines.
    #[error("pin {0} is out of range for this chip")]
    InvalidPin(Pin),
    /// The register window is unusable: null, misaligned, or smaller
    /// than the chip's register map.
    #[error("register window is null, misaligned, or too small")]
    InvalidBase,
    /// The chip implements neither form of the requested capability.
    #[error("operation not supported by this chip")]
    Unsupported,
}

/// The supported Raspberry Pi GPIO generations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chip {
    /// Pi 1 and Pi Zero.
    Bcm2835,
    /// Pi 2 and Pi 3; carries the same GPIO block as the BCM2835.
    Bcm2837,
    /// Pi 4 family.
    Bcm2711,
    /// Pi 5's south-bridge I/O controller.
    Rp1,
}

impl Chip {
    /// GPIO lines the chip exposes.
    pub fn pin_count(self) -> Pin {
        match self {
            Chip::Bcm2835 | Chip::Bcm2837 => bcm2835::PIN_COUNT,
            Chip::Bcm2711 => bcm2711::PIN_COUNT,
            Chip::Rp1 => rp1::PIN_COUNT,
        }
    }

    /// Smallest register window, in 32-bit words, that covers the
    /// chip's register map.
    pub fn min_words(self) -> usize {
        match self {
            Chip::Bcm2835 | Chip::Bcm2837 => bcm2835::GPPUDCLK1 + 1,
            Chip::Bcm2711 => bcm2711::GPIO_PUP_PDN_CNTRL_REG3 + 1,
            Chip::Rp1 => rp1::GPIO0_STATUS + usize::from(rp1::PIN_COUNT) * rp1::PIN_STRIDE,
        }
    }

    fn ops(self) -> OpTable {
        match self {
            Chip::Bcm2835 | Chip::Bcm2837 => bcm2835::ops(),
            Chip::Bcm2711 => bcm2711::ops(),
            Chip::Rp1 => rp1::ops(),
        }
    }
}

/// Capability table for one chip generation.
///
/// Each entry is the chip's native routine for that capability, or
/// `None` where the silicon (or its driver so far) has none. Routines
/// take the pin count as a parameter so one routine can serve chips
/// that differ only in line count.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct OpTable {
    pub pin_count: Pin,
    pub set_function_pins: Option<fn(&RegisterWindow, Pin, &[Pin], Function) -> Result<()>>,
    pub set_function_mask: Option<fn(&RegisterWindow, Pin, u64, Function) -> Result<()>>,
    pub get_function_pins: Option<fn(&RegisterWindow, Pin, &[Pin]) -> Result<Vec<Function>>>,
    pub set_pull_pins: Option<fn(&RegisterWindow, Pin, &[Pin], Pull) -> Result<()>>,
    pub set_pull_mask: Option<fn(&RegisterWindow, Pin, u64, Pull) -> Result<()>>,
    pub write_pins: Option<fn(&RegisterWindow, Pin, &[Pin], bool) -> Result<()>>,
    pub write_mask: Option<fn(&RegisterWindow, Pin, u64, bool) -> Result<()>>,
    pub read_pins: Option<fn(&RegisterWindow, Pin, &[Pin]) -> Result<Vec<bool>>>,
    pub read_levels: Option<fn(&RegisterWindow, Pin) -> Result<u64>>,
    pub enable_detect_pins: Option<fn(&RegisterWindow, Pin, &[Pin], Detect) -> Result<()>>,
    pub enable_detect_mask: Option<fn(&RegisterWindow, Pin, u64, Detect) -> Result<()>>,
    pub disable_detect_pins: Option<fn(&RegisterWindow, Pin, &[Pin], Detect) -> Result<()>>,
    pub disable_detect_mask: Option<fn(&RegisterWindow, Pin, u64, Detect) -> Result<()>>,
    pub get_detect_pins: Option<fn(&RegisterWindow, Pin, &[Pin]) -> Result<Vec<Detect>>>,
    pub take_events: Option<fn(&RegisterWindow, Pin) -> Result<u64>>,
}

/// One chip's GPIO block behind a capability-checked facade.
///
/// Each method runs the chip's native routine when there is one. When
/// the chip only implements the other addressing form, the facade
/// converts the call; converting a pin list to a mask drops pins 64
/// and over, since they have no mask bit (no supported chip has that
/// many lines). When neither form exists the call reports
/// [`Error::Unsupported`].
pub struct Gpio {
    chip: Chip,
    ops: OpTable,
    window: RegisterWindow,
}

impl Gpio {
    /// Bind a register window to a chip's routines.
    ///
    /// Fails with [`Error::InvalidBase`] if the window is smaller than
    /// the chip's register map, so later register access cannot run off
    /// the end of the mapping.
    pub fn new(chip: Chip, window: RegisterWindow) -> Result<Self> {
        if window.words() < chip.min_words() {
            return Err(Error::InvalidBase);
        }
        Ok(Self {
            chip,
            ops: chip.ops(),
            window,
        })
    }

    /// The chip this device was built for.
    pub fn chip(&self) -> Chip {
        self.chip
    }

    /// GPIO lines the device exposes.
    pub fn pin_count(&self) -> Pin {
        self.ops.pin_count
    }

    /// Borrow one pin as a [`DynPin`] handle.
    ///
    /// The index is validated here; the handle's operations can then
    /// only fail for missing capabilities.
    pub fn pin(&self, pin: Pin) -> Result<DynPin<'_>> {
        if pin >= self.ops.pin_count {
            return Err(Error::InvalidPin(pin));
        }
        Ok(DynPin::new(self, pin))
    }

    /// Route every listed pin to `function`.
    pub fn set_function_pins(&self, pins: &[Pin], function: Function) -> Result<()> {
        if let Some(op) = self.ops.set_function_pins {
            return op(&self.window, self.ops.pin_count, pins, function);
        }
        if let Some(op) = self.ops.set_function_mask {
            return op(&self.window, self.ops.pin_count, pins_to_mask(pins), function);
        }
        Err(Error::Unsupported)
    }

    /// Route every pin in `mask` to `function`.
    pub fn set_function_mask(&self, mask: u64, function: Function) -> Result<()> {
        if let Some(op) = self.ops.set_function_mask {
            return op(&self.window, self.ops.pin_count, mask, function);
        }
        if let Some(op) = self.ops.set_function_pins {
            return op(&self.window, self.ops.pin_count, &mask_to_pins(mask), function);
        }
        Err(Error::Unsupported)
    }

    /// Read back the function every listed pin is routed to.
    pub fn functions(&self, pins: &[Pin]) -> Result<Vec<Function>> {
        match self.ops.get_function_pins {
            Some(op) => op(&self.window, self.ops.pin_count, pins),
            None => Err(Error::Unsupported),
        }
    }

    /// Set the pull resistor on every listed pin.
    pub fn set_pull_pins(&self, pins: &[Pin], pull: Pull) -> Result<()> {
        if let Some(op) = self.ops.set_pull_pins {
            return op(&self.window, self.ops.pin_count, pins, pull);
        }
        if let Some(op) = self.ops.set_pull_mask {
            return op(&self.window, self.ops.pin_count, pins_to_mask(pins), pull);
        }
        Err(Error::Unsupported)
    }

    /// Set the pull resistor on every pin in `mask`.
    pub fn set_pull_mask(&self, mask: u64, pull: Pull) -> Result<()> {
        if let Some(op) = self.ops.set_pull_mask {
            return op(&self.window, self.ops.pin_count, mask, pull);
        }
        if let Some(op) = self.ops.set_pull_pins {
            return op(&self.window, self.ops.pin_count, &mask_to_pins(mask), pull);
        }
        Err(Error::Unsupported)
    }

    /// Drive every listed pin high or low.
    ///
    /// Pins not listed keep their level; the chips' set/clear banks
    /// only touch addressed lines.
    pub fn write_pins(&self, pins: &[Pin], high: bool) -> Result<()> {
        if let Some(op) = self.ops.write_pins {
            return op(&self.window, self.ops.pin_count, pins, high);
        }
        if let Some(op) = self.ops.write_mask {
            return op(&self.window, self.ops.pin_count, pins_to_mask(pins), high);
        }
        Err(Error::Unsupported)
    }

    /// Drive every pin in `mask` high or low.
    pub fn write_mask(&self, mask: u64, high: bool) -> Result<()> {
        if let Some(op) = self.ops.write_mask {
            return op(&self.window, self.ops.pin_count, mask, high);
        }
        if let Some(op) = self.ops.write_pins {
            return op(&self.window, self.ops.pin_count, &mask_to_pins(mask), high);
        }
        Err(Error::Unsupported)
    }

    /// Sample the level of every listed pin, in list order.
    pub fn read_pins(&self, pins: &[Pin]) -> Result<Vec<bool>> {
        if let Some(op) = self.ops.read_pins {
            return op(&self.window, self.ops.pin_count, pins);
        }
        if let Some(op) = self.ops.read_levels {
            check_pins(pins, self.ops.pin_count)?;
            let levels = op(&self.window, self.ops.pin_count)?;
            return Ok(pins.iter().map(|&pin| levels & (1 << pin) != 0).collect());
        }
        Err(Error::Unsupported)
    }

    /// Sample every line at once, as a mask of high pins.
    pub fn levels(&self) -> Result<u64> {
        if let Some(op) = self.ops.read_levels {
            return op(&self.window, self.ops.pin_count);
        }
        if let Some(op) = self.ops.read_pins {
            let pins: Vec<Pin> = (0..self.ops.pin_count).collect();
            let levels = op(&self.window, self.ops.pin_count, &pins)?;
            return Ok(levels
                .iter()
                .enumerate()
                .fold(0, |word, (pin, &high)| word | u64::from(high) << pin));
        }
        Err(Error::Unsupported)
    }

    /// Start watching the listed pins for the selected events.
    ///
    /// Kinds already enabled on a pin stay enabled.
    pub fn enable_detect_pins(&self, pins: &[Pin], detect: Detect) -> Result<()> {
        if let Some(op) = self.ops.enable_detect_pins {
            return op(&self.window, self.ops.pin_count, pins, detect);
        }
        if let Some(op) = self.ops.enable_detect_mask {
            return op(&self.window, self.ops.pin_count, pins_to_mask(pins), detect);
        }
        Err(Error::Unsupported)
    }

    /// Start watching every pin in `mask` for the selected events.
    pub fn enable_detect_mask(&self, mask: u64, detect: Detect) -> Result<()> {
        if let Some(op) = self.ops.enable_detect_mask {
            return op(&self.window, self.ops.pin_count, mask, detect);
        }
        if let Some(op) = self.ops.enable_detect_pins {
            return op(&self.window, self.ops.pin_count, &mask_to_pins(mask), detect);
        }
        Err(Error::Unsupported)
    }

    /// Stop watching the listed pins for the selected events.
    ///
    /// Kinds not selected stay as they were.
    pub fn disable_detect_pins(&self, pins: &[Pin], detect: Detect) -> Result<()> {
        if let Some(op) = self.ops.disable_detect_pins {
            return op(&self.window, self.ops.pin_count, pins, detect);
        }
        if let Some(op) = self.ops.disable_detect_mask {
            return op(&self.window, self.ops.pin_count, pins_to_mask(pins), detect);
        }
        Err(Error::Unsupported)
    }

    /// Stop watching every pin in `mask` for the selected events.
    pub fn disable_detect_mask(&self, mask: u64, detect: Detect) -> Result<()> {
        if let Some(op) = self.ops.disable_detect_mask {
            return op(&self.window, self.ops.pin_count, mask, detect);
        }
        if let Some(op) = self.ops.disable_detect_pins {
            return op(&self.window, self.ops.pin_count, &mask_to_pins(mask), detect);
        }
        Err(Error::Unsupported)
    }

    /// Read back the events every listed pin is watched for.
    pub fn detect_kinds(&self, pins: &[Pin]) -> Result<Vec<Detect>> {
        match self.ops.get_detect_pins {
            Some(op) => op(&self.window, self.ops.pin_count, pins),
            None => Err(Error::Unsupported),
        }
    }

    /// Take the pending event mask, acknowledging every event in it.
    ///
    /// Events that fire between the read and the acknowledge can be
    /// lost; the chips offer no atomic form of this.
    pub fn take_events(&self) -> Result<u64> {
        match self.ops.take_events {
            Some(op) => op(&self.window, self.ops.pin_count),
            None => Err(Error::Unsupported),
        }
    }
}

impl fmt::Debug for Gpio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gpio")
            .field("chip", &self.chip)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

/// Collect a pin list into the equivalent bit mask.
///
/// Pins 64 and over have no mask bit and are left out.
pub fn pins_to_mask(pins: &[Pin]) -> u64 {
    pins.iter()
        .filter(|&&pin| pin < 64)
        .fold(0, |mask, &pin| mask | 1 << pin)
}

/// Expand a bit mask into the ascending list of set pins.
pub fn mask_to_pins(mask: u64) -> Vec<Pin> {
    (0..64).filter(|&pin| mask & (1 << pin) != 0).collect()
}

/// Mask of all lines a chip with `count` pins implements.
pub(crate) fn valid_mask(count: Pin) -> u64 {
    (1 << count) - 1
}

/// Reject masks addressing lines past the pin count, naming the lowest
/// offender. Nothing may be written before this check passes.
pub(crate) fn check_mask(mask: u64, count: Pin) -> Result<()> {
    let invalid = mask & !valid_mask(count);
    if invalid != 0 {
        return Err(Error::InvalidPin(invalid.trailing_zeros() as Pin));
    }
    Ok(())
}

/// Reject pin lists addressing lines past the pin count. Nothing may be
/// written before this check passes.
pub(crate) fn check_pins(pins: &[Pin], count: Pin) -> Result<()> {
    match pins.iter().find(|&&pin| pin >= count) {
        Some(&pin) => Err(Error::InvalidPin(pin)),
        None => Ok(()),
    }
}
