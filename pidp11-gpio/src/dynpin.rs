//! Single-pin handles over the device facade.
//!
//! A [`DynPin`] borrows its [`Gpio`] and addresses one line through the
//! same capability dispatch the bulk calls use. It exists for the odd
//! standalone line (a status lamp, a jumper sense) and for handing pins
//! to drivers written against the `embedded-hal` digital traits; the
//! panel's matrix code stays on the bulk calls.

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

use crate::{Error, Function, Gpio, Pin, Pull, Result};

//==============================================================================
//  DynPin
//==============================================================================

/// One GPIO line borrowed from a [`Gpio`] device.
///
/// Handles come from [`Gpio::pin`], which validates the index; after
/// that, operations only fail where the chip lacks the capability.
#[derive(Debug)]
pub struct DynPin<'a> {
    gpio: &'a Gpio,
    pin: Pin,
}

impl<'a> DynPin<'a> {
    pub(crate) fn new(gpio: &'a Gpio, pin: Pin) -> Self {
        Self { gpio, pin }
    }

    /// The line this handle addresses.
    pub fn pin(&self) -> Pin {
        self.pin
    }

    /// Route the line to `function`.
    pub fn set_function(&mut self, function: Function) -> Result<()> {
        self.gpio.set_function_pins(&[self.pin], function)
    }

    /// Set the line's pull resistor.
    pub fn set_pull(&mut self, pull: Pull) -> Result<()> {
        self.gpio.set_pull_pins(&[self.pin], pull)
    }

    /// Drive the line high or low.
    pub fn write(&mut self, high: bool) -> Result<()> {
        self.gpio.write_pins(&[self.pin], high)
    }

    /// Sample the line's input level.
    pub fn read(&self) -> Result<bool> {
        // One level per requested pin, so the single element is there.
        Ok(self.gpio.read_pins(&[self.pin])?[0])
    }
}

//==============================================================================
//  Embedded HAL traits
//==============================================================================

impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for DynPin<'_> {
    type Error = Error;
}

impl OutputPin for DynPin<'_> {
    fn set_low(&mut self) -> Result<()> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<()> {
        self.write(true)
    }
}

impl InputPin for DynPin<'_> {
    fn is_high(&mut self) -> Result<bool> {
        self.read()
    }

    fn is_low(&mut self) -> Result<bool> {
        self.read().map(|level| !level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcm2835::{GPCLR0, GPFSEL2, GPLEV0, GPSET0};
    use crate::{Chip, RegisterWindow};

    fn device(mem: &mut Vec<u32>) -> Gpio {
        let window = unsafe { RegisterWindow::new(mem.as_mut_ptr(), mem.len()) }.unwrap();
        Gpio::new(Chip::Bcm2835, window).unwrap()
    }

    #[test]
    fn handle_addresses_only_its_own_line() {
        let mut mem = vec![0u32; 64];
        let gpio = device(&mut mem);
        let mut pin = gpio.pin(20).unwrap();
        pin.set_function(Function::Output).unwrap();
        pin.write(true).unwrap();
        assert_eq!(mem[GPFSEL2], 1);
        assert_eq!(mem[GPSET0], 1 << 20);
    }

    #[test]
    fn embedded_hal_traits_route_through_the_handle() {
        let mut mem = vec![0u32; 64];
        mem[GPLEV0] = 1 << 5;
        let gpio = device(&mut mem);
        let mut pin = gpio.pin(5).unwrap();
        assert!(pin.is_high().unwrap());
        assert!(!pin.is_low().unwrap());
        pin.set_high().unwrap();
        pin.set_low().unwrap();
        assert_eq!(mem[GPSET0], 1 << 5);
        assert_eq!(mem[GPCLR0], 1 << 5);
    }
}
