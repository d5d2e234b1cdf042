//! Pin function selection.

/// The function a GPIO line is routed to.
///
/// Every chip generation encodes these as a 3-bit field per pin. The
/// alternate functions select SoC peripherals and their meaning differs
/// per pin and per chip; the panel itself only ever uses [`Input`] and
/// [`Output`].
///
/// [`Input`]: Function::Input
/// [`Output`]: Function::Output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    /// High-impedance input.
    Input,
    /// Software-driven output.
    Output,
    /// Alternate function 0.
    Alt0,
    /// Alternate function 1.
    Alt1,
    /// Alternate function 2.
    Alt2,
    /// Alternate function 3.
    Alt3,
    /// Alternate function 4.
    Alt4,
    /// Alternate function 5.
    Alt5,
}

impl Function {
    /// The 3-bit field value for a function select register.
    ///
    /// The alternates are not in numeric order in hardware.
    pub(crate) fn code(self) -> u32 {
        use Function::*;
        match self {
            Input => 0,
            Output => 1,
            Alt5 => 2,
            Alt4 => 3,
            Alt0 => 4,
            Alt1 => 5,
            Alt2 => 6,
            Alt3 => 7,
        }
    }

    /// Decode a function select field. Only the low 3 bits are used.
    pub(crate) fn from_code(code: u32) -> Self {
        use Function::*;
        match code & 0b111 {
            0 => Input,
            1 => Output,
            2 => Alt5,
            3 => Alt4,
            4 => Alt0,
            5 => Alt1,
            6 => Alt2,
            _ => Alt3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_register_encoding() {
        assert_eq!(Function::Input.code(), 0);
        assert_eq!(Function::Output.code(), 1);
        assert_eq!(Function::Alt5.code(), 2);
        assert_eq!(Function::Alt4.code(), 3);
        assert_eq!(Function::Alt0.code(), 4);
        assert_eq!(Function::Alt1.code(), 5);
        assert_eq!(Function::Alt2.code(), 6);
        assert_eq!(Function::Alt3.code(), 7);
    }

    #[test]
    fn decoding_inverts_encoding() {
        for code in 0..8 {
            assert_eq!(Function::from_code(code).code(), code);
        }
    }

    #[test]
    fn decoding_ignores_high_bits() {
        assert_eq!(Function::from_code(0b1000), Function::Input);
        assert_eq!(Function::from_code(0b1001), Function::Output);
    }
}
