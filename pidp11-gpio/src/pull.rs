//! Pull resistor control.

/// Pull resistor state for a GPIO line.
///
/// The register encoding of these differs between chip generations, so
/// each chip module maps them itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pull {
    /// No pull resistor.
    Off,
    /// Pull up towards the supply rail.
    Up,
    /// Pull down towards ground.
    Down,
}
