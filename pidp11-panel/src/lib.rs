//! Driver for the PiDP-11 front panel: a PDP-11/70 console replica
//! hung off a Raspberry Pi's GPIO header.
//!
//! The panel multiplexes 64 LEDs and 34 switches over 21 GPIO lines as
//! a 6x12 LED matrix and a 3x12 switch matrix sharing the column
//! lines. [`scan`] time-division multiplexes both fast enough that the
//! lamps look steady, and maintains a [`PanelState`] of what the panel
//! shows and senses. Host code reads and writes that state and never
//! touches the matrix:
//!
//! ```no_run
//! use std::sync::Arc;
//! use pidp11_gpio::{Chip, Gpio, RegisterWindow};
//! use pidp11_panel::{Layout, Panel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let base = std::ptr::null_mut();
//! // `base` maps the chip's GPIO block, e.g. from /dev/gpiomem.
//! let window = unsafe { RegisterWindow::new(base, 64)? };
//! let gpio = Arc::new(Gpio::new(Chip::Bcm2711, window)?);
//! let panel = Panel::start(gpio, Layout::default())?;
//!
//! panel.update(|state| {
//!     state.address = 0o17_777_707;
//!     state.data = 0o177_570;
//! });
//! if panel.snapshot().switch_ena_halt {
//!     panel.stop();
//! }
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

pub mod layout;
pub mod scan;
pub mod state;

pub use layout::Layout;
pub use scan::{run, Panel};
pub use state::{AddressMode, AddressingLength, DataMode, PanelState, RunLevel, RunState};

/// Errors from bringing the panel up.
///
/// Once the scan thread runs, GPIO trouble is logged rather than
/// returned; these only surface from [`Panel::start`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Claiming the panel pins failed.
    #[error(transparent)]
    Gpio(#[from] pidp11_gpio::Error),
    /// The scan thread could not be spawned.
    #[error("could not start the scan thread: {0}")]
    Thread(#[from] std::io::Error),
}
