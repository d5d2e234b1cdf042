//! Panel exerciser against an in-memory register window.
//!
//! Runs the full scan engine without real hardware: the address lamps
//! echo the switch register, the data lamps count, and the loop ends
//! after a few seconds or on ENABLE/HALT. On a Pi, replace the leaked
//! buffer with an mmap of the GPIO block to drive the real panel.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pidp11_gpio::{Chip, Gpio, RegisterWindow};
use pidp11_panel::{Layout, Panel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mem = Box::leak(Box::new([0u32; 64]));
    // Idle switch levels: every column line reads high.
    mem[0x34 >> 2] = !0;
    mem[0x38 >> 2] = !0;

    let window = unsafe { RegisterWindow::new(mem.as_mut_ptr(), mem.len()) }?;
    let gpio = Arc::new(Gpio::new(Chip::Bcm2711, window)?);
    let panel = Panel::start(gpio, Layout::default())?;
    println!("scanning; ENABLE/HALT (or 3 seconds) stops the exerciser");

    for tick in 0..180u32 {
        panel.update(|state| {
            state.address = state.switch_reg;
            state.data = state.data.wrapping_add(1);
        });
        let state = panel.snapshot();
        if state.switch_ena_halt {
            println!("halt switch engaged");
            break;
        }
        if tick % 30 == 0 {
            println!(
                "addr {:08o}  data {:06o}  addr knob {:?}  data knob {:?}",
                state.address, state.data, state.addr_mode, state.data_mode
            );
        }
        thread::sleep(Duration::from_millis(16));
    }

    panel.stop();
    println!("panel released");
    Ok(())
}
