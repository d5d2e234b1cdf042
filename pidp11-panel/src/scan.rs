//! The multiplexed display and switch scan.
//!
//! The panel wires 6 LED rows and 3 switch rows across 12 shared
//! column lines, so nothing stays lit by itself: a scan cycle drives
//! each LED row in turn (columns as outputs, a lit lamp's column low,
//! the row strobe high for the dwell time), then turns the columns
//! around to pulled-up inputs and selects each switch row active low to
//! sample it. Repeating that at 60 Hz keeps the display flicker-free.
//!
//! [`run`] is one such loop; [`Panel::start`] wraps it in a background
//! thread. GPIO errors inside the loop are logged and the cycle carries
//! on, one skipped tick being invisible at this refresh rate. On every
//! exit path the loop releases the pins to inputs and restores the
//! boot-time pull split, so a stopped panel leaves the header safe to
//! enumerate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use pidp11_gpio::{Function, Gpio, Pin, Pull};

use crate::layout::Layout;
use crate::state::{AddressMode, AddressingLength, DataMode, PanelState, RunLevel, RunState};
use crate::Error;

/// Column pattern that lights every lamp in a row.
const LAMP_TEST: u16 = 0x0fff;

fn bit(col: usize, lit: bool) -> u16 {
    (lit as u16) << col
}

/// Column pattern for one LED row. Bit `j` set means column `j`'s lamp
/// is lit, which [`drive_columns`] turns into that line driven low.
fn led_row_pattern(state: &PanelState, row: usize) -> u16 {
    match row {
        0 => (state.address & 0xfff) as u16,
        1 => ((state.address >> 12) & 0x3ff) as u16,
        2 => {
            bit(0, state.addressing_length == AddressingLength::Bits22)
                | bit(1, state.addressing_length == AddressingLength::Bits18)
                | bit(2, state.addressing_length == AddressingLength::Bits16)
                | bit(3, state.data_ref)
                | bit(4, state.run_level == RunLevel::Kernel)
                | bit(5, state.run_level == RunLevel::Super)
                | bit(6, state.run_level == RunLevel::User)
                | bit(7, state.run_state == RunState::Master)
                | bit(8, state.run_state == RunState::Pause)
                | bit(9, state.run_state == RunState::Run)
                | bit(10, state.address_err)
                | bit(11, state.parity_err)
        }
        3 => state.data & 0xfff,
        4 => {
            (state.data >> 12)
                | bit(4, state.parity_low)
                | bit(5, state.parity_high)
                | bit(6, state.addr_mode == AddressMode::UserD)
                | bit(7, state.addr_mode == AddressMode::SuperD)
                | bit(8, state.addr_mode == AddressMode::KernelD)
                | bit(9, state.addr_mode == AddressMode::ConsPhy)
                | bit(10, state.data_mode == DataMode::Paths)
                | bit(11, state.data_mode == DataMode::BusReg)
        }
        5 => {
            bit(6, state.addr_mode == AddressMode::UserI)
                | bit(7, state.addr_mode == AddressMode::SuperI)
                | bit(8, state.addr_mode == AddressMode::KernelI)
                | bit(9, state.addr_mode == AddressMode::ProgPhy)
                | bit(10, state.data_mode == DataMode::MuAFppCpu)
                | bit(11, state.data_mode == DataMode::DispReg)
        }
        _ => 0,
    }
}

/// The TEST toggle overrides every row with the all-lit pattern.
fn row_pattern(state: &PanelState, row: usize) -> u16 {
    if state.switch_test {
        LAMP_TEST
    } else {
        led_row_pattern(state, row)
    }
}

/// Extract one switch row's 12 column bits from a raw level word.
/// Columns read active low, so a set bit means the switch is engaged.
fn switch_row_word(levels: u64, cols: &[Pin; 12]) -> u16 {
    let mut word = 0;
    for (j, &col) in cols.iter().enumerate() {
        let level = levels.checked_shr(u32::from(col)).map_or(1, |v| v & 1);
        if level == 0 {
            word |= 1 << j;
        }
    }
    word
}

/// Fold one decoded switch row into the state.
fn apply_switch_row(state: &mut PanelState, row: usize, word: u16) {
    match row {
        0 => state.switch_reg = (state.switch_reg & !0xfff) | u32::from(word),
        1 => {
            state.switch_reg = (state.switch_reg & !0x3f_f000) | (u32::from(word & 0x3ff) << 12);
            state.switch_addr = word & (1 << 10) != 0;
            state.switch_data = word & (1 << 11) != 0;
        }
        2 => {
            state.switch_test = word & (1 << 0) != 0;
            state.switch_load_add = word & (1 << 1) != 0;
            state.switch_exam = word & (1 << 2) != 0;
            state.switch_dep = word & (1 << 3) != 0;
            state.switch_cont = word & (1 << 4) != 0;
            state.switch_ena_halt = word & (1 << 5) != 0;
            state.switch_sing_inst = word & (1 << 6) != 0;
            state.switch_start = word & (1 << 7) != 0;
            state.switch_addr_rot1 = word & (1 << 8) != 0;
            state.switch_addr_rot2 = word & (1 << 9) != 0;
            state.switch_data_rot1 = word & (1 << 10) != 0;
            state.switch_data_rot2 = word & (1 << 11) != 0;
        }
        _ => {}
    }
}

/// Tracks one knob phase between cycles and reports its low-to-high
/// transitions.
#[derive(Default)]
struct RisingEdge {
    level: bool,
}

impl RisingEdge {
    fn sample(&mut self, level: bool) -> bool {
        let rose = level && !self.level;
        self.level = level;
        rose
    }
}

/// Edge trackers for both knobs' rotation phases.
#[derive(Default)]
struct KnobEdges {
    addr1: RisingEdge,
    addr2: RisingEdge,
    data1: RisingEdge,
    data2: RisingEdge,
}

/// Step the knob positions from freshly decoded rotation phases.
///
/// A rising edge on one phase while the other is low is one detent:
/// phase 2 leading steps clockwise, phase 1 leading counter-clockwise.
/// The contacts are sampled raw, one scan cycle apart; there is no
/// debouncing beyond the edge-plus-quadrature rule itself.
fn step_knobs(state: &mut PanelState, edges: &mut KnobEdges) {
    let addr1 = edges.addr1.sample(state.switch_addr_rot1);
    let addr2 = edges.addr2.sample(state.switch_addr_rot2);
    if addr2 && !state.switch_addr_rot1 {
        state.addr_mode = state.addr_mode.next();
    }
    if addr1 && !state.switch_addr_rot2 {
        state.addr_mode = state.addr_mode.prev();
    }
    let data1 = edges.data1.sample(state.switch_data_rot1);
    let data2 = edges.data2.sample(state.switch_data_rot2);
    if data2 && !state.switch_data_rot1 {
        state.data_mode = state.data_mode.next();
    }
    if data1 && !state.switch_data_rot2 {
        state.data_mode = state.data_mode.prev();
    }
}

fn log_gpio(what: &str, result: pidp11_gpio::Result<()>) {
    if let Err(err) = result {
        warn!("{what}: {err}");
    }
}

/// Drive the column lines to a row's pattern: lit columns low, the
/// rest high, in two bank writes.
fn drive_columns(gpio: &Gpio, layout: &Layout, pattern: u16) {
    let mut lit = 0u64;
    let mut dark = 0u64;
    for (j, &col) in layout.cols.iter().enumerate() {
        let Some(col_bit) = 1u64.checked_shl(u32::from(col)) else {
            continue;
        };
        if pattern & (1 << j) != 0 {
            lit |= col_bit;
        } else {
            dark |= col_bit;
        }
    }
    log_gpio("release dark columns", gpio.write_mask(dark, true));
    log_gpio("sink lit columns", gpio.write_mask(lit, false));
}

/// Refresh all six LED rows once.
fn display_phase(gpio: &Gpio, layout: &Layout, state: &PanelState) {
    log_gpio("drive columns as outputs", gpio.set_function_pins(&layout.cols, Function::Output));
    for (row, &strobe) in layout.led_rows.iter().enumerate() {
        drive_columns(gpio, layout, row_pattern(state, row));
        log_gpio("raise led row strobe", gpio.write_pins(&[strobe], true));
        thread::sleep(layout.row_dwell);
        log_gpio("drop led row strobe", gpio.write_pins(&[strobe], false));
    }
}

/// Sample all three switch rows once.
///
/// A row whose levels could not be read comes back `None` and leaves
/// the previous decode of that row in place.
fn scan_phase(gpio: &Gpio, layout: &Layout) -> [Option<u16>; 3] {
    let mut words = [None; 3];
    log_gpio("park switch row strobes", gpio.write_pins(&layout.switch_rows, true));
    log_gpio("pull columns up for sampling", gpio.set_pull_pins(&layout.cols, Pull::Up));
    log_gpio(
        "turn columns around to inputs",
        gpio.set_function_pins(&layout.cols, Function::Input),
    );
    for (row, &strobe) in layout.switch_rows.iter().enumerate() {
        log_gpio("select switch row", gpio.write_pins(&[strobe], false));
        thread::sleep(layout.settle);
        match gpio.levels() {
            Ok(levels) => words[row] = Some(switch_row_word(levels, &layout.cols)),
            Err(err) => warn!("switch row {row} read failed: {err}"),
        }
        log_gpio("deselect switch row", gpio.write_pins(&[strobe], true));
    }
    log_gpio("drop column pull-ups", gpio.set_pull_pins(&layout.cols, Pull::Off));
    words
}

/// Releases the panel pins on scope exit: everything back to input,
/// then the boot-time pull split. Failures are logged and the remaining
/// steps still run.
struct Restore<'a> {
    gpio: &'a Gpio,
    layout: &'a Layout,
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        info!("releasing panel pins");
        log_gpio(
            "led rows to input",
            self.gpio.set_function_pins(&self.layout.led_rows, Function::Input),
        );
        log_gpio(
            "columns to input",
            self.gpio.set_function_pins(&self.layout.cols, Function::Input),
        );
        log_gpio(
            "switch rows to input",
            self.gpio
                .set_function_pins(&self.layout.switch_rows, Function::Input),
        );
        log_gpio(
            "restore default pull-ups",
            self.gpio.set_pull_pins(&self.layout.default_pull_up, Pull::Up),
        );
        log_gpio(
            "restore default pull-downs",
            self.gpio.set_pull_pins(&self.layout.default_pull_down, Pull::Down),
        );
    }
}

// Recover the guard even after a panicked cycle poisoned the lock.
fn lock(state: &Mutex<PanelState>) -> MutexGuard<'_, PanelState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run the scan loop on the calling thread until `stop` is set.
///
/// Each cycle snapshots the state, refreshes the display from the
/// snapshot, samples the switches, and folds the decode back into the
/// state; the lock is never held across a sleep. On return (or panic)
/// the panel pins are released to inputs with the default pulls.
///
/// [`Panel::start`] is the usual entry point; this is public for
/// callers that want to own the thread themselves.
pub fn run(gpio: &Gpio, layout: &Layout, state: &Mutex<PanelState>, stop: &AtomicBool) {
    let _restore = Restore { gpio, layout };
    let mut knobs = KnobEdges::default();
    debug!("scan loop running");
    while !stop.load(Ordering::Relaxed) {
        let snapshot = *lock(state);
        display_phase(gpio, layout, &snapshot);
        let words = scan_phase(gpio, layout);
        let mut state = lock(state);
        for (row, word) in words.into_iter().enumerate() {
            if let Some(word) = word {
                apply_switch_row(&mut state, row, word);
            }
        }
        step_knobs(&mut state, &mut knobs);
    }
    debug!("scan loop stopping");
}

struct Shared {
    state: Mutex<PanelState>,
    stop: AtomicBool,
}

/// A running front panel: shared state plus the scan thread behind it.
///
/// [`snapshot`] and [`update`] exchange state with the scan; dropping
/// the handle (or calling [`stop`]) halts the scan and releases the
/// pins before returning.
///
/// [`snapshot`]: Panel::snapshot
/// [`update`]: Panel::update
/// [`stop`]: Panel::stop
pub struct Panel {
    shared: Arc<Shared>,
    scanner: Option<JoinHandle<()>>,
}

impl Panel {
    /// Claim the panel pins and start the scan thread.
    ///
    /// The row and column lines are switched to outputs in their safe
    /// idle levels before the thread starts. Setup errors are fatal
    /// here; once the scan runs, GPIO errors are only logged.
    pub fn start(gpio: Arc<Gpio>, layout: Layout) -> Result<Self, Error> {
        gpio.set_function_pins(&layout.led_rows, Function::Output)?;
        gpio.set_function_pins(&layout.cols, Function::Output)?;
        gpio.set_function_pins(&layout.switch_rows, Function::Output)?;
        gpio.write_pins(&layout.led_rows, false)?;
        gpio.write_pins(&layout.cols, true)?;
        gpio.write_pins(&layout.switch_rows, true)?;

        let shared = Arc::new(Shared {
            state: Mutex::new(PanelState::default()),
            stop: AtomicBool::new(false),
        });
        let scanner = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("panel-scan".into())
                .spawn(move || run(&gpio, &layout, &shared.state, &shared.stop))?
        };
        info!("panel scan started");
        Ok(Self {
            shared,
            scanner: Some(scanner),
        })
    }

    /// Copy of the panel state as of the last completed scan.
    pub fn snapshot(&self) -> PanelState {
        *lock(&self.shared.state)
    }

    /// Apply one batched update to the lamp fields.
    ///
    /// The whole closure runs under the state lock, so the display
    /// never shows half of an update.
    pub fn update(&self, f: impl FnOnce(&mut PanelState)) {
        f(&mut lock(&self.shared.state));
    }

    /// Stop the scan and release the pins, blocking until both happen.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(scanner) = self.scanner.take() {
            self.shared.stop.store(true, Ordering::Relaxed);
            if scanner.join().is_err() {
                warn!("scan thread panicked");
            }
            info!("panel scan stopped");
        }
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        self.shutdown();
    }
}
