//! Panel wiring and scan timing.

use std::time::Duration;

use pidp11_gpio::Pin;

/// How the panel hangs off the GPIO header, plus the scan timing.
///
/// The matrix shares twelve column lines between six LED rows and three
/// switch rows. LED row strobes are active high and the columns sink
/// current, so a lit lamp means its column driven low. Switch rows
/// strobe active low against pulled-up columns, so an engaged switch
/// also reads low.
///
/// [`Layout::default`] is the standard PiDP-11 wiring; boards rewired
/// for other header pins can carry their own table. Pins named here
/// must be valid for the device the panel runs on, or every scan cycle
/// just logs errors without touching the hardware.
#[derive(Clone, Debug)]
pub struct Layout {
    /// Column lines shared by both matrices, column 0 first.
    pub cols: [Pin; 12],
    /// LED row strobe lines, row 0 first.
    pub led_rows: [Pin; 6],
    /// Switch row strobe lines, row 0 first.
    pub switch_rows: [Pin; 3],
    /// Pins to pull up when the panel is released.
    pub default_pull_up: Vec<Pin>,
    /// Pins to pull down when the panel is released.
    pub default_pull_down: Vec<Pin>,
    /// How long each LED row stays lit per refresh.
    pub row_dwell: Duration,
    /// Settle time after selecting a switch row, before sampling it.
    pub settle: Duration,
}

impl Default for Layout {
    /// The PiDP-11 wiring, refreshing the full display at 60 Hz.
    fn default() -> Self {
        Self {
            cols: [26, 27, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13],
            led_rows: [20, 21, 22, 23, 24, 25],
            switch_rows: [16, 17, 18],
            default_pull_up: vec![4, 5, 6, 7, 8],
            default_pull_down: vec![26, 27, 9, 10, 11, 12, 13, 20, 21, 22, 23, 24, 25, 16, 17, 18],
            row_dwell: Duration::from_micros(1_000_000 / 60 / 6),
            settle: Duration::from_micros(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wiring_uses_each_header_pin_once() {
        let layout = Layout::default();
        let mut pins: Vec<Pin> = layout
            .cols
            .iter()
            .chain(&layout.led_rows)
            .chain(&layout.switch_rows)
            .copied()
            .collect();
        pins.sort_unstable();
        pins.dedup();
        assert_eq!(pins.len(), 21);
    }

    #[test]
    fn default_pulls_cover_exactly_the_panel_pins() {
        let layout = Layout::default();
        let mut pulled: Vec<Pin> = layout
            .default_pull_up
            .iter()
            .chain(&layout.default_pull_down)
            .copied()
            .collect();
        pulled.sort_unstable();
        let mut panel: Vec<Pin> = layout
            .cols
            .iter()
            .chain(&layout.led_rows)
            .chain(&layout.switch_rows)
            .copied()
            .collect();
        panel.sort_unstable();
        assert_eq!(pulled, panel);
    }

    #[test]
    fn row_dwell_divides_the_refresh_across_six_rows() {
        let layout = Layout::default();
        assert_eq!(layout.row_dwell, Duration::from_micros(2777));
    }
}
