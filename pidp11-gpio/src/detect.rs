//! Event detection selection.

bitfield::bitfield! {
    /// Bit field selecting which level and edge events to watch for.
    ///
    /// Several kinds can be combined in one call. The synchronous edge
    /// kinds are sampled behind the input synchronizer; the asynchronous
    /// kinds see the raw pad and catch pulses shorter than a system
    /// clock cycle.
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct Detect(u8);
    impl Debug;
    /// Low-to-high transition.
    pub rising, set_rising: 0;
    /// High-to-low transition.
    pub falling, set_falling: 1;
    /// Sustained high level.
    pub level_high, set_level_high: 2;
    /// Sustained low level.
    pub level_low, set_level_low: 3;
    /// Low-to-high transition on the raw pad.
    pub async_rising, set_async_rising: 4;
    /// High-to-low transition on the raw pad.
    pub async_falling, set_async_falling: 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_independent() {
        let mut detect = Detect::default();
        detect.set_rising(true);
        detect.set_level_low(true);
        assert!(detect.rising());
        assert!(detect.level_low());
        assert!(!detect.falling());
        assert!(!detect.level_high());
        assert!(!detect.async_rising());
        assert!(!detect.async_falling());
    }

    #[test]
    fn default_selects_nothing() {
        let detect = Detect::default();
        assert_eq!(detect, Detect(0));
    }
}
