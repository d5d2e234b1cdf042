//! The panel's semantic state.
//!
//! [`PanelState`] is everything the console shows and senses, named
//! after the PDP-11/70 front panel legends rather than matrix rows and
//! columns. The scan engine folds switch readings into it and renders
//! the lamp fields out of it; host code only ever touches this struct.

/// Position of the ADDRESS SELECT rotary knob.
///
/// `next` and `prev` step clockwise and counter-clockwise, wrapping at
/// the ends, which is how the scan engine follows the physical knob.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddressMode {
    /// User data space.
    #[default]
    UserD,
    /// Supervisor data space.
    SuperD,
    /// Kernel data space.
    KernelD,
    /// Console physical address.
    ConsPhy,
    /// Program physical address.
    ProgPhy,
    /// Kernel instruction space.
    KernelI,
    /// Supervisor instruction space.
    SuperI,
    /// User instruction space.
    UserI,
}

impl AddressMode {
    /// The position one clockwise step away.
    pub fn next(self) -> Self {
        use AddressMode::*;
        match self {
            UserD => SuperD,
            SuperD => KernelD,
            KernelD => ConsPhy,
            ConsPhy => ProgPhy,
            ProgPhy => KernelI,
            KernelI => SuperI,
            SuperI => UserI,
            UserI => UserD,
        }
    }

    /// The position one counter-clockwise step away.
    pub fn prev(self) -> Self {
        use AddressMode::*;
        match self {
            UserD => UserI,
            SuperD => UserD,
            KernelD => SuperD,
            ConsPhy => KernelD,
            ProgPhy => ConsPhy,
            KernelI => ProgPhy,
            SuperI => KernelI,
            UserI => SuperI,
        }
    }
}

/// Position of the DATA SELECT rotary knob.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataMode {
    /// Data paths.
    #[default]
    Paths,
    /// Bus register.
    BusReg,
    /// Microaddress FPP/CPU.
    MuAFppCpu,
    /// Display register.
    DispReg,
}

impl DataMode {
    /// The position one clockwise step away.
    pub fn next(self) -> Self {
        use DataMode::*;
        match self {
            Paths => BusReg,
            BusReg => MuAFppCpu,
            MuAFppCpu => DispReg,
            DispReg => Paths,
        }
    }

    /// The position one counter-clockwise step away.
    pub fn prev(self) -> Self {
        use DataMode::*;
        match self {
            Paths => DispReg,
            BusReg => Paths,
            MuAFppCpu => BusReg,
            DispReg => MuAFppCpu,
        }
    }
}

/// Active virtual address length, shown by the 16/18/22 lamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddressingLength {
    /// 16-bit mapping.
    #[default]
    Bits16,
    /// 18-bit mapping.
    Bits18,
    /// 22-bit mapping.
    Bits22,
}

/// Processor run state, shown by the RUN, PAUSE and MASTER lamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunState {
    /// Executing instructions.
    #[default]
    Run,
    /// Paused for a bus transfer.
    Pause,
    /// Bus master.
    Master,
}

/// Processor privilege mode, shown by the USER, SUPER and KERNEL lamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunLevel {
    /// User mode.
    #[default]
    User,
    /// Supervisor mode.
    Super,
    /// Kernel mode.
    Kernel,
}

/// Everything the panel shows and senses.
///
/// Lamp fields are inputs to the display scan; switch fields are
/// outputs of the switch scan. The defaults are all lamps dark and all
/// switches released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanelState {
    /// Displayed address; the low 22 bits reach the ADDRESS lamps.
    pub address: u32,
    /// Displayed data word; the DATA lamps show all 16 bits.
    pub data: u16,
    /// ADDRESS SELECT knob position lamp.
    pub addr_mode: AddressMode,
    /// DATA SELECT knob position lamp.
    pub data_mode: DataMode,
    /// Address length lamps.
    pub addressing_length: AddressingLength,
    /// PARITY HIGH lamp.
    pub parity_high: bool,
    /// PARITY LOW lamp.
    pub parity_low: bool,
    /// PAR ERR lamp.
    pub parity_err: bool,
    /// ADRS ERR lamp.
    pub address_err: bool,
    /// Run state lamps.
    pub run_state: RunState,
    /// Privilege mode lamps.
    pub run_level: RunLevel,
    /// DATA REF lamp.
    pub data_ref: bool,
    /// Switch register; the scan writes its low 22 bits.
    pub switch_reg: u32,
    /// TEST toggle; while held, every lamp is lit.
    pub switch_test: bool,
    /// LOAD ADRS switch.
    pub switch_load_add: bool,
    /// EXAM switch.
    pub switch_exam: bool,
    /// DEP switch.
    pub switch_dep: bool,
    /// CONT switch.
    pub switch_cont: bool,
    /// ENABLE/HALT switch.
    pub switch_ena_halt: bool,
    /// S INST/S BUS CYCLE switch.
    pub switch_sing_inst: bool,
    /// START switch.
    pub switch_start: bool,
    /// ADDRESS SELECT knob push contact.
    pub switch_addr: bool,
    /// ADDRESS SELECT knob rotation phase 1.
    pub switch_addr_rot1: bool,
    /// ADDRESS SELECT knob rotation phase 2.
    pub switch_addr_rot2: bool,
    /// DATA SELECT knob push contact.
    pub switch_data: bool,
    /// DATA SELECT knob rotation phase 1.
    pub switch_data_rot1: bool,
    /// DATA SELECT knob rotation phase 2.
    pub switch_data_rot2: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_dark_and_released() {
        let state = PanelState::default();
        assert_eq!(state.address, 0);
        assert_eq!(state.addr_mode, AddressMode::UserD);
        assert_eq!(state.data_mode, DataMode::Paths);
        assert_eq!(state.addressing_length, AddressingLength::Bits16);
        assert_eq!(state.run_state, RunState::Run);
        assert_eq!(state.run_level, RunLevel::User);
        assert!(!state.switch_ena_halt);
    }

    #[test]
    fn address_knob_steps_wrap_in_both_directions() {
        let mut mode = AddressMode::UserD;
        for _ in 0..8 {
            mode = mode.next();
        }
        assert_eq!(mode, AddressMode::UserD);
        assert_eq!(AddressMode::UserD.prev(), AddressMode::UserI);
        assert_eq!(AddressMode::UserI.next(), AddressMode::UserD);
        for position in [
            AddressMode::UserD,
            AddressMode::SuperD,
            AddressMode::KernelD,
            AddressMode::ConsPhy,
            AddressMode::ProgPhy,
            AddressMode::KernelI,
            AddressMode::SuperI,
            AddressMode::UserI,
        ] {
            assert_eq!(position.next().prev(), position);
        }
    }

    #[test]
    fn data_knob_steps_wrap_in_both_directions() {
        assert_eq!(DataMode::DispReg.next(), DataMode::Paths);
        assert_eq!(DataMode::Paths.prev(), DataMode::DispReg);
        for position in [
            DataMode::Paths,
            DataMode::BusReg,
            DataMode::MuAFppCpu,
            DataMode::DispReg,
        ] {
            assert_eq!(position.prev().next(), position);
        }
    }
}
