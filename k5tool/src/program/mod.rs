//! EEPROM programming: region map, payloads, gated steps and sequences.

pub mod operations;
pub mod payload;
pub mod region;
pub mod sequencer;
pub mod step;

pub use operations::{
    backup, erase, read_calibration, read_config, restore, write_calibration, write_config,
    write_payload,
};
pub use payload::{PayloadKind, PayloadSet};
pub use region::Region;
pub use sequencer::{SequenceReport, detect_and_run_auto_sequence, plan_auto_sequence, run_sequence};
pub use step::{ProgramStep, Requirement, gate};
