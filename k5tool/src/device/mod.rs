//! Handshake, firmware identification and capacity detection.

pub mod firmware;
pub mod probe;
pub mod session;

pub use firmware::{FirmwareClassification, FirmwareVariant, classify, extract_version_string};
pub use probe::{probe_capacity, probe_capacity_with};
pub use session::{DeviceCapability, DeviceSession};
