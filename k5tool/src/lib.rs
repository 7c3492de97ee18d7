//! # k5tool
//!
//! A library for reading and programming the EEPROM of Quansheng UV-K5/K6
//! radios over their serial programming cable.
//!
//! This crate provides:
//!
//! - The framed, obfuscated wire protocol (CRC16-XMODEM, XOR key)
//! - Handshake, firmware classification and EEPROM capacity probing
//! - Flat and banked addressing for EEPROMs from 8 KiB up to 512 KiB
//! - Page-wise transfers with progress reporting and cancellation
//! - Gated program sequences (fonts, tone table, pinyin index, SSB patch),
//!   erase, backup/restore, calibration and configuration
//!
//! ## Features
//!
//! - `native` (default): Native serial port support
//! - `serde`: Serialization support for configuration and capability types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::ops::ControlFlow;
//! use k5tool::{DeviceSession, SerialConfig, program};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "native")]
//!     {
//!         let mut session = DeviceSession::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//!         println!("{} with {}", session.firmware(), session.tier());
//!
//!         let image = program::backup(&mut session, &mut |p| {
//!             println!("{}: {:.0}%", p.label, p.fraction() * 100.0);
//!             ControlFlow::Continue(())
//!         })?;
//!         std::fs::write("eeprom.bin", image)?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod error;
pub mod memory;
pub mod port;
pub mod program;
pub mod protocol;
pub mod transfer;
pub mod transport;

#[cfg(test)]
mod mock;

// Re-exports for convenience
#[cfg(feature = "native")]
pub use port::{NativePort, NativePortEnumerator};
pub use {
    device::{DeviceCapability, DeviceSession, FirmwareClassification, FirmwareVariant},
    error::{
        CapabilityError, Error, FrameError, Result, SequenceError, TransferError, TransportError,
    },
    memory::{AddressSpace, BankAddress, CapacityTier, Regime, TransferPlan, to_bank},
    port::{Port, PortEnumerator, PortInfo, SerialConfig},
    program::{PayloadKind, PayloadSet, ProgramStep, Requirement, SequenceReport},
    transfer::{ProgressFn, TransferEngine, TransferProgress},
    transport::{Transport, TransportConfig},
};
