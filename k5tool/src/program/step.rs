//! Program steps and capability gates.

use crate::device::{DeviceCapability, FirmwareVariant};
use crate::error::{CapabilityError, Result};
use crate::memory::{CapacityTier, FLAT_LIMIT};
use crate::program::payload::PayloadKind;
use crate::program::region::Region;

/// What a step needs from the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Requirement {
    /// Weakest acceptable firmware.
    pub variant: FirmwareVariant,
    /// Smallest acceptable EEPROM.
    pub min_tier: CapacityTier,
}

impl Requirement {
    /// Satisfied by every radio.
    pub const NONE: Self = Self {
        variant: FirmwareVariant::Unknown,
        min_tier: CapacityTier::Stock,
    };

    /// Requirement for touching `start..start+len`.
    ///
    /// Anything past the flat 8 KiB needs banked commands and an EEPROM that
    /// reaches the end of the range.
    pub fn for_range(start: u32, len: usize) -> Self {
        let end = u64::from(start) + len as u64;
        if end <= u64::from(FLAT_LIMIT) {
            return Self::NONE;
        }
        let min_tier = u32::try_from(end)
            .ok()
            .and_then(CapacityTier::covering)
            .unwrap_or(CapacityTier::Kib512);
        Self {
            variant: FirmwareVariant::CapableExtended,
            min_tier,
        }
    }
}

/// Check a requirement against a connected radio. Does no I/O.
pub fn gate(
    capability: &DeviceCapability,
    requirement: &Requirement,
) -> std::result::Result<(), CapabilityError> {
    let actual = capability.firmware.variant;
    if actual < requirement.variant {
        return Err(CapabilityError::WrongVariant {
            required: requirement.variant,
            actual,
        });
    }
    if capability.tier < requirement.min_tier {
        return Err(CapabilityError::InsufficientCapacity {
            required: requirement.min_tier,
            actual: capability.tier,
        });
    }
    Ok(())
}

/// One write in a program sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramStep {
    /// Name used in progress and errors.
    pub name: String,
    /// Logical start address.
    pub address: u32,
    /// Bytes to write.
    pub payload: Vec<u8>,
    /// Gate checked before the step runs.
    pub requirement: Requirement,
    /// More steps follow; do not reset after this one.
    pub continue_after: bool,
}

impl ProgramStep {
    /// Step writing `payload` at `address`, gated by the range it covers.
    pub fn new(name: impl Into<String>, address: u32, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        Self {
            name: name.into(),
            address,
            requirement: Requirement::for_range(address, payload.len()),
            payload,
            continue_after: false,
        }
    }

    /// Step writing `payload` into `region` after checking that it fits.
    pub fn for_region(name: impl Into<String>, region: Region, payload: &[u8]) -> Result<Self> {
        region.check(payload)?;
        Ok(Self::new(name, region.start, payload))
    }

    /// Step placing a payload of the given kind.
    pub fn for_payload(kind: PayloadKind, payload: &[u8]) -> Result<Self> {
        Self::for_region(kind.name(), kind.region(), payload)
    }

    /// Mark that more steps follow.
    #[must_use]
    pub fn continuing(mut self) -> Self {
        self.continue_after = true;
        self
    }

    /// Override the derived requirement.
    #[must_use]
    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }
}
