//! Ordered execution of program steps.
//!
//! Steps run strictly in order. Each one is gated against the capability
//! detected at connect time before any byte is sent, and the first failing
//! step ends the sequence without a reset so the radio stays in programming
//! mode. When every step succeeds the radio is reset once, unless the last
//! step asks to continue.

use log::{info, warn};

use crate::device::{DeviceSession, FirmwareClassification, FirmwareVariant};
use crate::error::{CapabilityError, Error, Result, SequenceError};
use crate::port::Port;
use crate::program::payload::{PayloadKind, PayloadSet};
use crate::program::step::{ProgramStep, gate};
use crate::transfer::ProgressFn;

/// First firmware version using the split font layout.
pub const SPLIT_LAYOUT_VERSION: u16 = 118;

/// First firmware version with a pinyin index, in the old format.
pub const PINYIN_OLD_VERSION: u16 = 123;

/// First firmware version using the new pinyin index format.
pub const PINYIN_NEW_VERSION: u16 = 124;

/// Outcome of a sequence that ran to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceReport {
    /// Steps completed.
    pub completed: usize,
    /// Whether the radio was reset afterwards.
    pub reset_sent: bool,
}

/// Run `steps` in order on `session`.
pub fn run_sequence<P: Port>(
    session: &mut DeviceSession<P>,
    steps: &[ProgramStep],
    progress: &mut ProgressFn<'_>,
) -> std::result::Result<SequenceReport, SequenceError> {
    let total = steps.len();

    for (index, step) in steps.iter().enumerate() {
        info!(
            "Step {}/{total}: {} ({} bytes at 0x{:05X})",
            index + 1,
            step.name,
            step.payload.len(),
            step.address
        );

        let outcome = match gate(session.capability(), &step.requirement) {
            Ok(()) => session
                .engine()
                .write(step.address, &step.payload, &step.name, progress)
                .map_err(Error::from),
            Err(e) => Err(e.into()),
        };

        if let Err(e) = outcome {
            warn!("Step {} ({}) failed: {e}", index + 1, step.name);
            return Err(SequenceError {
                index,
                step: step.name.clone(),
                completed: index,
                source: Box::new(e),
            });
        }
    }

    let reset_sent = match steps.last() {
        Some(last) if !last.continue_after => {
            session.reset().map_err(|e| SequenceError {
                index: total,
                step: "reset".to_string(),
                completed: total,
                source: Box::new(e),
            })?;
            true
        },
        _ => false,
    };

    info!("Sequence complete: {total} step(s)");
    Ok(SequenceReport {
        completed: total,
        reset_sent,
    })
}

/// Derive the steps that install the payload set matching `firmware`.
///
/// Every step but the last is marked to continue.
pub fn plan_auto_sequence(
    firmware: &FirmwareClassification,
    payloads: &PayloadSet,
) -> Result<Vec<ProgramStep>> {
    let Some(version) = firmware.version else {
        return Err(CapabilityError::WrongVariant {
            required: FirmwareVariant::CapableExtended,
            actual: firmware.variant,
        }
        .into());
    };

    let mut kinds = Vec::new();
    if version < SPLIT_LAYOUT_VERSION {
        kinds.push(PayloadKind::LegacyFont);
    } else {
        if version == SPLIT_LAYOUT_VERSION && firmware.variant_code == Some('H') {
            kinds.push(PayloadKind::FontUncompressed);
        } else {
            kinds.push(PayloadKind::FontCompressed);
        }
        kinds.push(PayloadKind::FontConfig);
        kinds.push(PayloadKind::ToneTable);
        if version >= PINYIN_NEW_VERSION {
            kinds.push(PayloadKind::PinyinIndexNew);
        } else if version == PINYIN_OLD_VERSION {
            kinds.push(PayloadKind::PinyinIndexOld);
        }
        if firmware.ssb {
            kinds.push(PayloadKind::SsbPatch);
        }
    }

    let last = kinds.len() - 1;
    kinds
        .into_iter()
        .enumerate()
        .map(|(i, kind)| -> Result<ProgramStep> {
            let step = ProgramStep::for_payload(kind, payloads.require(kind)?)?;
            Ok(if i < last { step.continuing() } else { step })
        })
        .collect()
}

/// Plan the payload set for the connected firmware and run it.
pub fn detect_and_run_auto_sequence<P: Port>(
    session: &mut DeviceSession<P>,
    payloads: &PayloadSet,
    progress: &mut ProgressFn<'_>,
) -> Result<SequenceReport> {
    let steps = plan_auto_sequence(session.firmware(), payloads)?;
    info!(
        "Installing {} payload(s) for {}",
        steps.len(),
        session.version()
    );
    Ok(run_sequence(session, &steps, progress)?)
}
