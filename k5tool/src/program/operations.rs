//! Whole-radio operations built on sequences.

use log::info;

use crate::device::DeviceSession;
use crate::error::{Error, Result};
use crate::port::Port;
use crate::program::payload::PayloadKind;
use crate::program::region::{self, Region};
use crate::program::sequencer::{SequenceReport, run_sequence};
use crate::program::step::ProgramStep;
use crate::transfer::ProgressFn;

/// Value of an erased EEPROM byte.
pub const ERASED: u8 = 0xFF;

/// Fill the whole detected EEPROM with `0xFF`, then reset.
///
/// Stock radios only get the flat 8 KiB erased.
pub fn erase<P: Port>(
    session: &mut DeviceSession<P>,
    progress: &mut ProgressFn<'_>,
) -> Result<SequenceReport> {
    let capacity = session.address_space().capacity() as usize;
    info!("Erasing {capacity} bytes of EEPROM");
    let step = ProgramStep::new("erase", 0, vec![ERASED; capacity]);
    Ok(run_sequence(session, &[step], progress)?)
}

/// Read the whole detected EEPROM.
pub fn backup<P: Port>(
    session: &mut DeviceSession<P>,
    progress: &mut ProgressFn<'_>,
) -> Result<Vec<u8>> {
    let capacity = session.address_space().capacity() as usize;
    info!("Backing up {capacity} bytes of EEPROM");
    Ok(session.engine().read(0, capacity, "backup", progress)?)
}

/// Write a full EEPROM image taken by [`backup`], then reset.
pub fn restore<P: Port>(
    session: &mut DeviceSession<P>,
    image: &[u8],
    progress: &mut ProgressFn<'_>,
) -> Result<SequenceReport> {
    let capacity = session.address_space().capacity() as usize;
    if image.len() != capacity {
        return Err(Error::InvalidPayload(format!(
            "image is {} bytes, radio holds {capacity}",
            image.len()
        )));
    }
    info!("Restoring {capacity} bytes of EEPROM");
    let step = ProgramStep::new("restore", 0, image);
    Ok(run_sequence(session, &[step], progress)?)
}

/// Read the calibration block.
pub fn read_calibration<P: Port>(
    session: &mut DeviceSession<P>,
    progress: &mut ProgressFn<'_>,
) -> Result<Vec<u8>> {
    read_region(session, region::CALIBRATION, progress)
}

/// Write the calibration block, then reset.
pub fn write_calibration<P: Port>(
    session: &mut DeviceSession<P>,
    data: &[u8],
    progress: &mut ProgressFn<'_>,
) -> Result<SequenceReport> {
    write_region(session, region::CALIBRATION, data, progress)
}

/// Read the configuration block.
pub fn read_config<P: Port>(
    session: &mut DeviceSession<P>,
    progress: &mut ProgressFn<'_>,
) -> Result<Vec<u8>> {
    read_region(session, region::CONFIG, progress)
}

/// Write the configuration block, then reset.
pub fn write_config<P: Port>(
    session: &mut DeviceSession<P>,
    data: &[u8],
    progress: &mut ProgressFn<'_>,
) -> Result<SequenceReport> {
    write_region(session, region::CONFIG, data, progress)
}

/// Write one payload to its region, then reset.
pub fn write_payload<P: Port>(
    session: &mut DeviceSession<P>,
    kind: PayloadKind,
    data: &[u8],
    progress: &mut ProgressFn<'_>,
) -> Result<SequenceReport> {
    let step = ProgramStep::for_payload(kind, data)?;
    Ok(run_sequence(session, &[step], progress)?)
}

fn read_region<P: Port>(
    session: &mut DeviceSession<P>,
    region: Region,
    progress: &mut ProgressFn<'_>,
) -> Result<Vec<u8>> {
    Ok(session
        .engine()
        .read(region.start, region.len(), region.name, progress)?)
}

fn write_region<P: Port>(
    session: &mut DeviceSession<P>,
    region: Region,
    data: &[u8],
    progress: &mut ProgressFn<'_>,
) -> Result<SequenceReport> {
    if data.len() != region.len() {
        return Err(Error::InvalidPayload(format!(
            "{} block is {} bytes, expected {}",
            region.name,
            data.len(),
            region.len()
        )));
    }
    let step = ProgramStep::for_region(region.name, region, data)?;
    Ok(run_sequence(session, &[step], progress)?)
}
