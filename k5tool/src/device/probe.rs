//! EEPROM capacity detection.
//!
//! Each tier above the stock 8 KiB is tested by writing a random pattern to
//! the last 8 bytes of the tier (bank `2i - 1`, offset `0xFFF8`) and reading
//! it back. The original bytes are put back after every probe, whether the
//! pattern stuck or not. Probing stops at the first tier that does not hold
//! the pattern.

use log::{debug, info, warn};
use rand::RngCore;

use crate::error::TransportError;
use crate::memory::CapacityTier;
use crate::port::Port;
use crate::protocol::command::{CommandFrame, READ_DATA_OFFSET, is_write_ack};
use crate::transport::Transport;

/// Offset inside the probed bank.
pub const PROBE_OFFSET: u16 = 0xFFF8;

/// Bytes written per probe.
pub const PROBE_LEN: usize = 8;

/// Bank holding the last bytes of tier `index` (1..=4).
#[allow(clippy::cast_possible_truncation)]
pub fn probe_bank(index: usize) -> u16 {
    (2 * index - 1) as u16
}

/// Detect the capacity tier using the thread-local RNG.
pub fn probe_capacity<P: Port>(
    transport: &mut Transport<P>,
) -> Result<CapacityTier, TransportError> {
    probe_capacity_with(transport, &mut rand::thread_rng())
}

/// Detect the capacity tier drawing probe patterns from `rng`.
///
/// Timeouts and malformed replies mark a tier as absent. Channel failures
/// abort the probe.
pub fn probe_capacity_with<P: Port, R: RngCore + ?Sized>(
    transport: &mut Transport<P>,
    rng: &mut R,
) -> Result<CapacityTier, TransportError> {
    let mut detected = CapacityTier::Stock;

    for tier in CapacityTier::ALL.into_iter().skip(1) {
        let bank = probe_bank(tier.index());
        debug!("Probing {tier} at bank {bank} offset 0x{PROBE_OFFSET:04X}");

        match probe_one(transport, bank, rng) {
            Ok(Probe { held, restored }) => {
                if held {
                    detected = tier;
                } else {
                    debug!("Bank {bank} did not hold the probe pattern");
                }
                if !held || !restored {
                    break;
                }
            },
            Err(e @ TransportError::Io(_)) => return Err(e),
            Err(e) => {
                debug!("Bank {bank} probe failed: {e}");
                break;
            },
        }
    }

    info!("Detected EEPROM capacity: {detected}");
    Ok(detected)
}

/// Result of probing one bank.
struct Probe {
    /// The pattern was read back intact.
    held: bool,
    /// The original bytes were written back and acknowledged.
    restored: bool,
}

fn probe_one<P: Port, R: RngCore + ?Sized>(
    transport: &mut Transport<P>,
    bank: u16,
    rng: &mut R,
) -> Result<Probe, TransportError> {
    let Some(original) = read_probe(transport, bank)? else {
        return Ok(Probe {
            held: false,
            restored: true,
        });
    };

    let mut pattern = [0u8; PROBE_LEN];
    rng.fill_bytes(&mut pattern);
    if pattern == original {
        pattern.iter_mut().for_each(|b| *b = !*b);
    }

    let outcome = write_probe(transport, bank, &pattern)
        .and_then(|acked| Ok(acked && read_probe(transport, bank)? == Some(pattern)));

    let restored = write_probe(transport, bank, &original);
    match restored {
        Ok(true) => {},
        Ok(false) => warn!("Restore of bank {bank} offset 0x{PROBE_OFFSET:04X} was not acknowledged"),
        Err(ref e) => warn!("Restore of bank {bank} offset 0x{PROBE_OFFSET:04X} failed: {e}"),
    }

    let held = outcome?;
    match restored {
        Err(e @ TransportError::Io(_)) => Err(e),
        Ok(true) => Ok(Probe {
            held,
            restored: true,
        }),
        _ => Ok(Probe {
            held,
            restored: false,
        }),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn read_probe<P: Port>(
    transport: &mut Transport<P>,
    bank: u16,
) -> Result<Option<[u8; PROBE_LEN]>, TransportError> {
    let body = CommandFrame::read_extra_eeprom(bank, PROBE_OFFSET, PROBE_LEN as u8).build();
    let reply = transport.exchange(&body)?;
    Ok(reply
        .get(READ_DATA_OFFSET..READ_DATA_OFFSET + PROBE_LEN)
        .and_then(|data| data.try_into().ok()))
}

fn write_probe<P: Port>(
    transport: &mut Transport<P>,
    bank: u16,
    data: &[u8; PROBE_LEN],
) -> Result<bool, TransportError> {
    let body = CommandFrame::write_extra_eeprom(bank, PROBE_OFFSET, data)?.build();
    let reply = transport.exchange(&body)?;
    Ok(is_write_ack(&reply, bank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::SimulatedRadio;
    use crate::transport::TransportConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn probe(radio: SimulatedRadio) -> (CapacityTier, SimulatedRadio) {
        let mut transport = Transport::new(radio, TransportConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let tier = probe_capacity_with(&mut transport, &mut rng).unwrap();
        (tier, transport.into_inner())
    }

    #[test]
    fn test_probe_bank_numbers() {
        let banks: Vec<u16> = (1..=4).map(probe_bank).collect();
        assert_eq!(banks, vec![1, 3, 5, 7]);
    }

    #[test]
    fn test_probe_each_tier() {
        for tier in CapacityTier::ALL.into_iter().skip(1) {
            let radio = SimulatedRadio::new("LOSEHU124K", tier.capacity() as usize);
            let (detected, _) = probe(radio);
            assert_eq!(detected, tier);
        }
    }

    #[test]
    fn test_probe_restores_originals() {
        let radio = SimulatedRadio::new("LOSEHU124K", 0x40000);
        let before = radio.memory().to_vec();
        let (detected, radio) = probe(radio);
        assert_eq!(detected, CapacityTier::Kib256);
        assert_eq!(radio.memory(), before.as_slice());
        // Two successful probes plus one failed probe, each read/write/read/restore.
        assert_eq!(radio.request_count(), 12);
    }

    #[test]
    fn test_probe_stops_at_first_failure() {
        // Bank 3 is stuck, bank 5 would be writable again.
        let mut radio = SimulatedRadio::new("LOSEHU124K", 0x60000);
        radio.set_read_only(0x3FFF8..0x40000);
        let (detected, radio) = probe(radio);
        assert_eq!(detected, CapacityTier::Kib128);
        assert!(
            radio
                .banked_writes()
                .iter()
                .all(|&(bank, _, _)| bank == 1 || bank == 3)
        );
    }

    #[test]
    fn test_probe_restores_after_failed_readback() {
        let mut radio = SimulatedRadio::new("LOSEHU124K", 0x20000);
        let before = radio.memory().to_vec();
        // Reply to the first read, the pattern write and the restore; drop the readback.
        radio.drop_reply(2);
        let (detected, radio) = probe(radio);
        assert_eq!(detected, CapacityTier::Stock);
        assert_eq!(radio.memory(), before.as_slice());
        assert_eq!(radio.banked_writes().len(), 2);
    }

    #[test]
    fn test_probe_stops_when_restore_unacknowledged() {
        let mut radio = SimulatedRadio::new("LOSEHU124K", 0x40000);
        // Read, pattern write, readback, then the restore reply goes missing.
        radio.drop_reply(3);
        let (detected, radio) = probe(radio);
        assert_eq!(detected, CapacityTier::Kib128);
        assert_eq!(radio.request_count(), 4);
        assert!(radio.banked_writes().iter().all(|&(bank, _, _)| bank == 1));
    }

    #[test]
    fn test_probe_silent_device() {
        let mut radio = SimulatedRadio::new("LOSEHU124K", 0x80000);
        radio.drop_reply(0);
        let (detected, radio) = probe(radio);
        assert_eq!(detected, CapacityTier::Stock);
        assert!(radio.banked_writes().is_empty());
    }
}
