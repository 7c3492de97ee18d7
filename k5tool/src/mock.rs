//! Test doubles for the radio's serial link.

use std::collections::{HashSet, VecDeque};
use std::io::{Read, Write};
use std::ops::Range;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::device::DeviceSession;
use crate::error::Result;
use crate::port::{DEFAULT_TIMEOUT, Port};
use crate::protocol::crc::crc16_xmodem;
use crate::protocol::frame::{FRAME_START, encode_reply};
use crate::protocol::obfuscation;
use crate::transport::TransportConfig;

fn timed_out() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::TimedOut, "no data")
}

/// Port that answers each write with the next scripted byte sequence.
pub(crate) struct ScriptedPort {
    replies: VecDeque<Vec<u8>>,
    read_buf: VecDeque<u8>,
    write_buf: Vec<u8>,
    writes: usize,
    fail_writes: bool,
    timeout: Duration,
}

impl ScriptedPort {
    pub(crate) fn new(replies: Vec<Vec<u8>>) -> Self {
        Self {
            replies: replies.into(),
            read_buf: VecDeque::new(),
            write_buf: Vec::new(),
            writes: 0,
            fail_writes: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub(crate) fn fail_writes(&mut self) {
        self.fail_writes = true;
    }

    /// Queue bytes as if they arrived without a request.
    pub(crate) fn deliver(&mut self, bytes: &[u8]) {
        self.read_buf.extend(bytes.iter().copied());
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.write_buf
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes
    }
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.read_buf.is_empty() {
            return Err(timed_out());
        }
        let n = buf.len().min(self.read_buf.len());
        for (dst, src) in buf.iter_mut().zip(self.read_buf.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.fail_writes {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "cable unplugged",
            ));
        }
        self.writes += 1;
        self.write_buf.extend_from_slice(buf);
        if let Some(reply) = self.replies.pop_front() {
            self.read_buf.extend(reply);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Port for ScriptedPort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.read_buf.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A radio with a given firmware string and EEPROM size.
///
/// Decodes every request frame, applies it to an in-memory EEPROM and
/// queues the reply the real radio would send. Banked accesses past the end
/// of the EEPROM read as `0xFF` and drop writes.
pub(crate) struct SimulatedRadio {
    version: String,
    memory: Vec<u8>,
    read_only: Option<Range<usize>>,
    input: Vec<u8>,
    read_buf: VecDeque<u8>,
    requests: Vec<Vec<u8>>,
    flat_writes: Vec<(u16, usize)>,
    banked_writes: Vec<(u16, u16, usize)>,
    resets: usize,
    ignored_hellos: usize,
    dropped: HashSet<usize>,
    corrupted: HashSet<usize>,
    truncate_reads: bool,
    timeout: Duration,
}

impl SimulatedRadio {
    pub(crate) fn new(version: &str, capacity: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let memory = (0..capacity).map(|i| (i * 31 + i / 251) as u8).collect();
        Self {
            version: version.to_string(),
            memory,
            read_only: None,
            input: Vec::new(),
            read_buf: VecDeque::new(),
            requests: Vec::new(),
            flat_writes: Vec::new(),
            banked_writes: Vec::new(),
            resets: 0,
            ignored_hellos: 0,
            dropped: HashSet::new(),
            corrupted: HashSet::new(),
            truncate_reads: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Logical addresses that acknowledge writes but never change.
    pub(crate) fn set_read_only(&mut self, range: Range<usize>) {
        self.read_only = Some(range);
    }

    /// Stay silent for the next `count` hello frames.
    pub(crate) fn ignore_hellos(&mut self, count: usize) {
        self.ignored_hellos = count;
    }

    /// Send no reply to request number `index` (zero-based, all commands).
    pub(crate) fn drop_reply(&mut self, index: usize) {
        self.dropped.insert(index);
    }

    /// Answer request number `index` with a wrong acknowledgement echo.
    pub(crate) fn corrupt_ack(&mut self, index: usize) {
        self.corrupted.insert(index);
    }

    /// Return one byte less than requested on reads.
    pub(crate) fn truncate_reads(&mut self, on: bool) {
        self.truncate_reads = on;
    }

    pub(crate) fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// `(offset, len)` of every flat write.
    pub(crate) fn flat_writes(&self) -> Vec<(u16, usize)> {
        self.flat_writes.clone()
    }

    /// `(bank, offset, len)` of every banked write.
    pub(crate) fn banked_writes(&self) -> Vec<(u16, u16, usize)> {
        self.banked_writes.clone()
    }

    pub(crate) fn resets(&self) -> usize {
        self.resets
    }

    fn read_mem(&self, logical: usize, len: usize) -> Vec<u8> {
        (logical..logical + len)
            .map(|a| self.memory.get(a).copied().unwrap_or(0xFF))
            .collect()
    }

    fn write_mem(&mut self, logical: usize, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            let addr = logical + i;
            if self.read_only.as_ref().is_some_and(|r| r.contains(&addr)) {
                continue;
            }
            if let Some(slot) = self.memory.get_mut(addr) {
                *slot = b;
            }
        }
    }

    /// Pull complete request frames out of the input buffer.
    fn process_input(&mut self) {
        loop {
            let Some(start) = self.input.windows(2).position(|w| w == FRAME_START) else {
                self.input.clear();
                return;
            };
            self.input.drain(..start);
            if self.input.len() < 4 {
                return;
            }
            let len = usize::from(self.input[2]);
            let total = 4 + len + 2 + 2;
            if self.input.len() < total {
                return;
            }
            let frame: Vec<u8> = self.input.drain(..total).collect();
            let clear = obfuscation::deobfuscate(&frame[4..4 + len + 2]);
            let (body, crc) = clear.split_at(len);
            assert_eq!(
                u16::from_le_bytes([crc[0], crc[1]]),
                crc16_xmodem(body),
                "request checksum"
            );
            assert_eq!(&frame[total - 2..], &[0xDC, 0xBA], "request footer");
            self.handle(body.to_vec());
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn handle(&mut self, body: Vec<u8>) {
        let index = self.requests.len();
        self.requests.push(body.clone());
        let opcode = u16::from_le_bytes([body[0], body[1]]);
        let u16_at = |i: usize| u16::from_le_bytes([body[i], body[i + 1]]);

        let reply = match opcode {
            0x0514 => {
                if self.ignored_hellos > 0 {
                    self.ignored_hellos -= 1;
                    None
                } else {
                    let mut payload = vec![0x15, 0x05, 0x14, 0x00];
                    let mut version = self.version.clone().into_bytes();
                    version.resize(16, 0);
                    payload.extend_from_slice(&version);
                    payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
                    Some(payload)
                }
            },
            0x051B | 0x052B => {
                let addr = u16_at(4);
                let mut len = usize::from(body[6]);
                let logical = if opcode == 0x051B {
                    usize::from(addr)
                } else {
                    usize::from(addr) * 0x10000 + usize::from(u16_at(12))
                };
                let mut payload = vec![(opcode as u8) + 1, 0x05, (len + 4) as u8, 0x00];
                payload.extend_from_slice(&body[4..8]);
                if self.truncate_reads {
                    len -= 1;
                }
                payload.extend(self.read_mem(logical, len));
                Some(payload)
            },
            0x051D => {
                let offset = u16_at(4);
                let len = usize::from(body[6]);
                let data = body[12..12 + len].to_vec();
                self.write_mem(usize::from(offset), &data);
                self.flat_writes.push((offset, len));
                Some(vec![0x1E, 0x05, 0x02, 0x00, body[4], body[5]])
            },
            0x0538 => {
                let bank = u16_at(4);
                let offset = u16_at(12);
                let len = usize::from(body[6]) - 2;
                let data = body[14..14 + len].to_vec();
                self.write_mem(usize::from(bank) * 0x10000 + usize::from(offset), &data);
                self.banked_writes.push((bank, offset, len));
                Some(vec![0x1E, 0x05, 0x02, 0x00, body[4], body[5]])
            },
            0x05DD => {
                self.resets += 1;
                None
            },
            other => panic!("unexpected opcode 0x{other:04X}"),
        };

        if self.dropped.contains(&index) {
            return;
        }
        if let Some(mut payload) = reply {
            if self.corrupted.contains(&index) && payload.len() > 4 {
                payload[4] ^= 0xFF;
            }
            self.read_buf.extend(encode_reply(&payload));
        }
    }
}

impl Read for SimulatedRadio {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.read_buf.is_empty() {
            return Err(timed_out());
        }
        let n = buf.len().min(self.read_buf.len());
        for (dst, src) in buf.iter_mut().zip(self.read_buf.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl Write for SimulatedRadio {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.input.extend_from_slice(buf);
        self.process_input();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Port for SimulatedRadio {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.read_buf.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated"
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Connect to a simulated radio with a fixed probe seed.
pub(crate) fn connect(radio: SimulatedRadio) -> DeviceSession<SimulatedRadio> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = StdRng::seed_from_u64(0x4B35);
    DeviceSession::connect_with_rng(radio, TransportConfig::default(), &mut rng).unwrap()
}
