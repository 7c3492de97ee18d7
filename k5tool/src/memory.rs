//! EEPROM address space.
//!
//! The first 8 KiB are reached with the flat read/write commands and a
//! 16-bit offset. Extended radios expose up to 512 KiB through the banked
//! commands, which take a bank number and a 16-bit offset inside the bank:
//!
//! ```text
//! logical 0x0FFF0 -> bank 0, offset 0xFFF0
//! logical 0x10070 -> bank 1, offset 0x0070
//! ```

use std::fmt;

use crate::error::TransferError;

/// Size of one bank.
pub const BANK_SIZE: u32 = 0x10000;

/// Largest transfer unit per exchange.
pub const PAGE_SIZE: usize = 128;

/// End of the region reachable with flat commands.
pub const FLAT_LIMIT: u32 = 0x2000;

/// EEPROM size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CapacityTier {
    /// 8 KiB (stock).
    #[default]
    Stock,
    /// 128 KiB (1 Mbit).
    Kib128,
    /// 256 KiB (2 Mbit).
    Kib256,
    /// 384 KiB (3 Mbit).
    Kib384,
    /// 512 KiB (4 Mbit).
    Kib512,
}

impl CapacityTier {
    /// All tiers, smallest first.
    pub const ALL: [Self; 5] = [
        Self::Stock,
        Self::Kib128,
        Self::Kib256,
        Self::Kib384,
        Self::Kib512,
    ];

    /// Tier from its index (0..=4).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Index of the tier (0..=4).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Addressable bytes.
    pub fn capacity(self) -> u32 {
        match self {
            Self::Stock => FLAT_LIMIT,
            Self::Kib128 => 0x20000,
            Self::Kib256 => 0x40000,
            Self::Kib384 => 0x60000,
            Self::Kib512 => 0x80000,
        }
    }

    /// Smallest tier holding the exclusive end address `end`.
    pub fn covering(end: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| end <= t.capacity())
    }
}

impl fmt::Display for CapacityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} KiB", self.capacity() / 1024)
    }
}

/// Bank number and offset inside the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankAddress {
    /// Bank number.
    pub bank: u16,
    /// Offset inside the bank.
    pub offset: u16,
}

impl fmt::Display for BankAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:04X}", self.bank, self.offset)
    }
}

/// Split a logical address into bank and offset.
#[allow(clippy::cast_possible_truncation)]
pub fn to_bank(logical: u32) -> BankAddress {
    BankAddress {
        bank: (logical / BANK_SIZE) as u16,
        offset: (logical % BANK_SIZE) as u16,
    }
}

/// Command family used for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// Flat commands, 16-bit offset.
    Flat,
    /// Banked commands, bank plus offset.
    Banked,
}

impl Regime {
    /// Pick the regime for a whole transfer.
    pub fn select(start: u32, len: usize) -> Self {
        if u64::from(start) + len as u64 <= u64::from(FLAT_LIMIT) {
            Self::Flat
        } else {
            Self::Banked
        }
    }
}

/// Address space of a connected radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace {
    tier: CapacityTier,
}

impl AddressSpace {
    /// Address space for the given tier.
    pub fn new(tier: CapacityTier) -> Self {
        Self { tier }
    }

    /// Capacity tier.
    pub fn tier(&self) -> CapacityTier {
        self.tier
    }

    /// Addressable bytes.
    pub fn capacity(&self) -> u32 {
        self.tier.capacity()
    }

    /// Whether `start..start+len` lies inside the space.
    pub fn contains(&self, start: u32, len: usize) -> bool {
        u64::from(start) + len as u64 <= u64::from(self.capacity())
    }

    /// Plan a transfer, rejecting ranges beyond the capacity.
    pub fn plan(&self, start: u32, len: usize) -> Result<TransferPlan, TransferError> {
        if !self.contains(start, len) {
            return Err(TransferError::OutOfRange {
                start,
                len,
                capacity: self.capacity(),
            });
        }
        Ok(TransferPlan::new(start, len))
    }
}

/// Page layout of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    /// First logical address.
    pub start: u32,
    /// Bytes to move.
    pub len: usize,
    /// Bytes per page.
    pub page_size: usize,
    /// Command family.
    pub regime: Regime,
}

impl TransferPlan {
    /// Plan with the default page size.
    pub fn new(start: u32, len: usize) -> Self {
        Self {
            start,
            len,
            page_size: PAGE_SIZE,
            regime: Regime::select(start, len),
        }
    }

    /// Number of pages, the last one possibly short.
    pub fn page_count(&self) -> usize {
        self.len.div_ceil(self.page_size)
    }

    /// Iterate the pages in order.
    pub fn pages(&self) -> PageCursor {
        PageCursor::new(self)
    }
}

/// One page of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page index.
    pub index: usize,
    /// Logical address of the first byte.
    pub logical: u32,
    /// Bank address of the first byte.
    pub address: BankAddress,
    /// Range of the page inside the transfer buffer.
    pub range: std::ops::Range<usize>,
}

impl Page {
    /// Bytes in this page.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the page is empty.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Walks the pages of a transfer, carrying bank and offset forward instead
/// of dividing for every page.
#[derive(Debug, Clone)]
pub struct PageCursor {
    index: usize,
    done: usize,
    len: usize,
    page_size: usize,
    bank: u32,
    offset: u32,
}

impl PageCursor {
    fn new(plan: &TransferPlan) -> Self {
        Self {
            index: 0,
            done: 0,
            len: plan.len,
            page_size: plan.page_size,
            bank: plan.start / BANK_SIZE,
            offset: plan.start % BANK_SIZE,
        }
    }
}

impl Iterator for PageCursor {
    type Item = Page;

    #[allow(clippy::cast_possible_truncation)]
    fn next(&mut self) -> Option<Page> {
        if self.done >= self.len {
            return None;
        }
        let size = self.page_size.min(self.len - self.done);
        let page = Page {
            index: self.index,
            logical: self.bank * BANK_SIZE + self.offset,
            address: BankAddress {
                bank: self.bank as u16,
                offset: self.offset as u16,
            },
            range: self.done..self.done + size,
        };

        self.index += 1;
        self.done += size;
        self.offset += size as u32;
        if self.offset >= BANK_SIZE {
            self.bank += 1;
            self.offset -= BANK_SIZE;
        }
        Some(page)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.len - self.done).div_ceil(self.page_size);
        (left, Some(left))
    }
}

impl ExactSizeIterator for PageCursor {}
