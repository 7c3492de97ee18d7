//! EEPROM region map.
//!
//! ```text
//! 0x00000 +------------------+
//!         | config           |
//! 0x01D00 +------------------+
//!         | (unused)         |
//! 0x01E00 +------------------+
//!         | calibration      |
//! 0x02000 +------------------+  legacy layout     current layout
//!         |                  |  legacy font       font config  0x02480
//!         |                  |                    tone table   0x02C00
//!         |                  |                    font         0x02E00
//! 0x20000 +------------------+
//!         | pinyin index     |
//! 0x3C228 +------------------+
//!         | SSB patch        |
//! 0x40000 +------------------+
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// A named address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Name used in logs and errors.
    pub name: &'static str,
    /// First address.
    pub start: u32,
    /// Exclusive end address.
    pub end: u32,
}

impl Region {
    const fn new(name: &'static str, start: u32, end: u32) -> Self {
        Self { name, start, end }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Whether two regions share an address.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Reject payloads that are empty or larger than the region.
    pub fn check(&self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Err(Error::InvalidPayload(format!("{} payload is empty", self.name)));
        }
        if payload.len() > self.len() {
            return Err(Error::InvalidPayload(format!(
                "{} payload is {} bytes, region {self} holds {}",
                self.name,
                payload.len(),
                self.len()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:05X}-0x{:05X}", self.start, self.end)
    }
}

/// Radio settings and channels.
pub const CONFIG: Region = Region::new("config", 0x0000, 0x1D00);

/// Factory calibration.
pub const CALIBRATION: Region = Region::new("calibration", 0x1E00, 0x2000);

/// Font of firmware before version 118.
pub const LEGACY_FONT: Region = Region::new("legacy font", 0x2000, 0x20000);

/// Font metrics of firmware 118 and later.
pub const FONT_CONFIG: Region = Region::new("font config", 0x2480, 0x2C00);

/// Tone table.
pub const TONE_TABLE: Region = Region::new("tone table", 0x2C00, 0x2E00);

/// GB2312 font.
pub const FONT: Region = Region::new("font", 0x2E00, 0x20000);

/// Pinyin input index.
pub const PINYIN_INDEX: Region = Region::new("pinyin index", 0x20000, 0x3C228);

/// SSB patch.
pub const SSB_PATCH: Region = Region::new("SSB patch", 0x3C228, 0x40000);

/// Regions used by firmware before version 118.
pub const LEGACY_LAYOUT: [Region; 3] = [CONFIG, CALIBRATION, LEGACY_FONT];

/// Regions used by firmware 118 and later.
pub const CURRENT_LAYOUT: [Region; 7] = [
    CONFIG,
    CALIBRATION,
    FONT_CONFIG,
    TONE_TABLE,
    FONT,
    PINYIN_INDEX,
    SSB_PATCH,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint(layout: &[Region]) {
        for (i, a) in layout.iter().enumerate() {
            for b in &layout[i + 1..] {
                assert!(!a.overlaps(b), "{} {a} overlaps {} {b}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_layouts_disjoint() {
        assert_disjoint(&LEGACY_LAYOUT);
        assert_disjoint(&CURRENT_LAYOUT);
    }

    #[test]
    fn test_legacy_font_overlaps_current_layout() {
        assert!(LEGACY_FONT.overlaps(&FONT));
        assert!(LEGACY_FONT.overlaps(&FONT_CONFIG));
        assert!(!LEGACY_FONT.overlaps(&CALIBRATION));
    }

    #[test]
    fn test_check() {
        assert!(CALIBRATION.check(&[0; 0x200]).is_ok());
        assert!(matches!(
            CALIBRATION.check(&[0; 0x201]),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(TONE_TABLE.check(&[]), Err(Error::InvalidPayload(_))));
    }

    #[test]
    fn test_sizes() {
        assert_eq!(CONFIG.len(), 0x1D00);
        assert_eq!(SSB_PATCH.len(), 0x3DD8);
        assert_eq!(FONT.to_string(), "0x02E00-0x20000");
    }
}
