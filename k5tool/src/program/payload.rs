//! Caller-supplied payloads.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::program::region::{self, Region};

/// Kind of payload the programming operations know how to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PayloadKind {
    /// Font for firmware before version 118.
    LegacyFont,
    /// Compressed GB2312 font.
    FontCompressed,
    /// Uncompressed GB2312 font.
    FontUncompressed,
    /// Font metrics.
    FontConfig,
    /// Tone table.
    ToneTable,
    /// Pinyin index for firmware 123.
    PinyinIndexOld,
    /// Pinyin index for firmware 124 and later.
    PinyinIndexNew,
    /// SSB patch.
    SsbPatch,
}

impl PayloadKind {
    /// Region the payload is written to.
    pub fn region(self) -> Region {
        match self {
            Self::LegacyFont => region::LEGACY_FONT,
            Self::FontCompressed | Self::FontUncompressed => region::FONT,
            Self::FontConfig => region::FONT_CONFIG,
            Self::ToneTable => region::TONE_TABLE,
            Self::PinyinIndexOld | Self::PinyinIndexNew => region::PINYIN_INDEX,
            Self::SsbPatch => region::SSB_PATCH,
        }
    }

    /// Step name.
    pub fn name(self) -> &'static str {
        match self {
            Self::LegacyFont => "legacy font",
            Self::FontCompressed => "font (compressed)",
            Self::FontUncompressed => "font (uncompressed)",
            Self::FontConfig => "font config",
            Self::ToneTable => "tone table",
            Self::PinyinIndexOld => "pinyin index (old)",
            Self::PinyinIndexNew => "pinyin index (new)",
            Self::SsbPatch => "SSB patch",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload buffers by kind.
#[derive(Debug, Clone, Default)]
pub struct PayloadSet {
    payloads: HashMap<PayloadKind, Vec<u8>>,
}

impl PayloadSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a payload.
    pub fn insert(&mut self, kind: PayloadKind, data: impl Into<Vec<u8>>) -> &mut Self {
        self.payloads.insert(kind, data.into());
        self
    }

    /// Builder form of [`PayloadSet::insert`].
    #[must_use]
    pub fn with(mut self, kind: PayloadKind, data: impl Into<Vec<u8>>) -> Self {
        self.insert(kind, data);
        self
    }

    /// Payload of the given kind, if present.
    pub fn get(&self, kind: PayloadKind) -> Option<&[u8]> {
        self.payloads.get(&kind).map(Vec::as_slice)
    }

    /// Payload of the given kind, checked against its region.
    pub fn require(&self, kind: PayloadKind) -> Result<&[u8]> {
        let data = self
            .get(kind)
            .ok_or_else(|| Error::InvalidPayload(format!("missing {kind} payload")))?;
        kind.region().check(data)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions() {
        assert_eq!(PayloadKind::FontCompressed.region().start, 0x2E00);
        assert_eq!(PayloadKind::FontConfig.region().start, 0x2480);
        assert_eq!(PayloadKind::ToneTable.region().start, 0x2C00);
        assert_eq!(PayloadKind::PinyinIndexNew.region().start, 0x20000);
        assert_eq!(PayloadKind::SsbPatch.region().start, 0x3C228);
        assert_eq!(PayloadKind::LegacyFont.region().start, 0x2000);
    }

    #[test]
    fn test_require() {
        let set = PayloadSet::new()
            .with(PayloadKind::ToneTable, vec![1; 0x100])
            .with(PayloadKind::FontConfig, vec![1; 0x1000]);
        assert_eq!(set.require(PayloadKind::ToneTable).unwrap().len(), 0x100);
        assert!(matches!(
            set.require(PayloadKind::SsbPatch),
            Err(Error::InvalidPayload(msg)) if msg.contains("SSB patch")
        ));
        // 0x1000 bytes do not fit 0x2480..0x2C00.
        assert!(matches!(
            set.require(PayloadKind::FontConfig),
            Err(Error::InvalidPayload(_))
        ));
    }
}
