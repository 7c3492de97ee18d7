//! Firmware identification from the hello reply.
//!
//! Extended firmware reports itself as `LOSEHU` followed by a three digit
//! version, a variant letter and an optional `S` for the SSB build, for
//! example `LOSEHU124KS`.

use std::fmt;

use crate::protocol::command::HELLO_VERSION_OFFSET;

/// Vendor tag carried by extended firmware.
pub const VENDOR_TAG: &str = "LOSEHU";

/// Maximum length of the version string in the hello reply.
pub const MAX_VERSION_LEN: usize = 16;

/// Variant letters whose firmware can address the extended EEPROM.
pub const CAPABLE_CODES: [char; 2] = ['K', 'H'];

/// Firmware family, ordered by what it can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FirmwareVariant {
    /// Stock or unrecognised firmware.
    #[default]
    Unknown,
    /// Extended firmware without large-EEPROM support.
    BaseExtended,
    /// Extended firmware able to use the banked EEPROM.
    CapableExtended,
}

impl fmt::Display for FirmwareVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "stock"),
            Self::BaseExtended => write!(f, "extended"),
            Self::CapableExtended => write!(f, "extended (large EEPROM)"),
        }
    }
}

/// Result of classifying a version string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FirmwareClassification {
    /// Firmware family.
    pub variant: FirmwareVariant,
    /// Three digit version, when the string parsed.
    pub version: Option<u16>,
    /// Variant letter, when the string parsed.
    pub variant_code: Option<char>,
    /// Whether the SSB build suffix is present.
    pub ssb: bool,
    /// Version string as reported.
    pub raw: String,
}

impl FirmwareClassification {
    /// Whether this firmware can address the banked EEPROM.
    pub fn is_capable(&self) -> bool {
        self.variant == FirmwareVariant::CapableExtended
    }
}

impl fmt::Display for FirmwareClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.raw, self.variant)
    }
}

/// Extract the version string from a hello reply payload.
///
/// Takes the printable ASCII run starting at byte 4, at most 16 bytes.
pub fn extract_version_string(reply: &[u8]) -> String {
    reply
        .iter()
        .skip(HELLO_VERSION_OFFSET)
        .take(MAX_VERSION_LEN)
        .take_while(|b| (0x20..=0x7E).contains(*b))
        .map(|&b| char::from(b))
        .collect()
}

/// Classify a version string.
pub fn classify(version: &str) -> FirmwareClassification {
    let mut result = FirmwareClassification {
        raw: version.to_string(),
        ..Default::default()
    };

    let Some(rest) = version.strip_prefix(VENDOR_TAG) else {
        return result;
    };
    result.variant = FirmwareVariant::BaseExtended;

    let mut chars = rest.chars();
    let digits: String = chars.by_ref().take(3).collect();
    if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return result;
    }
    let Some(code) = chars.next().filter(char::is_ascii_alphabetic) else {
        return result;
    };
    let suffix = chars.as_str();
    if !suffix.is_empty() && suffix != "S" {
        return result;
    }

    result.version = digits.parse().ok();
    result.variant_code = Some(code);
    result.ssb = suffix == "S";
    if CAPABLE_CODES.contains(&code) {
        result.variant = FirmwareVariant::CapableExtended;
    }
    result
}
