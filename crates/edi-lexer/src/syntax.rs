//! Dialect syntax definitions and delimiter handling
//!
//! This module holds the separator sets of the supported dialects, the
//! detection of in-band separator declarations (X12 `ISA`, EDIFACT `UNA`)
//! and a byte buffer that tracks line and column while reading.

use crate::{Error, LexError, Result};
use edi_ir::Position;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default EDIFACT separators (when no UNA is present)
pub const EDIFACT_COMPONENT_SEPARATOR: u8 = b':';
pub const EDIFACT_ELEMENT_SEPARATOR: u8 = b'+';
pub const EDIFACT_DECIMAL_MARK: u8 = b'.';
pub const EDIFACT_RELEASE_CHARACTER: u8 = b'?';
pub const EDIFACT_SEGMENT_TERMINATOR: u8 = b'\'';

/// Default X12 separators (when no ISA is present)
pub const X12_COMPONENT_SEPARATOR: u8 = b':';
pub const X12_ELEMENT_SEPARATOR: u8 = b'*';
pub const X12_SEGMENT_TERMINATOR: u8 = b'~';

/// Length of the fixed-format UNA service string advice
pub const UNA_LENGTH: usize = 9;

/// Number of element separators in a well-formed ISA segment
const ISA_ELEMENT_COUNT: usize = 16;

/// Separators used for lexing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separators {
    /// Segment terminator
    pub segment: u8,
    /// Element separator
    pub element: u8,
    /// Component separator
    pub component: u8,
    /// Release (escape) character
    pub release: Option<u8>,
    /// Repetition separator
    pub repetition: Option<u8>,
    /// Decimal mark used in numeric values
    pub decimal: u8,
}

impl Separators {
    /// EDIFACT defaults: `'` `+` `:` with `?` as release character
    #[must_use]
    pub const fn edifact() -> Self {
        Self {
            segment: EDIFACT_SEGMENT_TERMINATOR,
            element: EDIFACT_ELEMENT_SEPARATOR,
            component: EDIFACT_COMPONENT_SEPARATOR,
            release: Some(EDIFACT_RELEASE_CHARACTER),
            repetition: None,
            decimal: EDIFACT_DECIMAL_MARK,
        }
    }

    /// X12 defaults: `~` `*` `:` without release character
    #[must_use]
    pub const fn x12() -> Self {
        Self {
            segment: X12_SEGMENT_TERMINATOR,
            element: X12_ELEMENT_SEPARATOR,
            component: X12_COMPONENT_SEPARATOR,
            release: None,
            repetition: None,
            decimal: b'.',
        }
    }

    /// Parse separators from a UNA segment
    ///
    /// UNA format: `UNA:+.? '`
    /// Positions:   `012345678`
    ///
    /// Position 3 is the component separator, 4 the element separator, 5 the
    /// decimal mark, 6 the release character, 7 the repetition separator and
    /// 8 the segment terminator. A space at 6 or 7 means "not used".
    #[must_use]
    pub fn from_una(una: &[u8]) -> Option<Self> {
        if una.len() < UNA_LENGTH || &una[0..3] != b"UNA" {
            return None;
        }

        let optional = |byte: u8| (byte != b' ').then_some(byte);

        Some(Self {
            component: una[3],
            element: una[4],
            decimal: una[5],
            release: optional(una[6]),
            repetition: optional(una[7]),
            segment: una[8],
        })
    }

    /// Detect separators from a leading X12 ISA segment
    ///
    /// The element separator is the byte right after `ISA`. The component
    /// separator is the single byte after the 16th element separator (ISA16)
    /// and the segment terminator follows it. ISA11 declares the repetition
    /// separator when it is not alphanumeric (older versions use it for a
    /// standards identifier such as `U`).
    #[must_use]
    pub fn from_isa(data: &[u8]) -> Option<Self> {
        if data.len() < 4 || &data[0..3] != b"ISA" {
            return None;
        }

        let element = data[3];
        let boundaries: Vec<usize> = data
            .iter()
            .enumerate()
            .skip(3)
            .filter(|&(_, &b)| b == element)
            .map(|(i, _)| i)
            .take(ISA_ELEMENT_COUNT)
            .collect();

        if boundaries.len() < ISA_ELEMENT_COUNT {
            return None;
        }

        let last = boundaries[ISA_ELEMENT_COUNT - 1];
        let component = *data.get(last + 1)?;
        let segment = *data.get(last + 2)?;

        let isa11 = &data[boundaries[10] + 1..boundaries[11]];
        let repetition = match isa11 {
            [byte]
                if !byte.is_ascii_alphanumeric()
                    && *byte != element
                    && *byte != component
                    && *byte != segment =>
            {
                Some(*byte)
            }
            _ => None,
        };

        Some(Self {
            segment,
            element,
            component,
            release: None,
            repetition,
            decimal: b'.',
        })
    }

    /// Create a UNA segment from these separators
    #[must_use]
    pub fn to_una(&self) -> Vec<u8> {
        vec![
            b'U',
            b'N',
            b'A',
            self.component,
            self.element,
            self.decimal,
            self.release.unwrap_or(b' '),
            self.repetition.unwrap_or(b' '),
            self.segment,
        ]
    }

    /// Check if a byte is a special character (needs escaping)
    #[must_use]
    pub fn is_special(&self, byte: u8) -> bool {
        byte == self.component
            || byte == self.element
            || byte == self.segment
            || Some(byte) == self.release
            || Some(byte) == self.repetition
    }

    /// Reject separator sets in which two roles share a character
    ///
    /// # Errors
    ///
    /// Returns [`LexError::ConflictingDelimiters`] naming the first clash.
    pub fn check(&self) -> std::result::Result<(), LexError> {
        let roles: Vec<(&'static str, u8)> = [
            ("segment terminator", Some(self.segment)),
            ("element separator", Some(self.element)),
            ("component separator", Some(self.component)),
            ("release character", self.release),
            ("repetition separator", self.repetition),
        ]
        .into_iter()
        .filter_map(|(role, byte)| byte.map(|b| (role, b)))
        .collect();

        for (i, &(first, a)) in roles.iter().enumerate() {
            if let Some(&(second, _)) = roles[i + 1..].iter().find(|&&(_, b)| b == a) {
                return Err(LexError::ConflictingDelimiters {
                    character: char::from(a),
                    first,
                    second,
                });
            }
        }

        Ok(())
    }
}

impl Default for Separators {
    fn default() -> Self {
        Self::x12()
    }
}

impl fmt::Display for Separators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |byte: Option<u8>| byte.map_or_else(|| "-".to_string(), |b| char::from(b).to_string());
        write!(
            f,
            "segment={} element={} component={} release={} repetition={}",
            char::from(self.segment),
            char::from(self.element),
            char::from(self.component),
            show(self.release),
            show(self.repetition)
        )
    }
}

/// Supported EDI dialects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// ANSI ASC X12
    #[default]
    X12,
    /// UN/EDIFACT
    Edifact,
    /// Caller-supplied separators, no service segment detection
    Custom,
}

impl Dialect {
    /// Separators used when the input does not declare its own
    #[must_use]
    pub const fn default_separators(self) -> Separators {
        match self {
            Dialect::X12 | Dialect::Custom => Separators::x12(),
            Dialect::Edifact => Separators::edifact(),
        }
    }

    /// Lower-case dialect name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Dialect::X12 => "x12",
            Dialect::Edifact => "edifact",
            Dialect::Custom => "custom",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x12" => Ok(Dialect::X12),
            "edifact" => Ok(Dialect::Edifact),
            "custom" => Ok(Dialect::Custom),
            _ => Err(Error::UnknownDialect(s.to_string())),
        }
    }
}

/// Dialect selection plus the separators to start lexing with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectConfig {
    /// Dialect whose service segment is looked for
    pub dialect: Dialect,

    /// Separators to use when no service segment overrides them
    pub separators: Separators,

    /// Whether a leading ISA/UNA may override `separators`
    pub detect_service_segment: bool,
}

impl DialectConfig {
    /// Configuration with the dialect's default separators
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            separators: dialect.default_separators(),
            detect_service_segment: !matches!(dialect, Dialect::Custom),
        }
    }

    /// X12 with ISA detection
    #[must_use]
    pub const fn x12() -> Self {
        Self::new(Dialect::X12)
    }

    /// EDIFACT with UNA detection
    #[must_use]
    pub const fn edifact() -> Self {
        Self::new(Dialect::Edifact)
    }

    /// Fixed, caller-supplied separators
    #[must_use]
    pub const fn custom(separators: Separators) -> Self {
        Self {
            dialect: Dialect::Custom,
            separators,
            detect_service_segment: false,
        }
    }

    /// Replace the starting separators
    #[must_use]
    pub const fn with_separators(mut self, separators: Separators) -> Self {
        self.separators = separators;
        self
    }

    /// Enable or disable service segment detection
    #[must_use]
    pub const fn detect_service_segment(mut self, detect: bool) -> Self {
        self.detect_service_segment = detect;
        self
    }
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::x12()
    }
}

/// A buffer for reading EDI data that keeps track of line and column
pub struct SyntaxBuffer<'a> {
    data: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> SyntaxBuffer<'a> {
    /// Create a new syntax buffer positioned at the start of `data`
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Get current byte offset
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Position of the next byte (length 0)
    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column, self.pos, 0)
    }

    /// Unread input
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Check if we've reached the end
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Peek at the next byte without consuming it
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Read the next byte
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    /// Consume `count` bytes
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            if self.next_byte().is_none() {
                break;
            }
        }
    }

    /// Skip a UTF-8 byte order mark
    pub fn skip_bom(&mut self) {
        if self.remaining().starts_with(&[0xEF, 0xBB, 0xBF]) {
            // The BOM is not a visible column.
            self.pos += 3;
        }
    }

    /// Skip whitespace and line breaks between segments
    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\r' | b'\n') = self.peek() {
            self.next_byte();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISA: &[u8] = b"ISA*00*          *00*          *ZZ*SUBMITTERID    *ZZ*RECEIVERID     *230101*1200*^*00501*000000001*0*P*:~";

    #[test]
    fn test_default_separators() {
        let sep = Separators::edifact();
        assert_eq!(sep.component, b':');
        assert_eq!(sep.element, b'+');
        assert_eq!(sep.decimal, b'.');
        assert_eq!(sep.release, Some(b'?'));
        assert_eq!(sep.segment, b'\'');

        let sep = Separators::x12();
        assert_eq!(sep.element, b'*');
        assert_eq!(sep.segment, b'~');
        assert_eq!(sep.release, None);
    }

    #[test]
    fn test_una_parsing() {
        let sep = Separators::from_una(b"UNA:+.? '").unwrap();
        assert_eq!(sep, Separators::edifact());
    }

    #[test]
    fn test_una_custom_separators() {
        let sep = Separators::from_una(b"UNA*=,#^~").unwrap();
        assert_eq!(sep.component, b'*');
        assert_eq!(sep.element, b'=');
        assert_eq!(sep.decimal, b',');
        assert_eq!(sep.release, Some(b'#'));
        assert_eq!(sep.repetition, Some(b'^'));
        assert_eq!(sep.segment, b'~');
    }

    #[test]
    fn test_una_too_short() {
        assert!(Separators::from_una(b"UNA:+.").is_none());
        assert!(Separators::from_una(b"UNB+UNOC:3'").is_none());
    }

    #[test]
    fn test_una_round_trip() {
        let sep = Separators::from_una(b"UNA:+,? '").unwrap();
        assert_eq!(sep.to_una(), b"UNA:+,? '".to_vec());
    }

    #[test]
    fn test_isa_detection() {
        let sep = Separators::from_isa(ISA).unwrap();
        assert_eq!(sep.element, b'*');
        assert_eq!(sep.component, b':');
        assert_eq!(sep.segment, b'~');
        assert_eq!(sep.repetition, Some(b'^'));
        assert_eq!(sep.release, None);
    }

    #[test]
    fn test_isa_with_standards_identifier() {
        let isa = b"ISA|00|          |00|          |ZZ|A              |ZZ|B              |230101|1200|U|00401|000000001|0|P|>\n";
        let sep = Separators::from_isa(isa).unwrap();
        assert_eq!(sep.element, b'|');
        assert_eq!(sep.component, b'>');
        assert_eq!(sep.segment, b'\n');
        assert_eq!(sep.repetition, None);
    }

    #[test]
    fn test_isa_truncated() {
        assert!(Separators::from_isa(b"ISA*00*          *00").is_none());
        assert!(Separators::from_isa(b"GS*HC*A*B~").is_none());
    }

    #[test]
    fn test_conflicting_delimiters() {
        let sep = Separators {
            component: b'+',
            ..Separators::edifact()
        };
        assert_eq!(
            sep.check(),
            Err(LexError::ConflictingDelimiters {
                character: '+',
                first: "element separator",
                second: "component separator",
            })
        );
        assert!(Separators::edifact().check().is_ok());
        assert!(Separators::x12().check().is_ok());
    }

    #[test]
    fn test_is_special() {
        let sep = Separators::edifact();
        assert!(sep.is_special(b'?'));
        assert!(sep.is_special(b'\''));
        assert!(!sep.is_special(b'.'));
        assert!(!Separators::x12().is_special(b'?'));
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("X12".parse::<Dialect>(), Ok(Dialect::X12));
        assert_eq!("edifact".parse::<Dialect>(), Ok(Dialect::Edifact));
        assert!("hl7".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_dialect_config_defaults() {
        let config = DialectConfig::edifact();
        assert_eq!(config.separators, Separators::edifact());
        assert!(config.detect_service_segment);

        let config = DialectConfig::custom(Separators::x12());
        assert_eq!(config.dialect, Dialect::Custom);
        assert!(!config.detect_service_segment);
    }

    #[test]
    fn test_buffer_tracks_lines() {
        let mut buf = SyntaxBuffer::new(b"AB\nC");
        buf.advance(3);
        assert_eq!(buf.position(), Position::new(2, 1, 3, 0));
        assert_eq!(buf.next_byte(), Some(b'C'));
        assert!(buf.is_empty());
        assert_eq!(buf.next_byte(), None);
    }

    #[test]
    fn test_buffer_skips_bom_and_whitespace() {
        let mut buf = SyntaxBuffer::new(b"\xEF\xBB\xBF \r\nUNB");
        buf.skip_bom();
        buf.skip_whitespace();
        assert_eq!(buf.remaining(), b"UNB");
        assert_eq!(buf.position().line, 2);
    }

    #[test]
    fn test_dialect_serde_names() {
        assert_eq!(serde_json::to_string(&Dialect::Edifact).unwrap(), "\"edifact\"");
        let dialect: Dialect = serde_json::from_str("\"x12\"").unwrap();
        assert_eq!(dialect, Dialect::X12);
    }
}
