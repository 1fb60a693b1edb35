//! Text encodings a message body may declare

use crate::error::{Error, Result};
use bytes::Bytes;
use std::fmt;

/// A character encoding used to turn body text into bytes and back
///
/// Only the encodings an HTTP charset parameter commonly names are supported.
/// Labels are matched case-insensitively against the IANA names and aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// UTF-8
    Utf8,
    /// ISO-8859-1
    Latin1,
    /// US-ASCII
    Ascii,
}

impl Encoding {
    /// Canonical name, as written into a `charset` parameter
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "iso-8859-1",
            Encoding::Ascii => "us-ascii",
        }
    }

    /// Look up an encoding by charset label
    pub fn for_label(label: &str) -> Option<Encoding> {
        let label = label.trim();
        const UTF8: &[&str] = &["utf-8", "utf8"];
        const LATIN1: &[&str] = &[
            "iso-8859-1",
            "iso_8859-1",
            "iso_8859-1:1987",
            "iso-ir-100",
            "latin1",
            "l1",
            "ibm819",
            "cp819",
            "csisolatin1",
        ];
        const ASCII: &[&str] = &[
            "us-ascii",
            "ascii",
            "iso-ir-6",
            "ansi_x3.4-1968",
            "ansi_x3.4-1986",
            "iso_646.irv:1991",
            "iso646-us",
            "us",
            "ibm367",
            "cp367",
            "csascii",
        ];

        let matches = |names: &[&str]| names.iter().any(|n| n.eq_ignore_ascii_case(label));
        if matches(UTF8) {
            Some(Encoding::Utf8)
        } else if matches(LATIN1) {
            Some(Encoding::Latin1)
        } else if matches(ASCII) {
            Some(Encoding::Ascii)
        } else {
            None
        }
    }

    /// Encode text, failing if a character has no representation
    pub fn encode(&self, text: &str) -> Result<Bytes> {
        match self {
            Encoding::Utf8 => Ok(Bytes::copy_from_slice(text.as_bytes())),
            Encoding::Latin1 => self.encode_single_byte(text, 0xFF),
            Encoding::Ascii => self.encode_single_byte(text, 0x7F),
        }
    }

    fn encode_single_byte(&self, text: &str, max: u32) -> Result<Bytes> {
        text.chars()
            .map(|c| {
                let code = c as u32;
                if code <= max {
                    Ok(code as u8)
                } else {
                    Err(Error::invalid_argument(format!(
                        "character {:?} cannot be encoded as {}",
                        c,
                        self.name()
                    )))
                }
            })
            .collect::<Result<Vec<u8>>>()
            .map(Bytes::from)
    }

    /// Decode bytes into text, failing on malformed input
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| Error::Decode {
                    encoding: self.name(),
                    message: e.to_string(),
                }),
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Encoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(pos) => Err(Error::Decode {
                    encoding: self.name(),
                    message: format!("byte 0x{:02x} at offset {} is not ASCII", bytes[pos], pos),
                }),
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_case_insensitive() {
        assert_eq!(Encoding::for_label("UTF-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::for_label("Latin1"), Some(Encoding::Latin1));
        assert_eq!(Encoding::for_label("US-ASCII"), Some(Encoding::Ascii));
        assert_eq!(Encoding::for_label("koi8-r"), None);
    }

    #[test]
    fn test_latin1_round_trip_of_high_bytes() {
        let bytes = Encoding::Latin1.encode("café").unwrap();
        assert_eq!(&bytes[..], &[b'c', b'a', b'f', 0xE9]);
        assert_eq!(Encoding::Latin1.decode(&bytes).unwrap(), "café");
    }

    #[test]
    fn test_ascii_rejects_unrepresentable_text() {
        let err = Encoding::Ascii.encode("naïve").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_utf8_rejects_malformed_bytes() {
        let err = Encoding::Utf8.decode(&[0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, Error::Decode { encoding: "utf-8", .. }));
    }
}
