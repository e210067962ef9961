pub mod uri;
pub mod wire;

use serde::{Deserialize, Serialize};

/// Well-known record type name for text records.
pub const RTD_TEXT: &[u8] = b"T";
/// Well-known record type name for URI records.
pub const RTD_URI: &[u8] = b"U";
/// External type carried by the synthetic trailing record that round-trips
/// the message's origin URL through the tag format.
pub const EXTERNAL_URL_TYPE: &[u8] = b"w3.org:webnfc";

pub const JSON_MIME: &str = "application/json";
pub const TEXT_MIME: &str = "text/plain";
/// Language tag written into outbound text records.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Status-byte bit selecting UTF-16 in a text record payload.
pub const TEXT_STATUS_UTF16: u8 = 0x80;
/// Status-byte mask for the language code length.
pub const TEXT_STATUS_LANG_MASK: u8 = 0x3F;

/// Type Name Format values, NDEF 3.2.6. Value 0x07 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tnf {
    Empty = 0x00,
    WellKnown = 0x01,
    MimeMedia = 0x02,
    AbsoluteUri = 0x03,
    External = 0x04,
    Unknown = 0x05,
    Unchanged = 0x06,
}

impl Tnf {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x00 => Some(Tnf::Empty),
            0x01 => Some(Tnf::WellKnown),
            0x02 => Some(Tnf::MimeMedia),
            0x03 => Some(Tnf::AbsoluteUri),
            0x04 => Some(Tnf::External),
            0x05 => Some(Tnf::Unknown),
            0x06 => Some(Tnf::Unchanged),
            _ => None,
        }
    }
}

/// One NDEF record as stored on a tag.
///
/// For `MimeMedia` records the type field holds the MIME type string; for
/// `AbsoluteUri` records it holds the URI itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdefRecord {
    pub tnf: Tnf,
    pub record_type: Vec<u8>,
    pub id: Vec<u8>,
    pub payload: Vec<u8>,
}

impl NdefRecord {
    /// An explicitly empty record: no type, no id, no payload.
    pub fn empty() -> Self {
        Self {
            tnf: Tnf::Empty,
            record_type: Vec::new(),
            id: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// A well-known text record: status byte, language code, then the text
    /// encoded in UTF-8.
    pub fn text(language: &str, text: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(1 + language.len() + text.len());
        payload.push(language.len() as u8 & TEXT_STATUS_LANG_MASK);
        payload.extend_from_slice(language.as_bytes());
        payload.extend_from_slice(text);
        Self {
            tnf: Tnf::WellKnown,
            record_type: RTD_TEXT.to_vec(),
            id: Vec::new(),
            payload,
        }
    }

    /// A well-known URI record with the standard one-byte prefix
    /// abbreviation.
    pub fn uri(uri: &str) -> Self {
        let (code, rest) = uri::abbreviate(uri);
        let mut payload = Vec::with_capacity(1 + rest.len());
        payload.push(code);
        payload.extend_from_slice(rest.as_bytes());
        Self {
            tnf: Tnf::WellKnown,
            record_type: RTD_URI.to_vec(),
            id: Vec::new(),
            payload,
        }
    }

    /// A MIME media record; the type field carries the MIME type verbatim.
    pub fn mime(media_type: &str, payload: &[u8]) -> Self {
        Self {
            tnf: Tnf::MimeMedia,
            record_type: media_type.as_bytes().to_vec(),
            id: Vec::new(),
            payload: payload.to_vec(),
        }
    }

    /// An NFC Forum external type record.
    pub fn external(record_type: &[u8], payload: &[u8]) -> Self {
        Self {
            tnf: Tnf::External,
            record_type: record_type.to_vec(),
            id: Vec::new(),
            payload: payload.to_vec(),
        }
    }
}

/// An ordered set of records exchanged with a tag in one read or write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NdefMessage {
    pub records: Vec<NdefRecord>,
}

impl NdefMessage {
    pub fn new(records: Vec<NdefRecord>) -> Self {
        Self { records }
    }
}
