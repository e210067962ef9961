//! Bidirectional transcoding between the [`Message`] model and the NDEF
//! record format stored on tags.
//!
//! Outbound messages gain one synthetic trailing external record carrying
//! the message's origin URL, since the tag format has no URL-of-message
//! field; the inbound direction strips it back out.

use crate::ndef::{self, NdefMessage, NdefRecord, Tnf, uri};
use crate::types::{Message, Record, RecordType};
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("message cannot be encoded for the tag: {0}")]
    InvalidFormat(String),
    #[error("payload is not valid {0}")]
    Encoding(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Utf16,
}

/// Resolves the charset declared by a media type's `;charset=` parameter.
/// Unrecognized values fall back to UTF-8 with a warning.
pub fn resolve_charset(media_type: &str) -> Charset {
    for param in media_type.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("charset") {
            continue;
        }
        let value = value.trim().trim_matches('"');
        if value.eq_ignore_ascii_case("utf-8") || value.eq_ignore_ascii_case("utf8") {
            return Charset::Utf8;
        }
        // Encoded byte arrays arrive little-endian without a BOM.
        if value.eq_ignore_ascii_case("utf-16") || value.eq_ignore_ascii_case("utf-16le") {
            return Charset::Utf16;
        }
        warn!(
            target: "Convert/Charset",
            "unrecognized charset {value:?}, defaulting to UTF-8"
        );
        return Charset::Utf8;
    }
    Charset::Utf8
}

fn decode_payload(data: &[u8], charset: Charset) -> Result<String, ConvertError> {
    match charset {
        Charset::Utf8 => {
            String::from_utf8(data.to_vec()).map_err(|_| ConvertError::Encoding("UTF-8"))
        }
        Charset::Utf16 => {
            if data.len() % 2 != 0 {
                return Err(ConvertError::Encoding("UTF-16"));
            }
            let units: Vec<u16> = data
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).map_err(|_| ConvertError::Encoding("UTF-16"))
        }
    }
}

/// Encodes a message into its tag representation.
pub fn to_wire_format(message: &Message) -> Result<NdefMessage, ConvertError> {
    let mut records = Vec::with_capacity(message.records.len() + 1);
    for record in &message.records {
        records.push(to_wire_record(record)?);
    }
    let url = message.url.as_deref().unwrap_or("");
    records.push(NdefRecord::external(ndef::EXTERNAL_URL_TYPE, url.as_bytes()));
    Ok(NdefMessage { records })
}

fn to_wire_record(record: &Record) -> Result<NdefRecord, ConvertError> {
    if record.record_type == RecordType::Empty {
        return Ok(NdefRecord::empty());
    }

    let media_type = record
        .media_type
        .as_deref()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ConvertError::InvalidFormat("record has no media type".into()))?;
    let data = record
        .data
        .as_deref()
        .ok_or_else(|| ConvertError::InvalidFormat("record has no payload".into()))?;

    match record.record_type {
        RecordType::Url => {
            let uri = decode_payload(data, resolve_charset(media_type))
                .map_err(|e| ConvertError::InvalidFormat(e.to_string()))?;
            Ok(NdefRecord::uri(&uri))
        }
        RecordType::Text => {
            let text = decode_payload(data, resolve_charset(media_type))
                .map_err(|e| ConvertError::InvalidFormat(e.to_string()))?;
            Ok(NdefRecord::text(ndef::DEFAULT_LANGUAGE, text.as_bytes()))
        }
        RecordType::Json | RecordType::Opaque => Ok(NdefRecord::mime(media_type, data)),
        RecordType::Empty => unreachable!("handled above"),
    }
}

/// Decodes a tag's records back into a message. Records with an
/// unrecognized shape are dropped with a warning; genuine encoding failures
/// in text or URI payloads propagate.
pub fn from_wire_format(wire: &NdefMessage) -> Result<Message, ConvertError> {
    let mut url = None;
    let mut records = Vec::new();
    for wire_record in &wire.records {
        if wire_record.tnf == Tnf::External
            && wire_record.record_type == ndef::EXTERNAL_URL_TYPE
        {
            let decoded = String::from_utf8(wire_record.payload.clone())
                .map_err(|_| ConvertError::Encoding("UTF-8"))?;
            if !decoded.is_empty() {
                url = Some(decoded);
            }
            continue;
        }
        if let Some(record) = from_wire_record(wire_record)? {
            records.push(record);
        }
    }
    Ok(Message { records, url })
}

fn from_wire_record(wire_record: &NdefRecord) -> Result<Option<Record>, ConvertError> {
    match wire_record.tnf {
        Tnf::Empty => Ok(Some(Record::empty())),
        Tnf::MimeMedia => {
            let Ok(media_type) = std::str::from_utf8(&wire_record.record_type) else {
                warn!(target: "Convert/Record", "MIME record with non-UTF-8 type, dropped");
                return Ok(None);
            };
            let record_type = if media_type == ndef::JSON_MIME {
                RecordType::Json
            } else {
                RecordType::Opaque
            };
            Ok(Some(Record::new(
                record_type,
                media_type,
                wire_record.payload.clone(),
            )))
        }
        // For absolute URI records the type field holds the URI itself.
        Tnf::AbsoluteUri => {
            let uri = std::str::from_utf8(&wire_record.record_type)
                .map_err(|_| ConvertError::Encoding("UTF-8"))?;
            Ok(Some(Record::new(
                RecordType::Url,
                ndef::TEXT_MIME,
                uri.as_bytes().to_vec(),
            )))
        }
        Tnf::WellKnown => match wire_record.record_type.as_slice() {
            t if t == ndef::RTD_URI => decode_uri_record(&wire_record.payload).map(Some),
            t if t == ndef::RTD_TEXT => Ok(decode_text_record(&wire_record.payload)),
            other => {
                warn!(
                    target: "Convert/Record",
                    "unsupported well-known record type {other:?}, dropped"
                );
                Ok(None)
            }
        },
        Tnf::External | Tnf::Unknown | Tnf::Unchanged => {
            debug!(target: "Convert/Record", "record with TNF {:?} dropped", wire_record.tnf);
            Ok(None)
        }
    }
}

fn decode_uri_record(payload: &[u8]) -> Result<Record, ConvertError> {
    let Some((&code, rest)) = payload.split_first() else {
        return Err(ConvertError::Encoding("URI record"));
    };
    let rest = std::str::from_utf8(rest).map_err(|_| ConvertError::Encoding("UTF-8"))?;
    let uri = format!("{}{}", uri::expand(code), rest);
    Ok(Record::new(
        RecordType::Url,
        ndef::TEXT_MIME,
        uri.into_bytes(),
    ))
}

fn decode_text_record(payload: &[u8]) -> Option<Record> {
    let status = *payload.first()?;
    let language_len = (status & ndef::TEXT_STATUS_LANG_MASK) as usize;
    let text_start = 1 + language_len;
    if text_start > payload.len() {
        debug!(target: "Convert/Record", "text record language overruns payload, dropped");
        return None;
    }
    let media_type = if status & ndef::TEXT_STATUS_UTF16 != 0 {
        "text/plain;charset=UTF-16"
    } else {
        ndef::TEXT_MIME
    };
    Some(Record::new(
        RecordType::Text,
        media_type,
        payload[text_start..].to_vec(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndef::wire;

    fn sample_message() -> Message {
        Message::new(
            vec![
                Record::new(RecordType::Url, "text/plain", b"https://site.example/page".to_vec()),
                Record::new(RecordType::Text, "text/plain", b"hello".to_vec()),
                Record::new(
                    RecordType::Json,
                    "application/json",
                    serde_json::json!({"a": 1}).to_string().into_bytes(),
                ),
                Record::new(RecordType::Opaque, "application/octet-stream", vec![0, 1, 2]),
                Record::empty(),
            ],
            Some("https://origin.example/app"),
        )
    }

    #[test]
    fn round_trip_preserves_records_and_url() {
        let message = sample_message();
        let wire = to_wire_format(&message).unwrap();
        let decoded = from_wire_format(&wire).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn round_trip_survives_the_byte_codec() {
        let message = sample_message();
        let bytes = wire::serialize(&to_wire_format(&message).unwrap()).unwrap();
        let decoded = from_wire_format(&wire::parse(&bytes).unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn outbound_appends_synthetic_url_record() {
        let wire = to_wire_format(&sample_message()).unwrap();
        let trailer = wire.records.last().unwrap();
        assert_eq!(trailer.tnf, Tnf::External);
        assert_eq!(trailer.record_type, ndef::EXTERNAL_URL_TYPE);
        assert_eq!(trailer.payload, b"https://origin.example/app");
    }

    #[test]
    fn message_without_url_round_trips_to_none() {
        let message = Message::new(vec![Record::empty()], None);
        let decoded = from_wire_format(&to_wire_format(&message).unwrap()).unwrap();
        assert_eq!(decoded.url, None);
    }

    #[test]
    fn json_mime_decodes_as_json_record() {
        let wire = NdefMessage::new(vec![NdefRecord::mime(ndef::JSON_MIME, b"{}")]);
        let message = from_wire_format(&wire).unwrap();
        assert_eq!(message.records[0].record_type, RecordType::Json);
    }

    #[test]
    fn other_mime_decodes_as_opaque_record() {
        let wire = NdefMessage::new(vec![NdefRecord::mime("image/png", b"\x89PNG")]);
        let message = from_wire_format(&wire).unwrap();
        assert_eq!(message.records[0].record_type, RecordType::Opaque);
        assert_eq!(message.records[0].media_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn absolute_uri_record_decodes_as_url() {
        let wire = NdefMessage::new(vec![NdefRecord {
            tnf: Tnf::AbsoluteUri,
            record_type: b"https://site.example/x".to_vec(),
            id: Vec::new(),
            payload: Vec::new(),
        }]);
        let message = from_wire_format(&wire).unwrap();
        assert_eq!(message.records[0].record_type, RecordType::Url);
        assert_eq!(
            message.records[0].data.as_deref(),
            Some(b"https://site.example/x".as_slice())
        );
    }

    #[test]
    fn text_record_with_overlong_language_is_dropped() {
        // Status byte claims a 63 byte language code in a 1 byte payload.
        let wire = NdefMessage::new(vec![NdefRecord {
            tnf: Tnf::WellKnown,
            record_type: ndef::RTD_TEXT.to_vec(),
            id: Vec::new(),
            payload: vec![0x3F],
        }]);
        let message = from_wire_format(&wire).unwrap();
        assert!(message.records.is_empty());
    }

    #[test]
    fn utf16_text_record_keeps_charset_in_media_type() {
        let text: Vec<u8> = "hi".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut payload = vec![ndef::TEXT_STATUS_UTF16 | 2, b'e', b'n'];
        payload.extend_from_slice(&text);
        let wire = NdefMessage::new(vec![NdefRecord {
            tnf: Tnf::WellKnown,
            record_type: ndef::RTD_TEXT.to_vec(),
            id: Vec::new(),
            payload,
        }]);
        let message = from_wire_format(&wire).unwrap();
        assert_eq!(
            message.records[0].media_type.as_deref(),
            Some("text/plain;charset=UTF-16")
        );
        assert_eq!(message.records[0].data.as_deref(), Some(text.as_slice()));
    }

    #[test]
    fn utf16_url_payload_is_decoded_before_encoding() {
        let data: Vec<u8> = "https://site.example/x"
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        let message = Message::new(
            vec![Record::new(RecordType::Url, "text/plain;charset=UTF-16", data)],
            None,
        );
        let wire = to_wire_format(&message).unwrap();
        // 0x04 abbreviates "https://".
        assert_eq!(wire.records[0].payload[0], 0x04);
        assert_eq!(&wire.records[0].payload[1..], b"site.example/x");
    }

    #[test]
    fn invalid_utf8_url_fails_outbound_as_invalid_format() {
        let message = Message::new(
            vec![Record::new(RecordType::Url, "text/plain", vec![0xFF, 0xFE, 0xFD])],
            None,
        );
        assert!(matches!(
            to_wire_format(&message),
            Err(ConvertError::InvalidFormat(_))
        ));
    }

    #[test]
    fn invalid_utf8_uri_record_fails_inbound() {
        let wire = NdefMessage::new(vec![NdefRecord {
            tnf: Tnf::WellKnown,
            record_type: ndef::RTD_URI.to_vec(),
            id: Vec::new(),
            payload: vec![0x00, 0xFF, 0xFE],
        }]);
        assert!(matches!(
            from_wire_format(&wire),
            Err(ConvertError::Encoding("UTF-8"))
        ));
    }

    #[test]
    fn unrecognized_charset_defaults_to_utf8() {
        assert_eq!(resolve_charset("text/plain;charset=KOI8-R"), Charset::Utf8);
        assert_eq!(resolve_charset("text/plain"), Charset::Utf8);
        assert_eq!(resolve_charset("text/plain;charset=UTF-16"), Charset::Utf16);
        assert_eq!(resolve_charset("text/plain; charset=\"utf-8\""), Charset::Utf8);
    }
}
