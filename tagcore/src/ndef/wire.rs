//! Binary serialization of NDEF messages.
//!
//! Each record is a flags byte (MB/ME/CF/SR/IL plus a 3-bit TNF), a type
//! length, a one- or four-byte payload length selected by the SR flag, an
//! optional id length, then the type, id, and payload fields. Chunked
//! records (CF) are not supported.

use super::{NdefMessage, NdefRecord, Tnf};
use bytes::{BufMut, BytesMut};
use thiserror::Error;

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("message contains no records")]
    NoRecords,
    #[error("record truncated at offset {0}")]
    Truncated(usize),
    #[error("chunked record at offset {0} is not supported")]
    Chunked(usize),
    #[error("reserved TNF value {tnf:#04x} at offset {offset}")]
    ReservedTnf { tnf: u8, offset: usize },
    #[error("record type field of {0} bytes does not fit")]
    TypeTooLong(usize),
    #[error("record id field of {0} bytes does not fit")]
    IdTooLong(usize),
    #[error("record payload of {0} bytes does not fit")]
    PayloadTooLarge(usize),
}

pub fn serialize(message: &NdefMessage) -> Result<Vec<u8>, WireError> {
    if message.records.is_empty() {
        return Err(WireError::NoRecords);
    }
    let mut buf = BytesMut::new();
    let last = message.records.len() - 1;
    for (i, record) in message.records.iter().enumerate() {
        if record.record_type.len() > u8::MAX as usize {
            return Err(WireError::TypeTooLong(record.record_type.len()));
        }
        if record.id.len() > u8::MAX as usize {
            return Err(WireError::IdTooLong(record.id.len()));
        }
        if record.payload.len() > u32::MAX as usize {
            return Err(WireError::PayloadTooLarge(record.payload.len()));
        }

        let short = record.payload.len() <= u8::MAX as usize;
        let mut flags = record.tnf as u8;
        if i == 0 {
            flags |= FLAG_MB;
        }
        if i == last {
            flags |= FLAG_ME;
        }
        if short {
            flags |= FLAG_SR;
        }
        if !record.id.is_empty() {
            flags |= FLAG_IL;
        }

        buf.put_u8(flags);
        buf.put_u8(record.record_type.len() as u8);
        if short {
            buf.put_u8(record.payload.len() as u8);
        } else {
            buf.put_u32(record.payload.len() as u32);
        }
        if !record.id.is_empty() {
            buf.put_u8(record.id.len() as u8);
        }
        buf.put_slice(&record.record_type);
        buf.put_slice(&record.id);
        buf.put_slice(&record.payload);
    }
    Ok(buf.to_vec())
}

pub fn parse(bytes: &[u8]) -> Result<NdefMessage, WireError> {
    let mut reader = Reader { bytes, cursor: 0 };
    let mut records = Vec::new();

    while reader.cursor < bytes.len() {
        let start = reader.cursor;
        let flags = reader.u8()?;
        if flags & FLAG_CF != 0 {
            return Err(WireError::Chunked(start));
        }
        let tnf = Tnf::from_bits(flags & TNF_MASK).ok_or(WireError::ReservedTnf {
            tnf: flags & TNF_MASK,
            offset: start,
        })?;

        let type_len = reader.u8()? as usize;
        let payload_len = if flags & FLAG_SR != 0 {
            reader.u8()? as usize
        } else {
            reader.u32()? as usize
        };
        let id_len = if flags & FLAG_IL != 0 {
            reader.u8()? as usize
        } else {
            0
        };

        let record_type = reader.slice(type_len)?.to_vec();
        let id = reader.slice(id_len)?.to_vec();
        let payload = reader.slice(payload_len)?.to_vec();
        records.push(NdefRecord {
            tnf,
            record_type,
            id,
            payload,
        });

        // The ME flag terminates the message; tags may pad beyond it.
        if flags & FLAG_ME != 0 {
            break;
        }
    }

    if records.is_empty() {
        return Err(WireError::NoRecords);
    }
    Ok(NdefMessage { records })
}

struct Reader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Result<u8, WireError> {
        let byte = *self
            .bytes
            .get(self.cursor)
            .ok_or(WireError::Truncated(self.cursor))?;
        self.cursor += 1;
        Ok(byte)
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        let raw = self.slice(4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn slice(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self
            .cursor
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(WireError::Truncated(self.cursor))?;
        let slice = &self.bytes[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }
}
