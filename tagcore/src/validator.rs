use crate::types::{Message, Record, RecordType};

/// Checks the structural invariants a message must satisfy before it may be
/// encoded for a tag. Total: never panics, an absent message is invalid.
pub fn is_valid(message: Option<&Message>) -> bool {
    let Some(message) = message else {
        return false;
    };
    if message.records.is_empty() {
        return false;
    }
    message.records.iter().all(is_valid_record)
}

fn is_valid_record(record: &Record) -> bool {
    if record.record_type == RecordType::Empty {
        return true;
    }
    record.data.is_some() && record.media_type.as_deref().is_some_and(|m| !m.is_empty())
}
