use serde::{Deserialize, Serialize};

/// The kinds of records a [`Message`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    Empty,
    Url,
    Text,
    Json,
    Opaque,
}

/// A single logical record inside a [`Message`].
///
/// [`RecordType::Empty`] records carry neither a media type nor data; every
/// other type carries both, with a non-empty media type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_type: RecordType,
    pub media_type: Option<String>,
    pub data: Option<Vec<u8>>,
}

impl Record {
    pub fn new(record_type: RecordType, media_type: &str, data: Vec<u8>) -> Self {
        Self {
            record_type,
            media_type: Some(media_type.to_string()),
            data: Some(data),
        }
    }

    pub fn empty() -> Self {
        Self {
            record_type: RecordType::Empty,
            media_type: None,
            data: None,
        }
    }
}

/// An ordered sequence of records plus the optional URL of the page that
/// produced the message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub records: Vec<Record>,
    pub url: Option<String>,
}

impl Message {
    pub fn new(records: Vec<Record>, url: Option<&str>) -> Self {
        Self {
            records,
            url: url.map(str::to_string),
        }
    }
}

/// The device class a push is aimed at. Only passive tags are supported;
/// peer-to-peer pushes are rejected with `NotSupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushTarget {
    Tag,
    Peer,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PushOptions {
    pub target: PushTarget,
    /// Milliseconds until the push expires with `TimerExpired`.
    /// `f64::INFINITY` disables the timer; negative and NaN values are
    /// rejected at `push()` time.
    pub timeout_ms: f64,
    /// Suppresses the watch read pass while this push is outstanding.
    pub ignore_read: bool,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            target: PushTarget::Tag,
            timeout_ms: f64::INFINITY,
            ignore_read: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchMode {
    /// Only messages that round-tripped a non-empty origin URL match.
    WebNfcOnly,
    Any,
}

/// A persistent filter against inbound messages. Watchers are level
/// triggered: a match does not consume them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchOptions {
    /// URL pattern matched against the message URL. Empty matches anything.
    pub url: String,
    /// Exact media type filter. `None` accepts every media type.
    pub media_type: Option<String>,
    /// Exact record type filter. `None` accepts every record type.
    pub record_type: Option<RecordType>,
    pub mode: WatchMode,
}

impl Default for WatchMode {
    fn default() -> Self {
        WatchMode::Any
    }
}
