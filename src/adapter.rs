//! Seams to the platform: the NFC adapter, the byte-level tag transports a
//! discovered tag exposes, and the client-side watch dispatch sink.
//!
//! The host delivers discovered tags by calling
//! [`NfcEngine::on_tag_discovered`](crate::engine::NfcEngine::on_tag_discovered)
//! with the tag's [`TagTechnology`].

use async_trait::async_trait;
use std::sync::Arc;
use tagcore::types::Message;
use thiserror::Error;

/// Failure modes of the tag I/O primitives.
#[derive(Debug, Error)]
pub enum TagIoError {
    #[error("tag left the field")]
    TagLost,
    #[error("tag content is malformed: {0}")]
    Format(String),
    #[error("tag I/O failed: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("the NFC adapter is unavailable")]
    Unavailable,
    #[error("adapter request failed: {0}")]
    Io(String),
}

/// Platform NFC adapter: power state plus discovery-mode control.
#[async_trait]
pub trait NfcAdapter: Send + Sync {
    fn is_enabled(&self) -> bool;
    async fn enable_discovery(&self) -> Result<(), AdapterError>;
    async fn disable_discovery(&self);
}

/// A tag already formatted for NDEF, exchanged with at the byte level.
#[async_trait]
pub trait NdefTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TagIoError>;
    async fn close(&self) -> Result<(), TagIoError>;
    async fn is_connected(&self) -> bool;
    async fn read_raw(&self) -> Result<Vec<u8>, TagIoError>;
    async fn write_raw(&self, bytes: &[u8]) -> Result<(), TagIoError>;
}

/// A blank tag that must be formatted before it can carry content; its
/// format primitive doubles as the write.
#[async_trait]
pub trait FormatableTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TagIoError>;
    async fn close(&self) -> Result<(), TagIoError>;
    async fn is_connected(&self) -> bool;
    async fn format(&self, bytes: &[u8]) -> Result<(), TagIoError>;
}

/// The two tag technologies a discovered tag can expose.
#[derive(Clone)]
pub enum TagTechnology {
    Ndef(Arc<dyn NdefTransport>),
    Formatable(Arc<dyn FormatableTransport>),
}

/// Client-side sink for watch matches.
#[async_trait]
pub trait WatchDispatcher: Send + Sync {
    /// Called once per inbound message with every watcher id it matched.
    async fn on_watch_match(&self, ids: &[u32], message: Message);
}
