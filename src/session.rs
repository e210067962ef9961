use crate::adapter::{TagIoError, TagTechnology};
use log::debug;
use tagcore::ndef::{NdefMessage, NdefRecord, wire};

/// One proximity session with a discovered tag.
///
/// Sessions are ephemeral: once [`TagSession::is_out_of_range`] reports
/// true the instance must be discarded and a fresh discovery awaited.
pub struct TagSession {
    tech: TagTechnology,
    connected_once: bool,
}

impl TagSession {
    pub fn new(tech: TagTechnology) -> Self {
        Self {
            tech,
            connected_once: false,
        }
    }

    /// Connects to the tag. Idempotent while already connected.
    pub async fn connect(&mut self) -> Result<(), TagIoError> {
        if self.is_connected().await {
            return Ok(());
        }
        match &self.tech {
            TagTechnology::Ndef(t) => t.connect().await?,
            TagTechnology::Formatable(t) => t.connect().await?,
        }
        self.connected_once = true;
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        match &self.tech {
            TagTechnology::Ndef(t) => t.is_connected().await,
            TagTechnology::Formatable(t) => t.is_connected().await,
        }
    }

    /// Reads and parses the tag's current NDEF content. Requires a
    /// connected session.
    pub async fn read(&self) -> Result<NdefMessage, TagIoError> {
        match &self.tech {
            TagTechnology::Ndef(t) => {
                let bytes = t.read_raw().await?;
                wire::parse(&bytes).map_err(|e| TagIoError::Format(e.to_string()))
            }
            // A blank formatable tag cannot carry content reliably yet;
            // present it as a single empty record.
            TagTechnology::Formatable(_) => Ok(NdefMessage::new(vec![NdefRecord::empty()])),
        }
    }

    /// Serializes and writes a message to the tag. Requires a connected
    /// session.
    pub async fn write(&self, message: &NdefMessage) -> Result<(), TagIoError> {
        let bytes = wire::serialize(message).map_err(|e| TagIoError::Format(e.to_string()))?;
        match &self.tech {
            TagTechnology::Ndef(t) => t.write_raw(&bytes).await,
            TagTechnology::Formatable(t) => t.format(&bytes).await,
        }
    }

    /// Probes whether the tag has left the field by attempting a reconnect.
    /// A connect failure on a session that has never connected may be
    /// transient and is not yet treated as out of range.
    pub async fn is_out_of_range(&mut self) -> bool {
        if self.connect().await.is_ok() {
            return false;
        }
        debug!(
            target: "Tag/Session",
            "reconnect failed, connected before: {}", self.connected_once
        );
        self.connected_once
    }

    pub async fn close(&self) -> Result<(), TagIoError> {
        match &self.tech {
            TagTechnology::Ndef(t) => t.close().await,
            TagTechnology::Formatable(t) => t.close().await,
        }
    }
}
