#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tagwire::adapter::{
    AdapterError, FormatableTransport, NdefTransport, NfcAdapter, TagIoError, TagTechnology,
    WatchDispatcher,
};
use tagwire::engine::NfcEngine;
use tagwire::types::{Message, Record, RecordType};

pub struct MockAdapter {
    enabled: AtomicBool,
    discovering: AtomicBool,
}

impl MockAdapter {
    pub fn new(enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            enabled: AtomicBool::new(enabled),
            discovering: AtomicBool::new(false),
        })
    }

    pub fn is_discovering(&self) -> bool {
        self.discovering.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NfcAdapter for MockAdapter {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn enable_discovery(&self) -> Result<(), AdapterError> {
        self.discovering.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disable_discovery(&self) {
        self.discovering.store(false, Ordering::SeqCst);
    }
}

/// An in-memory pre-formatted tag.
#[derive(Default)]
pub struct MemoryTag {
    pub content: Mutex<Vec<u8>>,
    connected: AtomicBool,
    fail_connect: AtomicBool,
}

impl MemoryTag {
    pub fn new(content: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            content: Mutex::new(content),
            ..Default::default()
        })
    }

    pub fn technology(self: &Arc<Self>) -> TagTechnology {
        TagTechnology::Ndef(self.clone())
    }

    /// Simulates the tag leaving the field.
    pub fn go_out_of_range(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl NdefTransport for MemoryTag {
    async fn connect(&self) -> Result<(), TagIoError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TagIoError::TagLost);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), TagIoError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn read_raw(&self) -> Result<Vec<u8>, TagIoError> {
        Ok(self.content.lock().unwrap().clone())
    }

    async fn write_raw(&self, bytes: &[u8]) -> Result<(), TagIoError> {
        *self.content.lock().unwrap() = bytes.to_vec();
        Ok(())
    }
}

/// An in-memory blank tag that only supports formatting.
#[derive(Default)]
pub struct FormatableTag {
    pub formatted: Mutex<Option<Vec<u8>>>,
    connected: AtomicBool,
}

impl FormatableTag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn technology(self: &Arc<Self>) -> TagTechnology {
        TagTechnology::Formatable(self.clone())
    }
}

#[async_trait]
impl FormatableTransport for FormatableTag {
    async fn connect(&self) -> Result<(), TagIoError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), TagIoError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn format(&self, bytes: &[u8]) -> Result<(), TagIoError> {
        *self.formatted.lock().unwrap() = Some(bytes.to_vec());
        Ok(())
    }
}

/// Records every dispatched watch match.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub calls: Mutex<Vec<(Vec<u32>, Message)>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl WatchDispatcher for RecordingDispatcher {
    async fn on_watch_match(&self, ids: &[u32], message: Message) {
        self.calls.lock().unwrap().push((ids.to_vec(), message));
    }
}

pub fn ready_engine() -> (NfcEngine, Arc<MockAdapter>, Arc<RecordingDispatcher>) {
    let adapter = MockAdapter::new(true);
    let dispatcher = RecordingDispatcher::new();
    let engine = NfcEngine::new(Some(adapter.clone()), dispatcher.clone(), true);
    (engine, adapter, dispatcher)
}

pub fn sample_message() -> Message {
    Message::new(
        vec![Record::new(
            RecordType::Text,
            "text/plain",
            b"hello".to_vec(),
        )],
        Some("https://origin.example/app"),
    )
}
