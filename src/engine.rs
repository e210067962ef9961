use crate::adapter::{NfcAdapter, TagTechnology, WatchDispatcher};
use crate::error::NfcError;
use crate::session::TagSession;
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tagcore::types::{Message, PushOptions, PushTarget, WatchOptions};
use tagcore::{convert, matcher, validator};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

/// A push awaiting a tag. Completed exactly once: the completer is consumed
/// when the operation is taken out of the engine.
struct PendingPush {
    message: Message,
    options: PushOptions,
    completer: oneshot::Sender<Result<(), NfcError>>,
    timeout_task: Option<JoinHandle<()>>,
}

fn resolve_push(op: PendingPush, outcome: Result<(), NfcError>) {
    if let Some(task) = op.timeout_task {
        task.abort();
    }
    // The receiver may have gone away; completion is best effort then.
    let _ = op.completer.send(outcome);
}

/// The push/watch protocol engine.
///
/// One engine serves one client context. The handle is cheap to clone;
/// state cells are individually locked so operations may be issued from any
/// task. The host delivers discovered tags through
/// [`NfcEngine::on_tag_discovered`].
#[derive(Clone)]
pub struct NfcEngine {
    shared: Arc<Shared>,
}

struct Shared {
    adapter: Option<Arc<dyn NfcAdapter>>,
    dispatcher: Arc<dyn WatchDispatcher>,
    has_permission: bool,
    foreground: AtomicBool,
    suspended: AtomicBool,
    closed: AtomicBool,
    discovery_active: AtomicBool,
    pending_push: Mutex<Option<PendingPush>>,
    watchers: Mutex<IndexMap<u32, WatchOptions>>,
    watcher_id_counter: AtomicU32,
    current_session: Mutex<Option<TagSession>>,
}

impl NfcEngine {
    pub fn new(
        adapter: Option<Arc<dyn NfcAdapter>>,
        dispatcher: Arc<dyn WatchDispatcher>,
        has_permission: bool,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                adapter,
                dispatcher,
                has_permission,
                foreground: AtomicBool::new(true),
                suspended: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                discovery_active: AtomicBool::new(false),
                pending_push: Mutex::new(None),
                watchers: Mutex::new(IndexMap::new()),
                watcher_id_counter: AtomicU32::new(1),
                current_session: Mutex::new(None),
            }),
        }
    }

    /// Host hook for foreground/background transitions of the owning
    /// context. An engine without a foreground context fails the readiness
    /// gate with `Security`.
    pub fn set_foreground(&self, foreground: bool) {
        self.shared.foreground.store(foreground, Ordering::Release);
    }

    /// Queues a message to be written to the next tag in range and resolves
    /// with the operation's terminal outcome. Early rejections resolve
    /// synchronously through the same `Result`. A push issued while another
    /// is outstanding cancels the prior one first.
    pub async fn push(&self, message: Message, options: PushOptions) -> Result<(), NfcError> {
        let shared = &self.shared;
        shared.check_ready()?;
        if !validator::is_valid(Some(&message)) {
            return Err(NfcError::InvalidMessage);
        }
        if options.target == PushTarget::Peer {
            return Err(NfcError::NotSupported);
        }
        if options.timeout_ms.is_nan() || options.timeout_ms < 0.0 {
            return Err(NfcError::NotSupported);
        }

        let (completer, receiver) = oneshot::channel();
        {
            let mut pending = shared.pending_push.lock().await;
            if let Some(prev) = pending.take() {
                debug!(target: "Engine/Push", "replacing outstanding push");
                resolve_push(prev, Err(NfcError::OperationCancelled));
            }
            *pending = Some(PendingPush {
                message,
                options,
                completer,
                timeout_task: None,
            });
        }

        arm_push_timeout(shared, options.timeout_ms).await;
        shared.ensure_discovery().await;
        shared.service_current_session().await;

        match receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(NfcError::OperationCancelled),
        }
    }

    /// Cancels the outstanding push, completing it with
    /// `OperationCancelled`. Active watchers are unaffected.
    pub async fn cancel_push(&self, target: PushTarget) -> Result<(), NfcError> {
        let shared = &self.shared;
        shared.check_ready()?;
        if target == PushTarget::Peer {
            return Err(NfcError::NotSupported);
        }
        // Bind before matching: the guard must not outlive the take.
        let taken = shared.pending_push.lock().await.take();
        match taken {
            None => Err(NfcError::NotFound),
            Some(op) => {
                resolve_push(op, Err(NfcError::OperationCancelled));
                shared.disable_discovery_if_idle().await;
                Ok(())
            }
        }
    }

    /// Registers a persistent watcher and returns its id. Ids increase
    /// monotonically from 1 and are never reused.
    pub async fn watch(&self, options: WatchOptions) -> Result<u32, NfcError> {
        let shared = &self.shared;
        shared.check_ready()?;
        let id = shared.watcher_id_counter.fetch_add(1, Ordering::Relaxed);
        shared.watchers.lock().await.insert(id, options);
        debug!(target: "Engine/Watch", "registered watcher {id}");
        shared.ensure_discovery().await;
        shared.service_current_session().await;
        Ok(id)
    }

    pub async fn cancel_watch(&self, id: u32) -> Result<(), NfcError> {
        let shared = &self.shared;
        shared.check_ready()?;
        if shared.watchers.lock().await.shift_remove(&id).is_none() {
            return Err(NfcError::NotFound);
        }
        shared.disable_discovery_if_idle().await;
        Ok(())
    }

    pub async fn cancel_all_watches(&self) -> Result<(), NfcError> {
        let shared = &self.shared;
        shared.check_ready()?;
        {
            let mut watchers = shared.watchers.lock().await;
            if watchers.is_empty() {
                return Err(NfcError::NotFound);
            }
            watchers.clear();
        }
        shared.disable_discovery_if_idle().await;
        Ok(())
    }

    /// Pauses all hardware interaction without losing registered state.
    /// Idempotent.
    pub async fn suspend(&self) {
        if self.shared.suspended.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(target: "Engine/Discovery", "suspending");
        self.shared.disable_discovery().await;
    }

    /// Resumes hardware interaction; discovery is re-armed only if a push
    /// or watcher is still pending.
    pub async fn resume(&self) {
        let shared = &self.shared;
        if !shared.suspended.swap(false, Ordering::AcqRel) {
            return;
        }
        let has_pending = shared.pending_push.lock().await.is_some()
            || !shared.watchers.lock().await.is_empty();
        if has_pending {
            shared.ensure_discovery().await;
        }
    }

    /// Irreversible teardown. Completes an outstanding push with
    /// `OperationCancelled`; subsequent operations fail the readiness gate.
    pub async fn close(&self) {
        let shared = &self.shared;
        if shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(target: "Engine", "closing");
        shared.disable_discovery().await;
        if let Some(op) = shared.pending_push.lock().await.take() {
            resolve_push(op, Err(NfcError::OperationCancelled));
        }
        shared.watchers.lock().await.clear();
        if let Some(session) = shared.current_session.lock().await.take() {
            if session.is_connected().await {
                if let Err(e) = session.close().await {
                    debug!(target: "Tag/Session", "close failed: {e}");
                }
            }
        }
    }

    /// Entry point for the host's tag discovery callback. Services watches
    /// first, then the pending push, within one discovery event.
    pub async fn on_tag_discovered(&self, technology: TagTechnology) {
        let shared = &self.shared;
        if shared.closed.load(Ordering::Acquire) || shared.suspended.load(Ordering::Acquire) {
            return;
        }
        debug!(target: "Engine/Discovery", "tag entered the field");
        *shared.current_session.lock().await = Some(TagSession::new(technology));
        shared.service_current_session().await;
    }
}

impl Shared {
    fn check_ready(&self) -> Result<(), NfcError> {
        if self.closed.load(Ordering::Acquire)
            || !self.has_permission
            || !self.foreground.load(Ordering::Acquire)
        {
            return Err(NfcError::Security);
        }
        let Some(adapter) = &self.adapter else {
            return Err(NfcError::NotSupported);
        };
        if !adapter.is_enabled() {
            return Err(NfcError::DeviceDisabled);
        }
        Ok(())
    }

    async fn service_current_session(&self) {
        let dispatch = {
            let mut guard = self.current_session.lock().await;
            let Some(session) = guard.as_mut() else {
                return;
            };
            if session.is_out_of_range().await {
                debug!(target: "Engine/Discovery", "tag out of range, discarding session");
                *guard = None;
                return;
            }
            // Read before the push write lands on the tag.
            let dispatch = self.collect_watch_matches(session).await;
            self.service_push(session).await;
            if session.is_connected().await {
                if let Err(e) = session.close().await {
                    debug!(target: "Tag/Session", "close failed: {e}");
                }
            }
            dispatch
        };
        // Dispatch outside the session lock so the callback may re-enter
        // the engine.
        if let Some((ids, message)) = dispatch {
            self.dispatcher.on_watch_match(&ids, message).await;
        }
    }

    /// Reads the tag and matches its content against registered watchers.
    /// Read and decode failures are logged and skipped; watchers retry on
    /// the next discovery.
    async fn collect_watch_matches(&self, session: &mut TagSession) -> Option<(Vec<u32>, Message)> {
        if let Some(op) = self.pending_push.lock().await.as_ref() {
            if op.options.ignore_read {
                return None;
            }
        }
        let snapshot: Vec<(u32, WatchOptions)> = self
            .watchers
            .lock()
            .await
            .iter()
            .map(|(id, options)| (*id, options.clone()))
            .collect();
        if snapshot.is_empty() {
            return None;
        }

        if let Err(e) = session.connect().await {
            warn!(target: "Engine/Watch", "connect failed, read skipped: {e}");
            return None;
        }
        let wire = match session.read().await {
            Ok(wire) => wire,
            Err(e) => {
                warn!(target: "Engine/Watch", "tag read failed, skipped: {e}");
                return None;
            }
        };
        let message = match convert::from_wire_format(&wire) {
            Ok(message) => message,
            Err(e) => {
                warn!(target: "Engine/Watch", "tag content undecodable, skipped: {e}");
                return None;
            }
        };

        let ids: Vec<u32> = snapshot
            .iter()
            .filter(|(_, options)| matcher::matches(&message, options))
            .map(|(id, _)| *id)
            .collect();
        if ids.is_empty() {
            debug!(target: "Engine/Watch", "no watcher matched the inbound message");
            return None;
        }
        Some((ids, message))
    }

    /// Writes the pending message, completing the operation exactly once
    /// with the write's outcome.
    async fn service_push(&self, session: &mut TagSession) {
        let Some(op) = self.pending_push.lock().await.take() else {
            return;
        };
        info!(target: "Engine/Push", "tag in range, writing pending message");
        let outcome = write_message(session, &op.message).await;
        if let Err(e) = &outcome {
            warn!(target: "Engine/Push", "push failed: {e}");
        }
        resolve_push(op, outcome);
        self.disable_discovery_if_idle().await;
    }

    async fn ensure_discovery(&self) {
        if self.suspended.load(Ordering::Acquire) {
            return;
        }
        let Some(adapter) = &self.adapter else {
            return;
        };
        if self.discovery_active.swap(true, Ordering::AcqRel) {
            return;
        }
        match adapter.enable_discovery().await {
            Ok(()) => debug!(target: "Engine/Discovery", "discovery mode enabled"),
            Err(e) => {
                warn!(target: "Engine/Discovery", "failed to enable discovery mode: {e}");
                self.discovery_active.store(false, Ordering::Release);
            }
        }
    }

    async fn disable_discovery(&self) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        if self.discovery_active.swap(false, Ordering::AcqRel) {
            adapter.disable_discovery().await;
            debug!(target: "Engine/Discovery", "discovery mode disabled");
        }
    }

    async fn disable_discovery_if_idle(&self) {
        let has_push = self.pending_push.lock().await.is_some();
        let has_watchers = !self.watchers.lock().await.is_empty();
        if !has_push && !has_watchers {
            self.disable_discovery().await;
        }
    }
}

/// Arms the timeout task for the pending push. The task is aborted inside
/// the same critical section that removes the operation, so it can never
/// fire after completion.
async fn arm_push_timeout(shared: &Arc<Shared>, timeout_ms: f64) {
    if !timeout_ms.is_finite() {
        return;
    }
    // Absurdly large finite timeouts behave like no timeout.
    let Ok(timeout) = Duration::try_from_secs_f64(timeout_ms / 1000.0) else {
        return;
    };
    let task_shared = Arc::clone(shared);
    let handle = tokio::spawn(async move {
        sleep(timeout).await;
        let taken = task_shared.pending_push.lock().await.take();
        if let Some(mut op) = taken {
            info!(target: "Engine/Push", "push timed out after {timeout_ms}ms");
            // This task is the timeout task; it must not abort itself.
            op.timeout_task = None;
            resolve_push(op, Err(NfcError::TimerExpired));
            task_shared.disable_discovery_if_idle().await;
        }
    });
    let mut pending = shared.pending_push.lock().await;
    match pending.as_mut() {
        Some(op) => op.timeout_task = Some(handle),
        // Completed between store and arm; the timer must not fire.
        None => handle.abort(),
    }
}

async fn write_message(session: &mut TagSession, message: &Message) -> Result<(), NfcError> {
    let wire = convert::to_wire_format(message)?;
    session.connect().await?;
    session.write(&wire).await?;
    Ok(())
}
