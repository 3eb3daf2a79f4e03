//! Keeping documents up to date with the server.
//!
//! [`LiveUpdate`] owns a background worker that refetches every subscribed document on an
//! interval. The worker only produces decoded documents; subscribers are called from
//! [`LiveUpdate::poll`], which the UI thread should call once per frame.

mod registry;
mod transport;

pub use registry::{DocCallback, SubscriptionId};
pub use transport::{DocTransport, FetchParams, FetchRequest, FetchResponse, ProxyConfig};

use crate::doc::{DocContent, DocInfo};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, error};
use registry::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveUpdateConfig {
    pub fetch_interval: Duration,
    pub auth_token: String,
    pub proxy: ProxyConfig,
    /// Where last-known-good documents are kept. `None` disables saving.
    pub save_dir: Option<PathBuf>,
    /// Prefix of saved file names, so several apps can share a directory.
    pub resource_name: String,
}

impl Default for LiveUpdateConfig {
    fn default() -> Self {
        LiveUpdateConfig {
            fetch_interval: Duration::from_secs(5),
            auth_token: String::new(),
            proxy: ProxyConfig::None,
            save_dir: None,
            resource_name: "doc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    FetchNow,
    Shutdown,
}

/// Worker -> UI thread.
pub(crate) enum LiveEvent {
    Updated {
        doc_id: String,
        doc: Arc<DocContent>,
        /// Absent for documents loaded from disk.
        bytes: Option<Arc<Vec<u8>>>,
    },
}

type InvalidateHook = Box<dyn Fn(&str) + Send>;
type BytesCallback = Box<dyn Fn(&str, &[u8]) + Send>;

/// The live-update service.
pub struct LiveUpdate {
    registry: Arc<Registry>,
    event_recv: Receiver<LiveEvent>,
    command_send: Sender<Command>,
    command_recv: Option<Receiver<Command>>,
    worker: Option<JoinHandle<()>>,
    on_invalidate: Option<InvalidateHook>,
    on_bytes: Option<BytesCallback>,
}

impl LiveUpdate {
    /// Creates the service. Nothing is fetched in the background until [`start`](Self::start);
    /// until then [`fetch_now`](Self::fetch_now) runs a cycle on the calling thread.
    pub fn new(config: LiveUpdateConfig, transport: Arc<dyn DocTransport>) -> LiveUpdate {
        let (event_send, event_recv) = channel::unbounded();
        let (command_send, command_recv) = channel::unbounded();
        LiveUpdate {
            registry: Arc::new(Registry::new(
                config,
                transport,
                event_send,
                command_send.clone(),
            )),
            event_recv,
            command_send,
            command_recv: Some(command_recv),
            worker: None,
            on_invalidate: None,
            on_bytes: None,
        }
    }

    /// Starts the background worker. Does nothing if it's already running.
    pub fn start(&mut self) -> Result<(), crate::Error> {
        let command_recv = match self.command_recv.take() {
            Some(recv) => recv,
            None => return Ok(()),
        };
        let registry = self.registry.clone();
        let handle = thread::Builder::new()
            .name("live-update".to_string())
            .spawn(move || run_worker(registry, command_recv))?;
        self.worker = Some(handle);
        Ok(())
    }

    pub fn config(&self) -> &LiveUpdateConfig {
        self.registry.config()
    }

    /// Adds a subscriber for `doc_id`.
    ///
    /// The first subscriber of a document triggers a fetch and, if a saved copy exists, makes it
    /// available right away; it's delivered on the next [`poll`](Self::poll).
    pub fn subscribe<F>(&self, doc_id: &str, params: FetchParams, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<DocContent>) + Send + Sync + 'static,
    {
        self.registry.subscribe(doc_id, params, Arc::new(callback))
    }

    /// Removes a subscriber. The document stops being fetched once nobody is subscribed to it.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    /// Document ids the next fetch cycle will fetch.
    pub fn subscribed_doc_ids(&self) -> Vec<String> {
        self.registry.subscribed_doc_ids()
    }

    /// Latest version of a document, if one was fetched or loaded.
    pub fn doc(&self, doc_id: &str) -> Option<Arc<DocContent>> {
        self.registry.doc(doc_id)
    }

    /// Branches of `doc_id` as listed in its last fetched version.
    pub fn branches(&self, doc_id: &str) -> Vec<DocInfo> {
        self.registry.branches(doc_id)
    }

    /// Shows `branch` wherever `original` was shown. If fetching the branch fails, subscribers
    /// go back to the original document.
    pub fn switch_branch(&self, original: &str, branch: &str) -> bool {
        self.registry.switch_branch(original, branch)
    }

    /// The document `branch` was switched from, if any.
    pub fn original_of(&self, branch: &str) -> Option<String> {
        self.registry.original_of(branch)
    }

    /// Stops periodic fetching, e.g. while the app is in the background. Resuming fetches at once.
    pub fn set_paused(&self, paused: bool) {
        self.registry.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.registry.is_paused()
    }

    /// Asks the worker for a fetch cycle now, or runs one on this thread if the worker isn't
    /// running. Returns the number of documents updated when run here.
    pub fn fetch_now(&self) -> Option<usize> {
        if self.worker.is_some() {
            let _ = self.command_send.send(Command::FetchNow);
            None
        } else {
            Some(self.registry.fetch_cycle())
        }
    }

    /// Messages for the user about failed fetches, oldest first.
    pub fn take_feedback(&self) -> Vec<String> {
        self.registry.take_feedback()
    }

    /// Called with the doc id before subscribers hear about a new version, to drop anything
    /// derived from the old one.
    pub fn set_invalidation_hook(&mut self, hook: impl Fn(&str) + Send + 'static) {
        self.on_invalidate = Some(Box::new(hook));
    }

    /// Called with the raw bytes of every fetched document.
    pub fn set_bytes_callback(&mut self, callback: impl Fn(&str, &[u8]) + Send + 'static) {
        self.on_bytes = Some(Box::new(callback));
    }

    /// Delivers pending updates to subscribers. Returns the number of updates delivered.
    ///
    /// Only subscribers still registered when the update is delivered are called.
    pub fn poll(&self) -> usize {
        let mut delivered = 0;
        loop {
            match self.event_recv.try_recv() {
                Ok(LiveEvent::Updated { doc_id, doc, bytes }) => {
                    if let Some(hook) = &self.on_invalidate {
                        hook(&doc_id);
                    }
                    for callback in self.registry.callbacks(&doc_id) {
                        callback(&doc);
                    }
                    if let (Some(on_bytes), Some(bytes)) = (&self.on_bytes, &bytes) {
                        on_bytes(&doc_id, bytes);
                    }
                    delivered += 1;
                }
                Err(TryRecvError::Empty) => break,
                // the registry holds the sender for as long as we exist
                Err(TryRecvError::Disconnected) => break,
            }
        }
        delivered
    }
}

impl Drop for LiveUpdate {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.command_send.send(Command::Shutdown);
            if worker.join().is_err() {
                error!("live update worker panicked");
            }
        }
    }
}

fn run_worker(registry: Arc<Registry>, commands: Receiver<Command>) {
    let interval = registry.config().fetch_interval;
    loop {
        match commands.recv_timeout(interval) {
            Ok(Command::FetchNow) | Err(RecvTimeoutError::Timeout) => {
                if registry.is_paused() {
                    continue;
                }
                let updated = registry.fetch_cycle();
                debug!("fetch cycle updated {} documents", updated);
            }
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("live update worker stopped");
}
