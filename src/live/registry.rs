//! Shared state of the live-update service, touched by both the UI thread and the worker.

use super::transport::{DocTransport, FetchParams, FetchRequest, FetchResponse};
use super::{Command, LiveEvent, LiveUpdateConfig};
use crate::doc::{DocContent, DocInfo};
use crate::error::FetchError;
use crate::persist;
use crossbeam::channel::Sender;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Called on the UI thread with each new version of a document.
pub type DocCallback = Arc<dyn Fn(&Arc<DocContent>) + Send + Sync>;

/// Identifies one subscription; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

struct Subscriber {
    id: SubscriptionId,
    callback: DocCallback,
}

/// Everything known about one subscribed document id.
struct LiveDocSubscriptions {
    params: FetchParams,
    save_path: Option<PathBuf>,
    subscribers: Vec<Subscriber>,
}

impl LiveDocSubscriptions {
    fn merge_params(&mut self, params: &FetchParams) {
        for query in &params.queries {
            if !self.params.queries.contains(query) {
                self.params.queries.push(query.clone());
            }
        }
        for image in &params.ignored_images {
            if !self.params.ignored_images.contains(image) {
                self.params.ignored_images.push(image.clone());
            }
        }
    }
}

/// One document to fetch, snapshotted under the lock.
struct FetchJob {
    doc_id: String,
    params: FetchParams,
    save_path: Option<PathBuf>,
    previous: Option<Arc<DocContent>>,
}

pub(crate) struct Registry {
    config: LiveUpdateConfig,
    transport: Arc<dyn DocTransport>,
    subscriptions: Mutex<HashMap<String, LiveDocSubscriptions>>,
    docs: Mutex<HashMap<String, Arc<DocContent>>>,
    /// branch doc id -> the doc id it was switched from
    switched_branches: Mutex<HashMap<String, String>>,
    /// doc id -> branches listed by the server
    branch_lists: Mutex<HashMap<String, Vec<DocInfo>>>,
    feedback: Mutex<Vec<String>>,
    paused: AtomicBool,
    events: Sender<LiveEvent>,
    commands: Sender<Command>,
}

impl Registry {
    pub(crate) fn new(
        config: LiveUpdateConfig,
        transport: Arc<dyn DocTransport>,
        events: Sender<LiveEvent>,
        commands: Sender<Command>,
    ) -> Registry {
        Registry {
            config,
            transport,
            subscriptions: Mutex::new(HashMap::new()),
            docs: Mutex::new(HashMap::new()),
            switched_branches: Mutex::new(HashMap::new()),
            branch_lists: Mutex::new(HashMap::new()),
            feedback: Mutex::new(Vec::new()),
            paused: AtomicBool::new(false),
            events,
            commands,
        }
    }

    pub(crate) fn config(&self) -> &LiveUpdateConfig {
        &self.config
    }

    fn save_path(&self, doc_id: &str) -> Option<PathBuf> {
        let dir = self.config.save_dir.as_ref()?;
        Some(persist::save_path(dir, &self.config.resource_name, doc_id))
    }

    fn send_command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("live update worker is gone, dropping {:?}", command);
        }
    }

    pub(crate) fn subscribe(
        &self,
        doc_id: &str,
        params: FetchParams,
        callback: DocCallback,
    ) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        let is_new = {
            let mut subscriptions = self.subscriptions.lock();
            let is_new = !subscriptions.contains_key(doc_id);
            let save_path = self.save_path(doc_id);
            let entry = subscriptions
                .entry(doc_id.to_string())
                .or_insert_with(|| LiveDocSubscriptions {
                    params: FetchParams::default(),
                    save_path,
                    subscribers: Vec::new(),
                });
            entry.merge_params(&params);
            entry.subscribers.push(Subscriber { id, callback });
            is_new
        };

        if is_new {
            self.load_placeholder(doc_id);
            self.send_command(Command::FetchNow);
        }
        id
    }

    /// Loads the saved copy of a document if nothing newer is in memory yet.
    fn load_placeholder(&self, doc_id: &str) {
        if self.docs.lock().contains_key(doc_id) {
            return;
        }
        let path = match self.save_path(doc_id) {
            Some(path) if path.exists() => path,
            _ => return,
        };
        match persist::load(&path) {
            Ok(doc) => {
                let doc = Arc::new(doc);
                self.docs
                    .lock()
                    .entry(doc_id.to_string())
                    .or_insert_with(|| doc.clone());
                let _ = self.events.send(LiveEvent::Updated {
                    doc_id: doc_id.to_string(),
                    doc,
                    bytes: None,
                });
            }
            Err(e) => warn!(
                "unable to load saved copy of {} from {}: {}",
                doc_id,
                path.display(),
                e
            ),
        }
    }

    /// Returns false if no such subscription exists.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let emptied = {
            let mut subscriptions = self.subscriptions.lock();
            let doc_id = subscriptions
                .iter()
                .find(|(_, entry)| entry.subscribers.iter().any(|s| s.id == id))
                .map(|(doc_id, _)| doc_id.clone());
            let doc_id = match doc_id {
                Some(doc_id) => doc_id,
                None => return false,
            };
            let empty = match subscriptions.get_mut(&doc_id) {
                Some(entry) => {
                    entry.subscribers.retain(|s| s.id != id);
                    entry.subscribers.is_empty()
                }
                None => false,
            };
            if empty {
                subscriptions.remove(&doc_id);
                Some(doc_id)
            } else {
                None
            }
        };

        if let Some(doc_id) = emptied {
            debug!("last subscriber of {} is gone", doc_id);
            self.switched_branches.lock().remove(&doc_id);
        }
        true
    }

    pub(crate) fn subscribed_doc_ids(&self) -> Vec<String> {
        self.subscriptions.lock().keys().cloned().collect()
    }

    pub(crate) fn doc(&self, doc_id: &str) -> Option<Arc<DocContent>> {
        self.docs.lock().get(doc_id).cloned()
    }

    pub(crate) fn branches(&self, doc_id: &str) -> Vec<DocInfo> {
        self.branch_lists.lock().get(doc_id).cloned().unwrap_or_default()
    }

    /// Callbacks of the subscribers currently registered for `doc_id`.
    pub(crate) fn callbacks(&self, doc_id: &str) -> Vec<DocCallback> {
        self.subscriptions
            .lock()
            .get(doc_id)
            .map(|entry| {
                entry
                    .subscribers
                    .iter()
                    .map(|s| s.callback.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Moves everyone subscribed to `original` over to `branch`.
    pub(crate) fn switch_branch(&self, original: &str, branch: &str) -> bool {
        if original == branch {
            return false;
        }
        {
            let mut subscriptions = self.subscriptions.lock();
            let mut entry = match subscriptions.remove(original) {
                Some(entry) => entry,
                None => return false,
            };
            entry.save_path = self.save_path(branch);
            match subscriptions.get_mut(branch) {
                Some(existing) => {
                    existing.merge_params(&entry.params);
                    existing.subscribers.append(&mut entry.subscribers);
                }
                None => {
                    subscriptions.insert(branch.to_string(), entry);
                }
            }
        }

        // switching from a branch to another branch still reverts to the first original
        let mut switched = self.switched_branches.lock();
        let root = switched.remove(original).unwrap_or_else(|| original.to_string());
        switched.insert(branch.to_string(), root);
        drop(switched);

        info!("switched {} to branch {}", original, branch);
        self.send_command(Command::FetchNow);
        true
    }

    /// The doc id `branch` was switched from, if it is a switched-to branch.
    pub(crate) fn original_of(&self, branch: &str) -> Option<String> {
        self.switched_branches.lock().get(branch).cloned()
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        let was_paused = self.paused.swap(paused, Ordering::SeqCst);
        if was_paused && !paused {
            self.send_command(Command::FetchNow);
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub(crate) fn take_feedback(&self) -> Vec<String> {
        std::mem::take(&mut *self.feedback.lock())
    }

    fn snapshot(&self) -> Vec<FetchJob> {
        let mut jobs: Vec<FetchJob> = self
            .subscriptions
            .lock()
            .iter()
            .map(|(doc_id, entry)| FetchJob {
                doc_id: doc_id.clone(),
                params: entry.params.clone(),
                save_path: entry.save_path.clone(),
                previous: None,
            })
            .collect();
        let docs = self.docs.lock();
        for job in &mut jobs {
            job.previous = docs.get(&job.doc_id).cloned();
        }
        jobs
    }

    /// Fetches every subscribed document once. Returns how many documents were updated.
    ///
    /// A failing document doesn't stop the others.
    pub(crate) fn fetch_cycle(&self) -> usize {
        let jobs = self.snapshot();
        debug!("fetch cycle over {} documents", jobs.len());
        let mut updated = 0;
        for job in jobs {
            let request = FetchRequest {
                auth_token: self.config.auth_token.clone(),
                queries: job.params.queries.clone(),
                ignored_images: job.params.ignored_images.clone(),
                last_modified: job.previous.as_ref().map(|doc| doc.last_modified.clone()),
                version: job.previous.as_ref().map(|doc| doc.version.clone()),
                proxy: self.config.proxy.clone(),
            };

            let request_json = match request.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!("unable to serialize request for {}: {}", job.doc_id, e);
                    continue;
                }
            };

            match self.transport.fetch(&job.doc_id, &request_json) {
                Ok(FetchResponse::Unmodified) => debug!("{} is unmodified", job.doc_id),
                Ok(FetchResponse::Document(bytes)) => {
                    if self.accept(&job, bytes) {
                        updated += 1;
                    }
                }
                Err(e) => {
                    error!("fetching {} failed: {:?}", job.doc_id, e);
                    self.fetch_failed(&job.doc_id, &e);
                }
            }
        }
        updated
    }

    fn accept(&self, job: &FetchJob, bytes: Vec<u8>) -> bool {
        let doc = match DocContent::decode(&bytes) {
            Ok(doc) => Arc::new(doc),
            Err(e) => {
                error!("unable to decode {}: {}", job.doc_id, e);
                return false;
            }
        };
        for message in &doc.errors {
            warn!("{}: {}", job.doc_id, message);
        }

        self.branch_lists.lock().insert(job.doc_id.clone(), doc.branches.clone());
        self.docs.lock().insert(job.doc_id.clone(), doc.clone());
        if let Some(path) = &job.save_path {
            if let Err(e) = persist::save(path, &bytes) {
                error!("unable to save {} to {}: {}", job.doc_id, path.display(), e);
            }
        }

        let event = LiveEvent::Updated {
            doc_id: job.doc_id.clone(),
            doc,
            bytes: Some(Arc::new(bytes)),
        };
        if self.events.send(event).is_err() {
            debug!("nobody is polling for updates");
        }
        true
    }

    fn fetch_failed(&self, doc_id: &str, err: &FetchError) {
        let message = err.feedback_message();
        let original = self.switched_branches.lock().remove(doc_id);
        let original = match original {
            Some(original) => original,
            None => {
                self.feedback.lock().push(message);
                return;
            }
        };

        {
            let mut subscriptions = self.subscriptions.lock();
            if let Some(mut entry) = subscriptions.remove(doc_id) {
                entry.save_path = self.save_path(&original);
                match subscriptions.get_mut(&original) {
                    Some(existing) => existing.subscribers.append(&mut entry.subscribers),
                    None => {
                        subscriptions.insert(original.clone(), entry);
                    }
                }
            }
        }
        warn!("branch {} failed, reverting to {}", doc_id, original);
        self.feedback.lock().push(format!("{}; reverting to {}", message, original));
        self.send_command(Command::FetchNow);
    }
}
