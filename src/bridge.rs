//! Request/response correlation over one-way view events.
//!
//! The webview only receives events and calls commands, so a query such as
//! "do you have unsaved changes?" is sent with a request id and answered by
//! a command carrying the same id.

use std::{collections::HashMap, sync::Mutex, time::Duration};

use log::debug;
use tokio::sync::oneshot;
use uuid::Uuid;

pub struct ReplyRegistry<T> {
    pending: Mutex<HashMap<String, oneshot::Sender<T>>>,
}

impl<T> Default for ReplyRegistry<T> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> ReplyRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> (String, oneshot::Receiver<T>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id.clone(), tx);
        (id, rx)
    }

    /// Delivers a reply. Unknown or already-expired ids return `false`.
    pub fn resolve(&self, id: &str, value: T) -> bool {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(id);
        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => {
                debug!("Dropping reply for unknown request {id}");
                false
            }
        }
    }

    /// Waits for the reply to `id`, giving up after `timeout`.
    pub async fn wait(&self, id: &str, rx: oneshot::Receiver<T>, timeout: Duration) -> Option<T> {
        let outcome = tokio::time::timeout(timeout, rx).await;
        self.pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(id);
        match outcome {
            Ok(Ok(value)) => Some(value),
            _ => None,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}
