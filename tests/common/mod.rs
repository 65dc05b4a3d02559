//! Shared fixtures for the session integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use eclipse_pdf_lib::{
    clock::ManualClock,
    config::AppConfig,
    launch::DocumentReference,
    models::UserIdentity,
    navigation::{DocumentView, MenuConfig, UnsavedChoice, ViewCommand, WindowShell},
    remote::{EntitlementResponse, RemoteError, RemoteService},
    session::{self, SessionDeps, SessionHandle, SessionOrchestrator, SessionStatus},
    store::JsonStore,
};

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[derive(Default)]
pub struct RecordingView {
    pub dirty: Mutex<bool>,
    sent: Mutex<Vec<ViewCommand>>,
}

impl RecordingView {
    pub fn sent(&self) -> Vec<ViewCommand> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentView for RecordingView {
    async fn has_unsaved_changes(&self) -> Result<bool> {
        Ok(*self.dirty.lock().unwrap())
    }

    async fn save_current(&self) -> Result<()> {
        *self.dirty.lock().unwrap() = false;
        Ok(())
    }

    fn send(&self, command: ViewCommand) {
        self.sent.lock().unwrap().push(command);
    }
}

pub struct ScriptedShell {
    pub choice: Mutex<UnsavedChoice>,
    pub closed: Mutex<usize>,
}

impl Default for ScriptedShell {
    fn default() -> Self {
        Self {
            choice: Mutex::new(UnsavedChoice::Discard),
            closed: Mutex::new(0),
        }
    }
}

#[async_trait]
impl WindowShell for ScriptedShell {
    async fn confirm_unsaved_changes(&self) -> UnsavedChoice {
        *self.choice.lock().unwrap()
    }

    async fn pick_document(&self) -> Option<DocumentReference> {
        None
    }

    fn apply_menu(&self, _menu: &MenuConfig) {}

    fn bring_to_front(&self) {}

    fn close_window(&self) {
        *self.closed.lock().unwrap() += 1;
    }
}

/// Backend that is either unreachable or answers with a fixed verdict.
#[derive(Default)]
pub struct StubBackend {
    pub entitlement: Mutex<Option<EntitlementResponse>>,
    pub usage: Mutex<Vec<(String, u64, NaiveDate)>>,
}

#[async_trait]
impl RemoteService for StubBackend {
    async fn sync_user(&self, _identity: &UserIdentity) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn sync_usage(&self, uid: &str, seconds: u64, date: NaiveDate) -> Result<(), RemoteError> {
        self.usage.lock().unwrap().push((uid.to_string(), seconds, date));
        Ok(())
    }

    async fn get_entitlement(&self, _uid: &str) -> Result<EntitlementResponse, RemoteError> {
        self.entitlement
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RemoteError::Network("unreachable".into()))
    }

    async fn checkout_url(&self, _uid: &str) -> Result<String, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn portal_url(&self, _uid: &str) -> Result<String, RemoteError> {
        Err(RemoteError::NotConfigured)
    }
}

/// A running control loop plus handles on every collaborator.
pub struct TestSession {
    pub dir: TempDir,
    pub clock: Arc<ManualClock>,
    pub view: Arc<RecordingView>,
    pub shell: Arc<ScriptedShell>,
    pub backend: Arc<StubBackend>,
    pub handle: SessionHandle,
    pub task: JoinHandle<()>,
}

impl TestSession {
    pub async fn start(
        config: AppConfig,
        start: DateTime<Local>,
        initial: Option<DocumentReference>,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let view = Arc::new(RecordingView::default());
        let shell = Arc::new(ScriptedShell::default());
        let backend = Arc::new(StubBackend::default());
        let (handle, rx) = session::channel();

        let deps = SessionDeps {
            config,
            store: JsonStore::new(dir.path()).unwrap(),
            clock: clock.clone(),
            remote: backend.clone(),
            view: view.clone(),
            shell: shell.clone(),
        };
        let orchestrator = SessionOrchestrator::launch(deps, initial, handle.clone()).await;
        let task = tokio::spawn(orchestrator.run(rx));

        Self {
            dir,
            clock,
            view,
            shell,
            backend,
            handle,
            task,
        }
    }

    /// Round-trips a status request, so every earlier message is handled.
    pub async fn status(&self) -> SessionStatus {
        self.handle.status().await.unwrap()
    }

    pub fn doc(&self, name: &str) -> DocumentReference {
        DocumentReference::from_path(&self.dir.path().join(name), self.dir.path()).unwrap()
    }
}
