//! Hand-written fakes for the view, shell and backend seams.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    launch::DocumentReference,
    models::UserIdentity,
    navigation::{DocumentView, MenuConfig, UnsavedChoice, ViewCommand, WindowShell},
    remote::{EntitlementResponse, RemoteError, RemoteService},
};

pub fn doc(path: &str) -> DocumentReference {
    DocumentReference::from_path(Path::new(path), Path::new("/")).unwrap()
}

#[derive(Default)]
pub struct FakeView {
    pub dirty: AtomicBool,
    pub query_fails: AtomicBool,
    pub hang: AtomicBool,
    pub save_fails: AtomicBool,
    pub queries: AtomicUsize,
    pub save_calls: AtomicUsize,
    sent: Mutex<Vec<ViewCommand>>,
}

impl FakeView {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn dirty() -> Self {
        let view = Self::default();
        view.dirty.store(true, Ordering::SeqCst);
        view
    }

    pub fn sent(&self) -> Vec<ViewCommand> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentView for FakeView {
    async fn has_unsaved_changes(&self) -> Result<bool> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.query_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("view crashed"));
        }
        Ok(self.dirty.load(Ordering::SeqCst))
    }

    async fn save_current(&self) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.save_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full"));
        }
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn send(&self, command: ViewCommand) {
        self.sent.lock().unwrap().push(command);
    }
}

pub struct FakeShell {
    pub choice: Mutex<UnsavedChoice>,
    pub picked: Mutex<Option<DocumentReference>>,
    pub prompts: AtomicUsize,
    pub focused: AtomicUsize,
    pub closed: AtomicUsize,
    menus: Mutex<Vec<MenuConfig>>,
}

impl FakeShell {
    pub fn choosing(choice: UnsavedChoice) -> Self {
        Self {
            choice: Mutex::new(choice),
            picked: Mutex::new(None),
            prompts: AtomicUsize::new(0),
            focused: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            menus: Mutex::new(Vec::new()),
        }
    }

    pub fn last_menu(&self) -> Option<MenuConfig> {
        self.menus.lock().unwrap().last().cloned()
    }

    pub fn menu_count(&self) -> usize {
        self.menus.lock().unwrap().len()
    }
}

#[async_trait]
impl WindowShell for FakeShell {
    async fn confirm_unsaved_changes(&self) -> UnsavedChoice {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        *self.choice.lock().unwrap()
    }

    async fn pick_document(&self) -> Option<DocumentReference> {
        self.picked.lock().unwrap().clone()
    }

    fn apply_menu(&self, menu: &MenuConfig) {
        self.menus.lock().unwrap().push(menu.clone());
    }

    fn bring_to_front(&self) {
        self.focused.fetch_add(1, Ordering::SeqCst);
    }

    fn close_window(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend whose entitlement answer can be changed between calls.
pub struct FakeRemote {
    pub entitlement: Mutex<Result<EntitlementResponse, String>>,
    pub entitlement_calls: AtomicUsize,
    pub user_syncs: Mutex<Vec<UserIdentity>>,
    pub usage_syncs: Mutex<Vec<(String, u64, NaiveDate)>>,
}

impl FakeRemote {
    pub fn offline() -> Self {
        Self {
            entitlement: Mutex::new(Err("offline".into())),
            entitlement_calls: AtomicUsize::new(0),
            user_syncs: Mutex::new(Vec::new()),
            usage_syncs: Mutex::new(Vec::new()),
        }
    }

    pub fn set_entitlement(&self, response: Result<EntitlementResponse, String>) {
        *self.entitlement.lock().unwrap() = response;
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn sync_user(&self, identity: &UserIdentity) -> Result<(), RemoteError> {
        self.user_syncs.lock().unwrap().push(identity.clone());
        Ok(())
    }

    async fn sync_usage(
        &self,
        uid: &str,
        daily_seconds_used: u64,
        date: NaiveDate,
    ) -> Result<(), RemoteError> {
        self.usage_syncs
            .lock()
            .unwrap()
            .push((uid.to_string(), daily_seconds_used, date));
        Ok(())
    }

    async fn get_entitlement(&self, _uid: &str) -> Result<EntitlementResponse, RemoteError> {
        self.entitlement_calls.fetch_add(1, Ordering::SeqCst);
        self.entitlement
            .lock()
            .unwrap()
            .clone()
            .map_err(RemoteError::Network)
    }

    async fn checkout_url(&self, uid: &str) -> Result<String, RemoteError> {
        Ok(format!("https://pay.example.com/checkout?uid={uid}"))
    }

    async fn portal_url(&self, uid: &str) -> Result<String, RemoteError> {
        Ok(format!("https://pay.example.com/portal?uid={uid}"))
    }
}
