use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};

use crate::launch::DocumentReference;

use super::{MenuConfig, TransitionOutcome, UnsavedChoice, ViewCommand, ViewMode};

/// What the controller needs from the document surface.
#[async_trait]
pub trait DocumentView: Send + Sync {
    async fn has_unsaved_changes(&self) -> Result<bool>;
    async fn save_current(&self) -> Result<()>;
    fn send(&self, command: ViewCommand);
}

/// Window, menu and dialog plumbing owned by the platform shell.
#[async_trait]
pub trait WindowShell: Send + Sync {
    async fn confirm_unsaved_changes(&self) -> UnsavedChoice;
    async fn pick_document(&self) -> Option<DocumentReference>;
    fn apply_menu(&self, menu: &MenuConfig);
    /// Restores a minimized window and focuses it.
    fn bring_to_front(&self);
    fn close_window(&self);
}

/// Owns the view mode of the one window and runs every transition out of
/// `Document` through the guarded-close protocol.
pub struct NavigationController {
    mode: ViewMode,
    current: Option<DocumentReference>,
    view: Arc<dyn DocumentView>,
    shell: Arc<dyn WindowShell>,
    view_timeout: Duration,
}

impl NavigationController {
    pub fn new(
        initial: ViewMode,
        view: Arc<dyn DocumentView>,
        shell: Arc<dyn WindowShell>,
        view_timeout: Duration,
    ) -> Self {
        Self {
            mode: initial,
            current: None,
            view,
            shell,
            view_timeout,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn current_document(&self) -> Option<&DocumentReference> {
        self.current.as_ref()
    }

    pub fn view(&self) -> &Arc<dyn DocumentView> {
        &self.view
    }

    pub fn shell(&self) -> &Arc<dyn WindowShell> {
        &self.shell
    }

    /// Pushes the menu for the current mode to the shell.
    pub fn sync_menu(&self) {
        self.shell.apply_menu(&MenuConfig::for_mode(self.mode));
    }

    /// Hands the startup document to a freshly built window. Only applies
    /// while in `Document` with nothing shown yet.
    pub fn present_initial(&mut self, doc: DocumentReference) -> bool {
        if self.mode != ViewMode::Document || self.current.is_some() {
            return false;
        }
        self.view.send(ViewCommand::OpenDocument(doc.clone()));
        self.current = Some(doc);
        self.sync_menu();
        true
    }

    /// Shows `doc`. Unconditional from `Home`, guarded from `Document`.
    pub async fn open_document(&mut self, doc: DocumentReference) -> TransitionOutcome {
        let from = self.mode;
        if from == ViewMode::Document && !self.guard().await {
            return TransitionOutcome::Cancelled;
        }

        info!("Opening {doc}");
        self.view.send(ViewCommand::OpenDocument(doc.clone()));
        self.current = Some(doc);
        self.commit(from, ViewMode::Document)
    }

    pub async fn go_home(&mut self) -> TransitionOutcome {
        let from = self.mode;
        if from == ViewMode::Home {
            return TransitionOutcome::Committed { from, to: from };
        }
        if !self.guard().await {
            return TransitionOutcome::Cancelled;
        }

        self.view.send(ViewCommand::NavigateHome);
        self.current = None;
        self.commit(from, ViewMode::Home)
    }

    /// Guarded window close. A committed exit leaves the controller in
    /// `Home`, ready for a rebuilt window.
    pub async fn request_exit(&mut self) -> TransitionOutcome {
        let from = self.mode;
        if from == ViewMode::Document && !self.guard().await {
            return TransitionOutcome::Cancelled;
        }

        self.current = None;
        self.commit(from, ViewMode::Home)
    }

    fn commit(&mut self, from: ViewMode, to: ViewMode) -> TransitionOutcome {
        self.mode = to;
        self.sync_menu();
        TransitionOutcome::Committed { from, to }
    }

    /// Returns `true` when the pending transition may proceed.
    async fn guard(&self) -> bool {
        if !self.query_unsaved().await {
            return true;
        }

        match self.shell.confirm_unsaved_changes().await {
            UnsavedChoice::Save => {
                self.save_best_effort().await;
                true
            }
            UnsavedChoice::Discard => true,
            UnsavedChoice::Cancel => {
                info!("Transition cancelled at unsaved-changes prompt");
                false
            }
        }
    }

    async fn query_unsaved(&self) -> bool {
        match tokio::time::timeout(self.view_timeout, self.view.has_unsaved_changes()).await {
            Ok(Ok(dirty)) => dirty,
            Ok(Err(err)) => {
                warn!("Unsaved-changes query failed, assuming clean: {err:#}");
                false
            }
            Err(_) => {
                warn!("Unsaved-changes query timed out, assuming clean");
                false
            }
        }
    }

    async fn save_best_effort(&self) {
        match tokio::time::timeout(self.view_timeout, self.view.save_current()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("Save before navigation failed, continuing: {err:#}"),
            Err(_) => warn!("Save before navigation timed out, continuing"),
        }
    }
}
