use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use tauri::{AppHandle, Emitter, Manager};
use tauri_plugin_dialog::{
    DialogExt, MessageDialogButtons, MessageDialogKind, MessageDialogResult,
};
use tokio::sync::oneshot;

use crate::{
    bridge::ReplyRegistry,
    config::APP_NAME,
    launch::{DocumentReference, DOCUMENT_EXTENSION},
    navigation::{DocumentView, MenuConfig, UnsavedChoice, ViewCommand, WindowShell},
};

use super::{menu, MAIN_WINDOW};

const QUERY_UNSAVED_EVENT: &str = "query-unsaved";
const SAVE_CURRENT_EVENT: &str = "save-current";

const SAVE_LABEL: &str = "Save";
const DISCARD_LABEL: &str = "Don't Save";
const CANCEL_LABEL: &str = "Cancel";

/// The webview, reached through events and answered through commands.
pub struct WebviewBridge {
    app: AppHandle,
    unsaved: Arc<ReplyRegistry<bool>>,
    saves: Arc<ReplyRegistry<bool>>,
    timeout: Duration,
}

impl WebviewBridge {
    pub fn new(
        app: AppHandle,
        unsaved: Arc<ReplyRegistry<bool>>,
        saves: Arc<ReplyRegistry<bool>>,
        timeout: Duration,
    ) -> Self {
        Self {
            app,
            unsaved,
            saves,
            timeout,
        }
    }

    async fn ask(&self, registry: &ReplyRegistry<bool>, event: &str) -> Result<Option<bool>> {
        let (id, rx) = registry.issue();
        if let Err(err) = self.app.emit_to(MAIN_WINDOW, event, &id) {
            registry.resolve(&id, false);
            return Err(anyhow!("failed to emit {event}: {err}"));
        }
        Ok(registry.wait(&id, rx, self.timeout).await)
    }
}

#[async_trait]
impl DocumentView for WebviewBridge {
    async fn has_unsaved_changes(&self) -> Result<bool> {
        self.ask(&self.unsaved, QUERY_UNSAVED_EVENT)
            .await?
            .ok_or_else(|| anyhow!("view did not report its unsaved state"))
    }

    async fn save_current(&self) -> Result<()> {
        match self.ask(&self.saves, SAVE_CURRENT_EVENT).await? {
            Some(true) => Ok(()),
            Some(false) => Err(anyhow!("view reported a failed save")),
            None => Err(anyhow!("view did not confirm the save")),
        }
    }

    fn send(&self, command: ViewCommand) {
        let event = command.event_name();
        let emitted = match &command {
            ViewCommand::OpenDocument(doc) => {
                self.app.emit_to(MAIN_WINDOW, event, doc.as_str().to_string())
            }
            ViewCommand::TrialExpired => self.app.emit_to(MAIN_WINDOW, event, 0u64),
            _ => self.app.emit_to(MAIN_WINDOW, event, ()),
        };
        match emitted {
            Ok(()) => debug!("Sent {event} to the view"),
            Err(err) => warn!("Failed to send {event} to the view: {err}"),
        }
    }
}

/// Native window, menu and dialog handling for the main window.
pub struct NativeShell {
    app: AppHandle,
}

impl NativeShell {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

#[async_trait]
impl WindowShell for NativeShell {
    async fn confirm_unsaved_changes(&self) -> UnsavedChoice {
        let (tx, rx) = oneshot::channel();
        self.app
            .dialog()
            .message("Do you want to save the changes you made to this document?")
            .title(APP_NAME)
            .kind(MessageDialogKind::Warning)
            .buttons(MessageDialogButtons::YesNoCancelCustom(
                SAVE_LABEL.to_string(),
                DISCARD_LABEL.to_string(),
                CANCEL_LABEL.to_string(),
            ))
            .show_with_result(move |result| {
                let _ = tx.send(result);
            });

        match rx.await {
            Ok(MessageDialogResult::Yes) => UnsavedChoice::Save,
            Ok(MessageDialogResult::No) => UnsavedChoice::Discard,
            Ok(MessageDialogResult::Custom(label)) if label == SAVE_LABEL => UnsavedChoice::Save,
            Ok(MessageDialogResult::Custom(label)) if label == DISCARD_LABEL => {
                UnsavedChoice::Discard
            }
            _ => UnsavedChoice::Cancel,
        }
    }

    async fn pick_document(&self) -> Option<DocumentReference> {
        let (tx, rx) = oneshot::channel();
        self.app
            .dialog()
            .file()
            .add_filter("PDF Documents", &[DOCUMENT_EXTENSION])
            .pick_file(move |picked| {
                let _ = tx.send(picked);
            });

        let path = rx.await.ok()??.into_path().ok()?;
        let base = std::env::current_dir().unwrap_or_default();
        DocumentReference::from_path(&path, &base)
    }

    fn apply_menu(&self, config: &MenuConfig) {
        if let Err(err) = menu::apply(&self.app, config) {
            warn!("Failed to update the menu: {err}");
        }
    }

    fn bring_to_front(&self) {
        let Some(window) = self.app.get_webview_window(MAIN_WINDOW) else {
            return;
        };
        let _ = window.unminimize();
        let _ = window.show();
        let _ = window.set_focus();
    }

    fn close_window(&self) {
        if let Some(window) = self.app.get_webview_window(MAIN_WINDOW) {
            if let Err(err) = window.destroy() {
                warn!("Failed to close the main window: {err}");
            }
        }
    }
}
