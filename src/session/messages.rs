use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::{
    entitlement::Entitlement,
    instance::ForwardedLaunch,
    launch::DocumentReference,
    models::UserIdentity,
    navigation::{MenuCommand, ViewMode},
};

/// Everything the control loop reacts to. Messages are handled one at a
/// time, in arrival order.
#[derive(Debug)]
pub enum SessionMessage {
    /// The window finished building and the view can take events.
    WindowReady,
    /// Picker result or platform "open with".
    OpenRequested(DocumentReference),
    /// Raw arguments forwarded by a secondary process.
    SecondInstance(ForwardedLaunch),
    Menu(MenuCommand),
    NavigateHome,
    CloseRequested,
    Tick,
    SignedIn(UserIdentity),
    SignedOut,
    Status(oneshot::Sender<SessionStatus>),
    Shutdown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub mode: ViewMode,
    pub document: Option<DocumentReference>,
    pub entitlement: Entitlement,
    pub daily_seconds_used: u64,
    pub signed_in: bool,
}

/// Cloneable sender side of the control loop.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl SessionHandle {
    /// Returns `false` once the control loop has stopped.
    pub fn post(&self, message: SessionMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    pub async fn status(&self) -> Option<SessionStatus> {
        let (tx, rx) = oneshot::channel();
        if !self.post(SessionMessage::Status(tx)) {
            return None;
        }
        rx.await.ok()
    }
}

pub fn channel() -> (SessionHandle, mpsc::UnboundedReceiver<SessionMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SessionHandle { tx }, rx)
}
