use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;

use crate::{
    launch::DocumentReference,
    models::UserIdentity,
    session::{SessionMessage, SessionStatus},
};

use super::DesktopState;

fn post(state: &State<'_, DesktopState>, message: SessionMessage) -> Result<(), String> {
    if state.session.post(message) {
        Ok(())
    } else {
        Err("session has stopped".to_string())
    }
}

fn signed_in_uid(state: &State<'_, DesktopState>) -> Result<String, String> {
    state
        .identity
        .load()
        .map(|identity| identity.uid)
        .ok_or_else(|| "not signed in".to_string())
}

fn open_in_browser(app: &AppHandle, url: &str) -> Result<(), String> {
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| e.to_string())
}

/// Called by the view once its listeners are installed.
#[tauri::command]
pub fn view_ready(state: State<'_, DesktopState>) -> Result<(), String> {
    post(&state, SessionMessage::WindowReady)
}

#[tauri::command]
pub async fn select_pdf(state: State<'_, DesktopState>) -> Result<Option<String>, String> {
    Ok(state
        .shell
        .pick_document()
        .await
        .map(|doc| doc.as_str().to_string()))
}

#[tauri::command]
pub fn open_document(state: State<'_, DesktopState>, uri: String) -> Result<(), String> {
    let base = std::env::current_dir().unwrap_or_default();
    let doc = DocumentReference::parse(&uri, &base).ok_or_else(|| format!("not a document: {uri}"))?;
    post(&state, SessionMessage::OpenRequested(doc))
}

#[tauri::command]
pub fn navigate_home(state: State<'_, DesktopState>) -> Result<(), String> {
    post(&state, SessionMessage::NavigateHome)
}

#[tauri::command]
pub fn report_unsaved_state(
    state: State<'_, DesktopState>,
    request_id: String,
    dirty: bool,
) -> Result<(), String> {
    state.unsaved.resolve(&request_id, dirty);
    Ok(())
}

#[tauri::command]
pub fn report_save_settled(
    state: State<'_, DesktopState>,
    request_id: String,
    ok: bool,
) -> Result<(), String> {
    state.saves.resolve(&request_id, ok);
    Ok(())
}

#[tauri::command]
pub async fn get_session_status(state: State<'_, DesktopState>) -> Result<SessionStatus, String> {
    state
        .session
        .status()
        .await
        .ok_or_else(|| "session has stopped".to_string())
}

#[tauri::command]
pub fn sign_in(
    state: State<'_, DesktopState>,
    uid: String,
    email: Option<String>,
    display_name: Option<String>,
) -> Result<(), String> {
    if uid.trim().is_empty() {
        return Err("uid must not be empty".to_string());
    }
    post(
        &state,
        SessionMessage::SignedIn(UserIdentity {
            uid,
            email: email.unwrap_or_default(),
            display_name: display_name.unwrap_or_default(),
        }),
    )
}

#[tauri::command]
pub fn sign_out(state: State<'_, DesktopState>) -> Result<(), String> {
    post(&state, SessionMessage::SignedOut)
}

#[tauri::command]
pub async fn open_checkout(app: AppHandle, state: State<'_, DesktopState>) -> Result<(), String> {
    let uid = signed_in_uid(&state)?;
    let url = state
        .remote
        .checkout_url(&uid)
        .await
        .map_err(|e| e.to_string())?;
    open_in_browser(&app, &url)
}

#[tauri::command]
pub async fn open_portal(app: AppHandle, state: State<'_, DesktopState>) -> Result<(), String> {
    let uid = signed_in_uid(&state)?;
    let url = state
        .remote
        .portal_url(&uid)
        .await
        .map_err(|e| e.to_string())?;
    open_in_browser(&app, &url)
}

#[tauri::command]
pub fn open_external(app: AppHandle, url: String) -> Result<(), String> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(format!("refusing to open non-web url: {url}"));
    }
    open_in_browser(&app, &url)
}

#[tauri::command]
pub fn get_app_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}
