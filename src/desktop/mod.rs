//! Tauri shell: the one main window, native menu and dialogs, and the
//! command surface the webview talks to.

mod bridge;
mod commands;
mod menu;

use std::sync::Arc;

use log::{error, info, warn};
use tauri::{AppHandle, Manager, RunEvent, WebviewUrl, WebviewWindowBuilder, WindowEvent};
use tokio_util::sync::CancellationToken;

use crate::{
    bridge::ReplyRegistry,
    clock::SystemClock,
    config::{self, AppConfig, APP_NAME},
    identity::IdentityStore,
    instance::{self, ForwardedLaunch, InstanceEndpoint, InstanceRole},
    navigation::MenuCommand,
    remote::{HttpBackend, RemoteService},
    session::{self, SessionDeps, SessionHandle, SessionMessage, SessionOrchestrator},
    store::JsonStore,
    utils::logging,
};

use bridge::{NativeShell, WebviewBridge};
use commands::{
    get_app_version, get_session_status, navigate_home, open_checkout, open_document,
    open_external, open_portal, report_save_settled, report_unsaved_state, select_pdf, sign_in,
    sign_out, view_ready,
};

pub(crate) const MAIN_WINDOW: &str = "main";

pub(crate) struct DesktopState {
    session: SessionHandle,
    shell: Arc<NativeShell>,
    unsaved: Arc<ReplyRegistry<bool>>,
    saves: Arc<ReplyRegistry<bool>>,
    identity: IdentityStore,
    remote: Arc<dyn RemoteService>,
}

fn build_main_window(app: &AppHandle, session: &SessionHandle) -> tauri::Result<()> {
    let window = WebviewWindowBuilder::new(app, MAIN_WINDOW, WebviewUrl::App("index.html".into()))
        .title(APP_NAME)
        .inner_size(1200.0, 820.0)
        .min_inner_size(720.0, 480.0)
        .build()?;

    let session = session.clone();
    window.on_window_event(move |event| {
        if let WindowEvent::CloseRequested { api, .. } = event {
            // The session decides after the unsaved-changes check.
            api.prevent_close();
            session.post(SessionMessage::CloseRequested);
        }
    });
    Ok(())
}

fn post(app: &AppHandle, message: SessionMessage) {
    match app.try_state::<DesktopState>() {
        Some(state) => {
            state.session.post(message);
        }
        None => warn!("Session not ready; dropping {message:?}"),
    }
}

pub fn run() {
    let data_dir = match config::data_dir() {
        Ok(dir) => dir,
        Err(err) => {
            logging::init(false);
            error!("Cannot prepare the data directory: {err:#}");
            return;
        }
    };
    let config = AppConfig::load(&data_dir);
    logging::init(config.debug);

    info!("Eclipse PDF starting up...");

    let launch = ForwardedLaunch::current();
    let endpoint = InstanceEndpoint::in_dir(&data_dir);
    let primary = match tauri::async_runtime::block_on(instance::acquire(&endpoint, &launch)) {
        Ok(InstanceRole::Primary(primary)) => Some(primary),
        Ok(InstanceRole::Secondary) => {
            info!("Launch handed to the running instance; exiting");
            return;
        }
        Err(err) => {
            warn!("Single-instance check failed, running unguarded: {err:#}");
            None
        }
    };

    let store = match JsonStore::new(&data_dir) {
        Ok(store) => store,
        Err(err) => {
            error!("Cannot open the data store: {err:#}");
            return;
        }
    };
    let remote: Arc<dyn RemoteService> =
        match HttpBackend::new(config.backend_url.as_deref(), config.remote_timeout()) {
            Ok(backend) => Arc::new(backend),
            Err(err) => {
                error!("Cannot build the backend client: {err:#}");
                return;
            }
        };

    let initial = launch.document();
    let (session, rx) = session::channel();
    let cancel = CancellationToken::new();
    let exit_cancel = cancel.clone();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(move |app| {
            let handle = app.handle().clone();
            let unsaved = Arc::new(ReplyRegistry::new());
            let saves = Arc::new(ReplyRegistry::new());
            let shell = Arc::new(NativeShell::new(handle.clone()));
            let view = Arc::new(WebviewBridge::new(
                handle.clone(),
                unsaved.clone(),
                saves.clone(),
                config.view_timeout(),
            ));

            app.manage(DesktopState {
                session: session.clone(),
                shell: shell.clone(),
                unsaved,
                saves,
                identity: IdentityStore::new(store.clone()),
                remote: remote.clone(),
            });

            if let Some(primary) = primary {
                let forwarded = session.clone();
                tauri::async_runtime::spawn(async move {
                    let listener = primary.listen(
                        move |launch| {
                            forwarded.post(SessionMessage::SecondInstance(launch));
                        },
                        cancel,
                    );
                    let _ = listener.await;
                });
            }

            let deps = SessionDeps {
                config,
                store,
                clock: Arc::new(SystemClock),
                remote,
                view,
                shell,
            };
            let loop_handle = session.clone();
            tauri::async_runtime::spawn(async move {
                SessionOrchestrator::launch(deps, initial, loop_handle)
                    .await
                    .run(rx)
                    .await;
            });

            build_main_window(&handle, &session)?;
            Ok(())
        })
        .on_menu_event(|app, event| {
            if let Some(command) = MenuCommand::from_id(event.id().as_ref()) {
                post(app, SessionMessage::Menu(command));
            }
        })
        .invoke_handler(tauri::generate_handler![
            view_ready,
            select_pdf,
            open_document,
            navigate_home,
            report_unsaved_state,
            report_save_settled,
            get_session_status,
            sign_in,
            sign_out,
            open_checkout,
            open_portal,
            open_external,
            get_app_version,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(move |app, event| match event {
        // Closing the last window keeps the app resident on macOS only.
        RunEvent::ExitRequested { code: None, api, .. } if cfg!(target_os = "macos") => {
            api.prevent_exit();
        }
        RunEvent::Exit => {
            post(app, SessionMessage::Shutdown);
            exit_cancel.cancel();
        }
        #[cfg(target_os = "macos")]
        RunEvent::Reopen {
            has_visible_windows: false,
            ..
        } => {
            if app.get_webview_window(MAIN_WINDOW).is_some() {
                return;
            }
            if let Some(state) = app.try_state::<DesktopState>() {
                if let Err(err) = build_main_window(app, &state.session) {
                    error!("Failed to rebuild the main window: {err}");
                }
            }
        }
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        RunEvent::Opened { urls } => {
            let base = std::env::current_dir().unwrap_or_default();
            for url in urls {
                match crate::launch::DocumentReference::parse(url.as_str(), &base) {
                    Some(doc) => post(app, SessionMessage::OpenRequested(doc)),
                    None => warn!("Ignoring open request for {url}"),
                }
            }
        }
        _ => {}
    });
}
