use tauri::{
    menu::{Menu, MenuBuilder, MenuItemBuilder, SubmenuBuilder},
    AppHandle, Manager, Runtime,
};

use crate::{
    config::APP_NAME,
    navigation::{MenuConfig, MenuGroup},
};

const EDIT_MENU: &str = "Edit";

/// One top-level submenu, in display order.
#[derive(Debug, PartialEq, Eq)]
enum Section<'a> {
    /// About/Hide/Quit, owned by the platform.
    App,
    /// Command group; `clipboard` appends Cut/Copy/Paste/Select All.
    Group { group: &'a MenuGroup, clipboard: bool },
    /// Bare Edit menu so the webview keeps its clipboard shortcuts.
    Clipboard,
}

/// macOS menus belong to the app and must always carry the app submenu and
/// the standard edit items; elsewhere only the command groups are shown.
fn layout(config: &MenuConfig, app_menu: bool) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    if app_menu {
        sections.push(Section::App);
    }
    for group in &config.groups {
        sections.push(Section::Group {
            group,
            clipboard: app_menu && group.title == EDIT_MENU,
        });
    }
    if app_menu && !config.groups.iter().any(|g| g.title == EDIT_MENU) {
        sections.push(Section::Clipboard);
    }
    sections
}

fn with_clipboard<'m, R: Runtime, M: Manager<R>>(
    submenu: SubmenuBuilder<'m, R, M>,
) -> SubmenuBuilder<'m, R, M> {
    submenu.cut().copy().paste().select_all()
}

fn build<R: Runtime>(app: &AppHandle<R>, config: &MenuConfig) -> tauri::Result<Menu<R>> {
    let mut menu = MenuBuilder::new(app);
    for section in layout(config, cfg!(target_os = "macos")) {
        let submenu = match section {
            Section::App => SubmenuBuilder::new(app, APP_NAME)
                .about(None)
                .separator()
                .services()
                .separator()
                .hide()
                .hide_others()
                .show_all()
                .separator()
                .quit()
                .build()?,
            Section::Group { group, clipboard } => {
                let mut submenu = SubmenuBuilder::new(app, group.title);
                for command in &group.items {
                    let mut item = MenuItemBuilder::with_id(command.id(), command.label());
                    if let Some(accelerator) = command.accelerator() {
                        item = item.accelerator(accelerator);
                    }
                    submenu = submenu.item(&item.build(app)?);
                }
                if clipboard {
                    submenu = with_clipboard(submenu.separator());
                }
                submenu.build()?
            }
            Section::Clipboard => with_clipboard(SubmenuBuilder::new(app, EDIT_MENU)).build()?,
        };
        menu = menu.item(&submenu);
    }
    menu.build()
}

/// Installs the menu for the current view mode. macOS menus belong to the
/// app; elsewhere they hang off the window and hide with it.
pub fn apply<R: Runtime>(app: &AppHandle<R>, config: &MenuConfig) -> tauri::Result<()> {
    let menu = build(app, config)?;

    #[cfg(target_os = "macos")]
    {
        app.set_menu(menu)?;
    }

    #[cfg(not(target_os = "macos"))]
    {
        let Some(window) = app.get_webview_window(super::MAIN_WINDOW) else {
            return Ok(());
        };
        if config.show_menu_bar {
            window.set_menu(menu)?;
        } else {
            window.remove_menu()?;
        }
    }

    Ok(())
}
