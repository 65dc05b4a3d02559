use serde::{Deserialize, Serialize};

use crate::launch::DocumentReference;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    Home,
    Document,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum MenuCommand {
    Open,
    Save,
    SaveAs,
    Print,
    Home,
    Undo,
    Redo,
}

impl MenuCommand {
    pub const ALL: [MenuCommand; 7] = [
        MenuCommand::Open,
        MenuCommand::Save,
        MenuCommand::SaveAs,
        MenuCommand::Print,
        MenuCommand::Home,
        MenuCommand::Undo,
        MenuCommand::Redo,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            MenuCommand::Open => "open",
            MenuCommand::Save => "save",
            MenuCommand::SaveAs => "save-as",
            MenuCommand::Print => "print",
            MenuCommand::Home => "home",
            MenuCommand::Undo => "undo",
            MenuCommand::Redo => "redo",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.id() == id)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuCommand::Open => "Open…",
            MenuCommand::Save => "Save",
            MenuCommand::SaveAs => "Save As…",
            MenuCommand::Print => "Print…",
            MenuCommand::Home => "Back to Home",
            MenuCommand::Undo => "Undo",
            MenuCommand::Redo => "Redo",
        }
    }

    pub fn accelerator(&self) -> Option<&'static str> {
        match self {
            MenuCommand::Open => Some("CmdOrCtrl+O"),
            MenuCommand::Save => Some("CmdOrCtrl+S"),
            MenuCommand::SaveAs => Some("CmdOrCtrl+Shift+S"),
            MenuCommand::Print => Some("CmdOrCtrl+P"),
            MenuCommand::Home => None,
            MenuCommand::Undo => Some("CmdOrCtrl+Z"),
            MenuCommand::Redo => Some("CmdOrCtrl+Shift+Z"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuGroup {
    pub title: &'static str,
    pub items: Vec<MenuCommand>,
}

/// Process-wide command menu, derived from the view mode alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuConfig {
    pub show_menu_bar: bool,
    pub groups: Vec<MenuGroup>,
}

impl MenuConfig {
    pub fn for_mode(mode: ViewMode) -> Self {
        match mode {
            ViewMode::Home => Self {
                show_menu_bar: false,
                groups: Vec::new(),
            },
            ViewMode::Document => Self {
                show_menu_bar: true,
                groups: vec![
                    MenuGroup {
                        title: "File",
                        items: vec![
                            MenuCommand::Open,
                            MenuCommand::Save,
                            MenuCommand::SaveAs,
                            MenuCommand::Print,
                            MenuCommand::Home,
                        ],
                    },
                    MenuGroup {
                        title: "Edit",
                        items: vec![MenuCommand::Undo, MenuCommand::Redo],
                    },
                ],
            },
        }
    }

    pub fn contains(&self, command: MenuCommand) -> bool {
        self.groups.iter().any(|group| group.items.contains(&command))
    }
}

/// One-way notifications from the controller to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    OpenDocument(DocumentReference),
    Save,
    SaveAs,
    Print,
    Undo,
    Redo,
    NavigateHome,
    TrialExpired,
}

impl ViewCommand {
    pub fn event_name(&self) -> &'static str {
        match self {
            ViewCommand::OpenDocument(_) => "open-pdf",
            ViewCommand::Save => "save-pdf",
            ViewCommand::SaveAs => "save-as-pdf",
            ViewCommand::Print => "print-pdf",
            ViewCommand::Undo => "menu-undo",
            ViewCommand::Redo => "menu-redo",
            ViewCommand::NavigateHome => "navigate-home",
            ViewCommand::TrialExpired => "trial-expired",
        }
    }

    /// Menu entries that are plain forwards to the view.
    pub fn from_menu(command: MenuCommand) -> Option<Self> {
        match command {
            MenuCommand::Save => Some(ViewCommand::Save),
            MenuCommand::SaveAs => Some(ViewCommand::SaveAs),
            MenuCommand::Print => Some(ViewCommand::Print),
            MenuCommand::Undo => Some(ViewCommand::Undo),
            MenuCommand::Redo => Some(ViewCommand::Redo),
            MenuCommand::Open | MenuCommand::Home => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsavedChoice {
    Save,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Committed { from: ViewMode, to: ViewMode },
    Cancelled,
}

impl TransitionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, TransitionOutcome::Committed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_menu_is_hidden_and_empty() {
        let menu = MenuConfig::for_mode(ViewMode::Home);
        assert!(!menu.show_menu_bar);
        assert!(MenuCommand::ALL.iter().all(|cmd| !menu.contains(*cmd)));
    }

    #[test]
    fn document_menu_exposes_editing_commands() {
        let menu = MenuConfig::for_mode(ViewMode::Document);
        assert!(menu.show_menu_bar);
        for cmd in [
            MenuCommand::Open,
            MenuCommand::Save,
            MenuCommand::SaveAs,
            MenuCommand::Print,
            MenuCommand::Undo,
            MenuCommand::Redo,
        ] {
            assert!(menu.contains(cmd), "{cmd:?} missing");
        }
    }

    #[test]
    fn document_menu_groups_file_then_edit() {
        let menu = MenuConfig::for_mode(ViewMode::Document);
        let titles: Vec<_> = menu.groups.iter().map(|g| g.title).collect();
        assert_eq!(titles, ["File", "Edit"]);
        assert_eq!(menu.groups[1].items, [MenuCommand::Undo, MenuCommand::Redo]);
        assert!(MenuConfig::for_mode(ViewMode::Home).groups.is_empty());
    }

    #[test]
    fn menu_ids_round_trip() {
        for cmd in MenuCommand::ALL {
            assert_eq!(MenuCommand::from_id(cmd.id()), Some(cmd));
        }
        assert_eq!(MenuCommand::from_id("quit"), None);
    }
}
