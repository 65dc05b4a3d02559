pub mod controller;
pub mod state;

pub use controller::{DocumentView, NavigationController, WindowShell};
pub use state::{
    MenuCommand, MenuConfig, MenuGroup, TransitionOutcome, UnsavedChoice, ViewCommand, ViewMode,
};
