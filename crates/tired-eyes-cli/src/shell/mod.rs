//! Terminal implementations of the core's shell collaborators.

mod appearance;
mod notifier;
mod terminal;

pub use appearance::{SystemTheme, SystemThemeFlag};
pub use notifier::DesktopNotifier;
pub use terminal::TerminalHost;
