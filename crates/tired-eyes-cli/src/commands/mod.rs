pub mod config;
pub mod notify;
pub mod run;
pub mod theme;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;
