pub mod commands;
pub mod dashboard;
pub mod handlers;

pub use commands::Cli;
