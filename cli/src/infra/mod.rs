//! Infrastructure layer: production implementations of application ports.

pub mod command_runner;
pub mod config;

pub use command_runner::TokioCommandRunner;
pub use config::YamlConfigStore;
