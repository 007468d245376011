pub mod cli;
pub mod model;

pub use cli::{build_cli_command, Cli, Commands, OutputFormat};
pub use model::{load_config, Model};
