pub mod commands;
pub mod output;
pub mod runtime;

pub use commands::{cmd_locate, cmd_match, cmd_profiles, cmd_watch, LocateArgs, MatchArgs, ProfilesArgs, WatchArgs};
pub use output::OutputFormat;
pub use runtime::{init_logging, load_config, open_catalog};
