#[macro_use]
extern crate tracing;

pub mod builtins;
pub mod cmd;
pub mod config;
pub mod input;
pub mod parse;
pub mod prelude;
pub mod process;
pub mod state;

pub use cmd::{
    execute::{ExecError, Outcome},
    parsed_command::{ParsedCommand, Stage},
};
pub use parse::{parse_command, parse_tokens, CommandParseError};
pub use state::ShellContext;
