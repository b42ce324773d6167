use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use nix::errno::Errno;
use strum::{EnumIter, IntoEnumIterator};
use thiserror::Error;

use crate::state::ShellContext;

pub mod cd;
pub mod exit;

/// What the shell loop should do after a builtin ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStatus {
    Continue,
    Exit(i32),
}

#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("cd: usage: cd <dir>")]
    CdUsage,
    #[error("cd: {path}: {source}")]
    Cd {
        path: String,
        #[source]
        source: Errno,
    },
}

#[async_trait]
#[enum_dispatch(BuiltinCommands)]
pub trait BuiltinCommand {
    fn name(&self) -> &'static str;
    async fn execute(
        &self,
        ctx: &mut ShellContext,
        args: &[String],
    ) -> Result<BuiltinStatus, BuiltinError>;
}

#[enum_dispatch]
#[derive(Debug, EnumIter)]
pub enum BuiltinCommands {
    Cd(cd::Cd),
    Exit(exit::Exit),
}

impl BuiltinCommands {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter().find(|cmd| cmd.name() == name)
    }
}
