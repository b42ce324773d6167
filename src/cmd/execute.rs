use std::ffi::NulError;

use nix::{errno::Errno, unistd::Pid};
use thiserror::Error;
use tokio::task::JoinError;

use super::{parsed_command::ParsedCommand, pipeline::SpawnError};
use crate::{
    builtins::{BuiltinCommand, BuiltinCommands, BuiltinError, BuiltinStatus},
    process::StageStatus,
    state::ShellContext,
};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to create pipe {index}: {source}")]
    Pipe {
        index: usize,
        #[source]
        source: Errno,
    },
    #[error("fork failed for {program}: {source}")]
    Fork {
        program: String,
        #[source]
        source: Errno,
    },
    #[error("argument contains a nul byte: {0}")]
    Nul(#[from] NulError),
    #[error("failed to wait for child {pid}: {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: Errno,
    },
    #[error("reaper task failed: {0}")]
    Join(#[from] JoinError),
    #[error(transparent)]
    Builtin(#[from] BuiltinError),
}

/// The result of running one command line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to run.
    Empty,
    /// A builtin ran in the shell process.
    Builtin,
    /// A foreground pipeline ran to completion.
    Completed(Vec<StageStatus>),
    /// A background pipeline was started; the leader's pid.
    Background(Pid),
    /// The shell should terminate with this status.
    Exit(i32),
}

impl ParsedCommand {
    /// Runs the command: a builtin in-process when the line is a single
    /// builtin stage, otherwise a forked pipeline. Foreground pipelines are
    /// reaped before this returns.
    pub async fn execute(&self, ctx: &mut ShellContext) -> Result<Outcome, ExecError> {
        if self.is_empty() {
            return Ok(Outcome::Empty);
        }

        if let Some(stage) = self.sole_stage() {
            if let Some(builtin) = BuiltinCommands::from_name(stage.program()) {
                debug!(builtin = builtin.name(), "dispatching builtin");
                return match builtin.execute(ctx, stage.args()).await? {
                    BuiltinStatus::Continue => Ok(Outcome::Builtin),
                    BuiltinStatus::Exit(code) => Ok(Outcome::Exit(code)),
                };
            }
        }

        let job = match self.spawn() {
            Ok(job) => job,
            Err(SpawnError { job, source }) => {
                if !self.background && !job.is_empty() {
                    warn!(spawned = job.len(), "reaping partially spawned pipeline");
                    job.wait().await?;
                }
                return Err(source);
            }
        };

        if self.background {
            return Ok(match job.leader() {
                Some(leader) => {
                    debug!(pid = %leader, stages = job.len(), "running in background");
                    Outcome::Background(leader)
                }
                None => Outcome::Empty,
            });
        }

        let statuses = job.wait().await?;
        trace!(?statuses, "pipeline finished");

        Ok(Outcome::Completed(statuses))
    }
}
