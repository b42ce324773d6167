use nix::{errno::Errno, sys::wait::waitpid, unistd::Pid};

use super::{status::ExitStatus, syscall};
use crate::cmd::execute::ExecError;

/// A forked pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildProcess {
    pub pid: Pid,
    pub program: String,
}

/// The children of one pipeline, in stage order.
#[derive(Debug, Default)]
pub struct Job {
    children: Vec<ChildProcess>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStatus {
    pub child: ChildProcess,
    /// `None` when the child had already been collected elsewhere.
    pub status: Option<ExitStatus>,
}

impl Job {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pid: Pid, program: impl Into<String>) {
        self.children.push(ChildProcess {
            pid,
            program: program.into(),
        });
    }

    /// The first stage's process, reported for background jobs.
    pub fn leader(&self) -> Option<Pid> {
        self.children.first().map(|child| child.pid)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Blocks until every child of the job has terminated.
    ///
    /// Each pid is waited on individually so that unrelated children (earlier
    /// background jobs) are left alone. A failed wait does not stop the
    /// remaining children from being reaped; the first error is returned once
    /// all of them have been visited.
    pub fn wait_blocking(self) -> Result<Vec<StageStatus>, ExecError> {
        let mut statuses = Vec::with_capacity(self.children.len());
        let mut first_error = None;

        for child in self.children {
            match wait_for_exit(child.pid) {
                Ok(status) => {
                    trace!(pid = %child.pid, program = %child.program, ?status, "reaped child");
                    statuses.push(StageStatus { child, status });
                }
                Err(source) => {
                    error!(pid = %child.pid, %source, "failed to wait for child");
                    if first_error.is_none() {
                        first_error = Some(ExecError::Wait {
                            pid: child.pid,
                            source,
                        });
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(statuses),
        }
    }

    /// Reaps the job on the blocking pool so the runtime stays responsive.
    pub async fn wait(self) -> Result<Vec<StageStatus>, ExecError> {
        tokio::task::spawn_blocking(move || self.wait_blocking()).await?
    }
}

fn wait_for_exit(pid: Pid) -> nix::Result<Option<ExitStatus>> {
    loop {
        match syscall(|| waitpid(pid, None)) {
            Ok(status) => {
                if let Some(status) = ExitStatus::from_wait(status) {
                    return Ok(Some(status));
                }
            }
            Err(Errno::ECHILD) => return Ok(None),
            Err(err) => return Err(err),
        }
    }
}
