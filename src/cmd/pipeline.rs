use std::{
    convert::Infallible,
    ffi::CString,
    fs::{File, OpenOptions},
    io,
    os::unix::{
        fs::OpenOptionsExt,
        io::{AsRawFd, FromRawFd, OwnedFd, RawFd},
    },
    path::{Path, PathBuf},
};

use nix::{
    errno::Errno,
    fcntl::OFlag,
    libc,
    sys::signal::{signal, SigHandler, Signal},
    unistd::{dup2, execvp, fork, pipe2, write, ForkResult},
};
use thiserror::Error;

use super::{execute::ExecError, parsed_command::ParsedCommand};
use crate::process::{syscall, Job};

/// Permissions for files created by output redirection.
const OUTPUT_FILE_MODE: u32 = 0o644;

/// An anonymous pipe connecting stage `i` to stage `i + 1`.
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

impl Pipe {
    pub fn new() -> nix::Result<Self> {
        let (read, write) = pipe2(OFlag::O_CLOEXEC)?;
        // SAFETY: pipe2 just opened both descriptors and nothing else owns them.
        Ok(unsafe {
            Self {
                read: OwnedFd::from_raw_fd(read),
                write: OwnedFd::from_raw_fd(write),
            }
        })
    }
}

/// Allocates the `stages - 1` pipes of a pipeline up front. If any allocation
/// fails the pipes created so far are closed on return.
pub fn allocate_pipes(stages: usize) -> Result<Vec<Pipe>, ExecError> {
    (0..stages.saturating_sub(1))
        .map(|index| Pipe::new().map_err(|source| ExecError::Pipe { index, source }))
        .collect()
}

/// Spawning stopped part way through. `job` holds the stages that were forked
/// before the failure and still have to be reaped.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct SpawnError {
    pub job: Job,
    #[source]
    pub source: ExecError,
}

impl From<ExecError> for SpawnError {
    fn from(source: ExecError) -> Self {
        Self {
            job: Job::new(),
            source,
        }
    }
}

/// Failures inside a forked child, before or during `exec`. These are only
/// ever reported by the child itself.
#[derive(Debug, Error)]
pub enum ChildError {
    #[error("{}: {source}", path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to redirect standard stream: {0}")]
    Dup(#[source] Errno),
    #[error("failed to restore default SIGPIPE action: {0}")]
    Signal(#[source] Errno),
    #[error("{program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: Errno,
    },
}

impl ChildError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exec { .. } => 127,
            Self::Redirect { .. } | Self::Dup(_) | Self::Signal(_) => 1,
        }
    }
}

/// Where a stage's standard streams come from and go to.
struct StageIo<'a> {
    index: usize,
    count: usize,
    input_file: Option<&'a Path>,
    output_file: Option<&'a Path>,
}

impl ParsedCommand {
    /// Forks one process per stage, wired together with pipes and the line's
    /// redirections. Returns without waiting for any of them.
    pub fn spawn(&self) -> Result<Job, SpawnError> {
        let count = self.stages.len();

        let argvs = self
            .stages
            .iter()
            .map(|stage| stage.to_c_argv())
            .collect::<Result<Vec<_>, _>>()
            .map_err(ExecError::from)?;

        let pipes = allocate_pipes(count)?;
        trace!(stages = count, pipes = pipes.len(), "allocated pipes");

        let mut job = Job::new();

        for (index, (stage, argv)) in self.stages.iter().zip(&argvs).enumerate() {
            // SAFETY: the child only rewires descriptors and execs, or exits.
            match unsafe { fork() } {
                Ok(ForkResult::Parent { child }) => {
                    debug!(pid = %child, index, %stage, "spawned stage");
                    job.push(child, stage.program());
                }
                Ok(ForkResult::Child) => {
                    let io = StageIo {
                        index,
                        count,
                        input_file: self.input_file.as_deref(),
                        output_file: self.output_file.as_deref(),
                    };
                    run_child(&io, argv, pipes);
                }
                Err(source) => {
                    error!(index, %stage, %source, "fork failed");
                    drop(pipes);
                    return Err(SpawnError {
                        job,
                        source: ExecError::Fork {
                            program: stage.program().to_owned(),
                            source,
                        },
                    });
                }
            }
        }

        // every pipe end now lives in the children that use it
        drop(pipes);

        Ok(job)
    }
}

fn run_child(io: &StageIo<'_>, argv: &[CString], pipes: Vec<Pipe>) -> ! {
    let err = match exec_stage(io, argv, pipes) {
        Ok(never) => match never {},
        Err(err) => err,
    };

    let message = format!("pipesh: {err}\n");
    let _ = write(libc::STDERR_FILENO, message.as_bytes());

    // SAFETY: _exit skips atexit handlers and buffered output owned by the shell.
    unsafe { libc::_exit(err.exit_code()) }
}

fn exec_stage(
    io: &StageIo<'_>,
    argv: &[CString],
    pipes: Vec<Pipe>,
) -> Result<Infallible, ChildError> {
    if io.index > 0 {
        redirect(pipes[io.index - 1].read.as_raw_fd(), libc::STDIN_FILENO)?;
    }
    if io.index + 1 < io.count {
        redirect(pipes[io.index].write.as_raw_fd(), libc::STDOUT_FILENO)?;
    }

    if io.index == 0 {
        if let Some(path) = io.input_file {
            let file = File::open(path).map_err(|source| ChildError::Redirect {
                path: path.to_owned(),
                source,
            })?;
            redirect(file.as_raw_fd(), libc::STDIN_FILENO)?;
        }
    }
    if io.index + 1 == io.count {
        if let Some(path) = io.output_file {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(OUTPUT_FILE_MODE)
                .open(path)
                .map_err(|source| ChildError::Redirect {
                    path: path.to_owned(),
                    source,
                })?;
            redirect(file.as_raw_fd(), libc::STDOUT_FILENO)?;
        }
    }

    drop(pipes);

    // the runtime ignores SIGPIPE and an ignored disposition survives exec
    // SAFETY: restoring the default action installs no handler code.
    unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) }.map_err(ChildError::Signal)?;

    execvp(&argv[0], argv).map_err(|source| ChildError::Exec {
        program: argv[0].to_string_lossy().into_owned(),
        source,
    })
}

fn redirect(from: RawFd, to: RawFd) -> Result<(), ChildError> {
    syscall(|| dup2(from, to)).map(drop).map_err(ChildError::Dup)
}
