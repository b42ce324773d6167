use nix::errno::Errno;

pub mod job;
pub mod status;

pub use job::{Job, StageStatus};
pub use status::ExitStatus;

/// Runs `f` until it stops failing with `EINTR`.
pub(crate) fn syscall<F, T>(f: F) -> nix::Result<T>
where
    F: Fn() -> nix::Result<T>,
{
    loop {
        match f() {
            Err(Errno::EINTR) => continue,
            result => return result,
        }
    }
}
