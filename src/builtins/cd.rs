use async_trait::async_trait;

use crate::state::ShellContext;

use super::{BuiltinCommand, BuiltinError, BuiltinStatus};

#[derive(Debug, Default)]
pub struct Cd;

#[async_trait]
impl BuiltinCommand for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }

    async fn execute(
        &self,
        ctx: &mut ShellContext,
        args: &[String],
    ) -> Result<BuiltinStatus, BuiltinError> {
        trace!("executing cd builtin: {args:?}");

        let path = args.first().ok_or(BuiltinError::CdUsage)?;

        ctx.change_dir(path).map_err(|source| BuiltinError::Cd {
            path: path.clone(),
            source,
        })?;

        trace!(working_dir = ?ctx.working_dir(), "cd");

        Ok(BuiltinStatus::Continue)
    }
}
