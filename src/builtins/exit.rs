use async_trait::async_trait;

use crate::state::ShellContext;

use super::{BuiltinCommand, BuiltinError, BuiltinStatus};

#[derive(Debug, Default)]
pub struct Exit;

#[async_trait]
impl BuiltinCommand for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    async fn execute(
        &self,
        _ctx: &mut ShellContext,
        args: &[String],
    ) -> Result<BuiltinStatus, BuiltinError> {
        if !args.is_empty() {
            debug!(?args, "exit: ignoring arguments");
        }

        Ok(BuiltinStatus::Exit(0))
    }
}
