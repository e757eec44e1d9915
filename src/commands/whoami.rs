use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};

pub struct WhoamiCommand;

#[async_trait]
impl Command for WhoamiCommand {
    fn name(&self) -> &str {
        "/whoami"
    }

    fn description(&self) -> &str {
        "show session, backend, and database"
    }

    async fn execute(&self, _args: &[&str], ctx: &CommandContext<'_>) -> CommandResult {
        println!("  session   {}", ctx.session);
        println!("  backend   {}", ctx.api_url);
        println!("  database  {}", ctx.db_path);
        println!("  refresh   on failure: {}", ctx.store.config().on_refresh_failure);
        CommandResult::Handled
    }
}
