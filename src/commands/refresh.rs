use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};
use crate::banner::badge;

pub struct RefreshCommand;

#[async_trait]
impl Command for RefreshCommand {
    fn name(&self) -> &str {
        "/refresh"
    }

    fn description(&self) -> &str {
        "reload the cart from your account"
    }

    async fn execute(&self, _args: &[&str], ctx: &CommandContext<'_>) -> CommandResult {
        ctx.store.refresh().await;
        match ctx.store.sync_error() {
            Some(error) => eprintln!("  ✗ could not load cart: {error}"),
            None => println!("  ✓ {}", badge(&ctx.store.cart_items())),
        }
        CommandResult::Handled
    }
}
