use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};
use crate::banner::{badge, cart_listing};

pub struct CartCommand;

#[async_trait]
impl Command for CartCommand {
    fn name(&self) -> &str {
        "/cart"
    }

    fn aliases(&self) -> &[&str] {
        &["/ls"]
    }

    fn description(&self) -> &str {
        "show the cart"
    }

    async fn execute(&self, _args: &[&str], ctx: &CommandContext<'_>) -> CommandResult {
        let items = ctx.store.cart_items();
        print!("{}", cart_listing(&items));
        println!("  {}", badge(&items));
        if let Some(error) = ctx.store.sync_error() {
            eprintln!("  ! last sync failed: {error}");
        }
        CommandResult::Handled
    }
}
