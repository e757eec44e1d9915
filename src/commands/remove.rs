use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, print_usage, report};

pub struct RemoveCommand;

#[async_trait]
impl Command for RemoveCommand {
    fn name(&self) -> &str {
        "/remove"
    }

    fn aliases(&self) -> &[&str] {
        &["/rm"]
    }

    fn usage(&self) -> &str {
        "<id>"
    }

    fn description(&self) -> &str {
        "remove a product from the cart"
    }

    async fn execute(&self, args: &[&str], ctx: &CommandContext<'_>) -> CommandResult {
        let [id] = args else {
            print_usage(self);
            return CommandResult::Handled;
        };
        report(ctx.store.remove_from_cart(id).await, ctx);
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;
    use crate::commands::tests::{test_ctx, test_store};

    #[tokio::test]
    async fn removes_line() {
        let (store, _) = test_store();
        store.add_to_cart("a", 1).await;
        store.add_to_cart("b", 1).await;

        RemoveCommand.execute(&["a"], &test_ctx(&store)).await;
        assert_eq!(store.cart_items(), vec![CartItem::new("b", 1)]);
    }

    #[tokio::test]
    async fn missing_argument_is_handled() {
        let (store, api) = test_store();
        assert_eq!(
            RemoveCommand.execute(&[], &test_ctx(&store)).await,
            CommandResult::Handled
        );
        assert_eq!(api.writes(), 0);
    }
}
