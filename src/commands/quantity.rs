use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, parse_quantity, print_usage, report};

pub struct QuantityCommand;

#[async_trait]
impl Command for QuantityCommand {
    fn name(&self) -> &str {
        "/qty"
    }

    fn usage(&self) -> &str {
        "<id> <qty>"
    }

    fn description(&self) -> &str {
        "set the quantity of a product already in the cart"
    }

    async fn execute(&self, args: &[&str], ctx: &CommandContext<'_>) -> CommandResult {
        let [id, qty] = args else {
            print_usage(self);
            return CommandResult::Handled;
        };
        let Some(quantity) = parse_quantity(qty) else {
            eprintln!("  ✗ invalid quantity: {qty}");
            return CommandResult::Handled;
        };

        if !ctx.store.cart_items().iter().any(|item| item.id == *id) {
            println!("  {id} is not in the cart, nothing to update");
            return CommandResult::Handled;
        }
        report(ctx.store.update_cart_quantity(id, quantity).await, ctx);
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;
    use crate::commands::tests::{test_ctx, test_store};

    #[tokio::test]
    async fn replaces_quantity() {
        let (store, _) = test_store();
        store.add_to_cart("a", 4).await;
        QuantityCommand.execute(&["a", "2"], &test_ctx(&store)).await;
        assert_eq!(store.cart_items(), vec![CartItem::new("a", 2)]);
    }

    #[tokio::test]
    async fn unknown_product_is_not_created() {
        let (store, api) = test_store();
        QuantityCommand.execute(&["ghost", "2"], &test_ctx(&store)).await;
        assert!(store.cart_items().is_empty());
        assert_eq!(api.writes(), 0);
    }

    #[tokio::test]
    async fn invalid_quantity_is_refused() {
        let (store, api) = test_store();
        store.add_to_cart("a", 4).await;
        QuantityCommand.execute(&["a", "0"], &test_ctx(&store)).await;
        QuantityCommand.execute(&["a"], &test_ctx(&store)).await;
        assert_eq!(store.cart_items(), vec![CartItem::new("a", 4)]);
        assert_eq!(api.writes(), 1);
    }
}
