use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, parse_quantity, print_usage, report};

pub struct AddCommand;

#[async_trait]
impl Command for AddCommand {
    fn name(&self) -> &str {
        "/add"
    }

    fn usage(&self) -> &str {
        "<id> [qty]"
    }

    fn description(&self) -> &str {
        "add a product (quantity defaults to 1)"
    }

    async fn execute(&self, args: &[&str], ctx: &CommandContext<'_>) -> CommandResult {
        let (id, quantity) = match args {
            [id] => (*id, 1),
            [id, qty] => match parse_quantity(qty) {
                Some(q) => (*id, q),
                None => {
                    eprintln!("  ✗ invalid quantity: {qty}");
                    return CommandResult::Handled;
                }
            },
            _ => {
                print_usage(self);
                return CommandResult::Handled;
            }
        };

        report(ctx.store.add_to_cart(id, quantity).await, ctx);
        CommandResult::Handled
    }
}
