//! Built-in REPL commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry handles dispatch, alias resolution,
//! argument splitting and help generation. Embedders can register additional
//! commands at runtime via `registry.register(Arc::new(MyCommand))`.

mod add;
mod cart;
mod help;
mod quantity;
mod quit;
mod refresh;
mod remove;
mod whoami;

use async_trait::async_trait;
use std::sync::Arc;

use crate::cart::{CartStore, SyncOutcome};

/// What commands can see and act on.
pub struct CommandContext<'a> {
    pub store: &'a CartStore,
    /// Human-readable session status, e.g. `"user 42"`.
    pub session: &'a str,
    pub api_url: &'a str,
    pub db_path: &'a str,
}

/// What the REPL should do after a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Not a command.
    NotACommand,
    /// Command handled, continue the REPL loop.
    Handled,
    /// Exit the REPL.
    Quit,
}

/// A REPL command. Implement this trait to add new commands.
#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/cart"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/h", "/?"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Argument synopsis shown in help, e.g. `"<id> [qty]"`.
    fn usage(&self) -> &str {
        ""
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    /// Run the command with the words following its name.
    async fn execute(&self, args: &[&str], ctx: &CommandContext<'_>) -> CommandResult;
}

/// Holds registered commands.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(cart::CartCommand),
            Arc::new(add::AddCommand),
            Arc::new(remove::RemoveCommand),
            Arc::new(quantity::QuantityCommand),
            Arc::new(refresh::RefreshCommand),
            Arc::new(whoami::WhoamiCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    /// Register an additional command.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Dispatch input to a matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let mut words = input.split_whitespace();
        let Some(cmd) = words.next() else {
            return CommandResult::NotACommand;
        };
        let args: Vec<&str> = words.collect();

        for command in &self.commands {
            if cmd == command.name() || command.aliases().contains(&cmd) {
                // /help needs the registry to list every command
                if command.name() == "/help" {
                    print!("{}", self.help_text());
                    return CommandResult::Handled;
                }
                return command.execute(&args, ctx).await;
            }
        }

        if cmd.starts_with('/') {
            println!("unknown command: {cmd}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    /// Generate help text from all registered commands.
    pub fn help_text(&self) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (format_label(c.name(), c.usage(), c.aliases()), c.description()))
            .collect();

        let max_width = entries
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<max_width$}  {desc}\n"));
        }
        out
    }

    /// All registered command names.
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// All registered names and aliases.
    pub fn all_triggers(&self) -> Vec<&str> {
        let mut triggers = Vec::new();
        for cmd in &self.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        triggers
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_label(name: &str, usage: &str, aliases: &[&str]) -> String {
    let mut label = name.to_string();
    if !usage.is_empty() {
        label.push(' ');
        label.push_str(usage);
    }
    if !aliases.is_empty() {
        label.push_str(&format!(" ({})", aliases.join(", ")));
    }
    label
}

/// Parse a strictly positive quantity.
fn parse_quantity(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|q| *q > 0)
}

fn print_usage(command: &dyn Command) {
    eprintln!("  ✗ usage: {} {}", command.name(), command.usage());
}

/// Tell the user how a cart change ended.
fn report(outcome: SyncOutcome, ctx: &CommandContext<'_>) {
    match outcome {
        SyncOutcome::Persisted => println!("  ✓ saved"),
        SyncOutcome::SkippedNoSession => {
            println!("  ✓ updated on this device only (not signed in)");
        }
        SyncOutcome::Failed => {
            let reason = ctx.store.sync_error().unwrap_or_default();
            eprintln!("  ✗ could not save cart: {reason}");
        }
        SyncOutcome::Rejected => eprintln!("  ✗ quantity must be at least 1"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::Customer;
    use crate::api::mock::MockCustomerApi;
    use crate::events::EventBus;
    use crate::session::StaticSession;

    /// A store for customer `"1"` who is signed in, plus its backend.
    pub(crate) fn test_store() -> (CartStore, Arc<MockCustomerApi>) {
        let api = Arc::new(MockCustomerApi::new().with_customer(Customer::new("1")));
        let store = CartStore::new(
            Arc::new(StaticSession::signed_in("1", "token")),
            api.clone(),
            Arc::new(EventBus::new()),
            Default::default(),
        );
        (store, api)
    }

    pub(crate) fn test_ctx(store: &CartStore) -> CommandContext<'_> {
        CommandContext {
            store,
            session: "user 1",
            api_url: "http://localhost",
            db_path: ":memory:",
        }
    }

    #[test]
    fn all_builtins_registered() {
        let reg = CommandRegistry::new();
        let names = reg.names();
        for name in [
            "/help", "/cart", "/add", "/remove", "/qty", "/refresh", "/whoami", "/quit",
        ] {
            assert!(names.contains(&name), "missing: {name}");
        }
    }

    #[test]
    fn no_duplicate_triggers() {
        let reg = CommandRegistry::new();
        let triggers = reg.all_triggers();
        let mut seen = Vec::new();
        for t in &triggers {
            assert!(!seen.contains(t), "duplicate trigger: {t}");
            seen.push(t);
        }
    }

    #[test]
    fn help_text_includes_all_commands_and_usage() {
        let reg = CommandRegistry::new();
        let text = reg.help_text();
        for name in reg.names() {
            assert!(text.contains(name), "help missing: {name}");
        }
        assert!(text.contains("/add <id> [qty]"));
        assert!(text.contains("/h"));
        assert!(text.contains("/?"));
    }

    #[tokio::test]
    async fn unknown_slash_command_is_handled() {
        let (store, _) = test_store();
        let reg = CommandRegistry::new();
        assert_eq!(
            reg.dispatch("/foobar", &test_ctx(&store)).await,
            CommandResult::Handled
        );
    }

    #[tokio::test]
    async fn non_command_passes_through() {
        let (store, _) = test_store();
        let reg = CommandRegistry::new();
        assert_eq!(
            reg.dispatch("hello world", &test_ctx(&store)).await,
            CommandResult::NotACommand
        );
        assert_eq!(
            reg.dispatch("   ", &test_ctx(&store)).await,
            CommandResult::NotACommand
        );
    }

    #[tokio::test]
    async fn dispatch_passes_arguments() {
        let (store, _) = test_store();
        let reg = CommandRegistry::new();
        reg.dispatch("/add  shoe   3", &test_ctx(&store)).await;
        assert_eq!(store.cart_items(), vec![crate::cart::CartItem::new("shoe", 3)]);
    }

    #[tokio::test]
    async fn registered_command_works() {
        struct PingCommand;

        #[async_trait]
        impl Command for PingCommand {
            fn name(&self) -> &str {
                "/ping"
            }
            fn description(&self) -> &str {
                "pong"
            }
            async fn execute(&self, _args: &[&str], _ctx: &CommandContext<'_>) -> CommandResult {
                CommandResult::Quit
            }
        }

        let (store, _) = test_store();
        let mut reg = CommandRegistry::new();
        reg.register(Arc::new(PingCommand));
        assert!(reg.names().contains(&"/ping"));
        assert_eq!(
            reg.dispatch("/ping", &test_ctx(&store)).await,
            CommandResult::Quit
        );
        assert!(reg.help_text().contains("/ping"));
    }

    #[test]
    fn format_label_variants() {
        assert_eq!(format_label("/cart", "", &[]), "/cart");
        assert_eq!(format_label("/help", "", &["/h", "/?"]), "/help (/h, /?)");
        assert_eq!(format_label("/remove", "<id>", &["/rm"]), "/remove <id> (/rm)");
    }

    #[test]
    fn parse_quantity_requires_positive_integer() {
        assert_eq!(parse_quantity("3"), Some(3));
        assert_eq!(parse_quantity("0"), None);
        assert_eq!(parse_quantity("-1"), None);
        assert_eq!(parse_quantity("two"), None);
    }
}
