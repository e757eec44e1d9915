use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use storefront::api::rest::RestCustomerApi;
use storefront::banner::{
    BannerInfo, badge, print_banner, print_session_summary, session_status,
};
use storefront::cart::{CartStore, CartUpdated};
use storefront::commands::{CommandContext, CommandRegistry, CommandResult};
use storefront::config::{Config, KNOWN_KEYS};
use storefront::consts::{DEFAULT_LOG_FILTER, default_db_path};
use storefront::events::EventBus;
use storefront::session::{self, SessionStore};

#[derive(Parser)]
#[command(
    name = "storefront",
    version,
    about = "A shopping cart that follows you between devices."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// SQLite database for session and settings (use :memory: for ephemeral)
    #[arg(short, long)]
    db: Option<String>,

    /// Backend base URL, overriding stored config
    #[arg(long)]
    api_url: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Store a session for a customer account
    Login {
        /// Customer id on the backend
        #[arg(long)]
        user_id: String,
        /// Session token issued by the backend
        #[arg(long)]
        token: String,
    },
    /// Forget the stored session
    Logout,
    /// Read or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a value
    Set { key: String, value: String },
    /// Print a value
    Get { key: String },
    /// Remove a value
    Unset { key: String },
    /// List known keys and their values
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let db_path = resolve_db_path(cli.db.as_deref())?;

    if let Some(command) = &cli.command {
        return match command {
            Command::Login { user_id, token } => handle_login(&db_path, user_id, token),
            Command::Logout => handle_logout(&db_path),
            Command::Config { action } => handle_config(&db_path, action),
        };
    }

    let sessions = Arc::new(SessionStore::open(&db_path)?);
    let config = Config::open(&db_path)?;
    let api_config = config.api_config(cli.api_url.as_deref())?;
    let api_url = api_config.base_url.clone();
    let api = Arc::new(RestCustomerApi::new(api_config).context("failed to build HTTP client")?);

    let bus = Arc::new(EventBus::new());
    let _badge = bus.on::<CartUpdated>(|items| {
        println!("  {}", badge(items));
        Ok(())
    });

    let store = CartStore::new(sessions.clone(), api, bus, config.store_config()?);

    let session_label = session_status(sessions.get());
    let database_label = if db_path == ":memory:" {
        "ephemeral"
    } else {
        db_path.as_str()
    };

    print_banner(&BannerInfo {
        api_url: &api_url,
        session: &session_label,
        database: database_label,
    });

    store.refresh().await;
    match store.sync_error() {
        Some(error) => eprintln!("warning: could not load cart: {error}"),
        None => println!("{}", badge(&store.cart_items())),
    }

    let registry = CommandRegistry::new();
    let ctx = CommandContext {
        store: &store,
        session: &session_label,
        api_url: &api_url,
        db_path: database_label,
    };

    // async stdin so Ctrl+C is caught at the prompt too
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\nstorefront> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        // Ctrl+C abandons the wait; a save already sent still completes
        tokio::select! {
            result = registry.dispatch(input, &ctx) => {
                match result {
                    CommandResult::Quit => break,
                    CommandResult::Handled => {}
                    CommandResult::NotACommand => {
                        println!("not a command: {input}");
                        println!("type /help for available commands");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n\ninterrupted");
            }
        }
    }

    print_session_summary(store.cart_count());
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "storefront=debug"
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Use the given path, or the default one with its directory created.
fn resolve_db_path(db: Option<&str>) -> Result<String> {
    if let Some(path) = db {
        return Ok(path.to_string());
    }
    let path = default_db_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(path.to_string_lossy().into_owned())
}

fn handle_login(db_path: &str, user_id: &str, token: &str) -> Result<()> {
    let session = session::login(db_path, user_id, token)?;
    println!("✓ signed in as user {}", session.user.id);
    Ok(())
}

fn handle_logout(db_path: &str) -> Result<()> {
    session::logout(db_path)?;
    println!("✓ signed out. The cart stays on your account.");
    Ok(())
}

fn handle_config(db_path: &str, action: &ConfigAction) -> Result<()> {
    let config = Config::open(db_path)?;
    match action {
        ConfigAction::Set { key, value } => {
            config.set(key, value)?;
            println!("✓ {key} updated");
        }
        ConfigAction::Get { key } => match config.get(key)? {
            Some(value) => println!("{value}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Unset { key } => {
            config.remove(key)?;
            println!("✓ {key} removed");
        }
        ConfigAction::List => {
            for key in KNOWN_KEYS {
                let value = config.get(key)?.unwrap_or_else(|| "-".to_string());
                println!("{key:<16} {value}");
            }
        }
    }
    Ok(())
}
