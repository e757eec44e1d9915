//! Startup banner, cart badge, and farewell summary.

use anyhow::Result;

use crate::cart::CartItem;
use crate::consts::{HOMEPAGE, REPO, pluralize};
use crate::session::Session;

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub api_url: &'a str,
    pub session: &'a str,
    pub database: &'a str,
}

/// Print the startup banner with session info.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║         S T O R E F R O N T           ║
   ║      your cart, wherever you are      ║
   ╚═══════════════════════════════════════╝

   version   {}
   home      {}
   repo      {}
   backend   {}
   session   {}
   database  {}

   type /help for commands
"#,
        env!("CARGO_PKG_VERSION"),
        HOMEPAGE,
        REPO,
        info.api_url,
        info.session,
        info.database,
    );
}

/// Session line for the banner. An unreadable session counts as signed out,
/// the same way the cart store treats it.
pub fn session_status(lookup: Result<Option<Session>>) -> String {
    let session = lookup.unwrap_or_else(|e| {
        tracing::warn!(error = %format!("{e:#}"), "stored session is unreadable");
        None
    });
    match session.as_ref().and_then(Session::user_id) {
        Some(id) => format!("user {id}"),
        None => "signed out (run `storefront login`)".to_string(),
    }
}

/// The one-line cart indicator shown whenever the cart changes.
pub fn badge(items: &[CartItem]) -> String {
    format!("cart: {}", pluralize(items.len(), "item"))
}

/// A printable listing of the cart, one line per product.
pub fn cart_listing(items: &[CartItem]) -> String {
    if items.is_empty() {
        return "  (empty)\n".to_string();
    }
    let width = items.iter().map(|i| i.id.len()).max().unwrap_or(0);
    let mut out = String::new();
    for item in items {
        out.push_str(&format!("  {:<width$}  x{}\n", item.id, item.quantity));
    }
    out
}

/// Print the session summary (cart size + farewell).
pub fn print_session_summary(count: usize) {
    if count > 0 {
        println!("cart holds {}", pluralize(count, "item"));
    }
    println!("goodbye.");
}
