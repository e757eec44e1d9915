//! Client core of a mobile-commerce storefront.
//!
//! The [`cart::CartStore`] holds the shopper's cart in memory, persists it on
//! the remote customer record, and announces every saved change on the typed
//! [`events::EventBus`]. Its collaborators, [`session::SessionProvider`] and
//! [`api::CustomerApi`], are injected so the same store runs against the real
//! backend, a local session database, or in-memory mocks.

pub mod api;
pub mod banner;
pub mod cart;
pub mod commands;
pub mod config;
pub mod consts;
pub mod events;
pub mod session;
