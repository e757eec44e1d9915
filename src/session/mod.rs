//! The authenticated identity the cart reads but never owns.

pub mod storage;

pub use storage::SessionStore;

use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::string_or_number;

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// An authenticated session: `{ token, user: { id } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

impl Session {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: SessionUser { id: user_id.into() },
        }
    }

    /// The user id, or `None` when it is blank.
    pub fn user_id(&self) -> Option<&str> {
        let id = self.user.id.trim();
        (!id.is_empty()).then_some(id)
    }
}

/// Resolves the current session. Looked up fresh on every use.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>>;
}

/// A session held in memory. Swappable at runtime to simulate sign-in and
/// sign-out.
#[derive(Debug, Default)]
pub struct StaticSession {
    session: RwLock<Option<Session>>,
}

impl StaticSession {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }

    pub fn signed_in(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(Some(Session::new(user_id, token)))
    }

    pub fn signed_out() -> Self {
        Self::new(None)
    }

    pub fn set(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn get_session(&self) -> Result<Option<Session>> {
        Ok(self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Store a session for `user_id` in the database at `db_path`.
///
/// Shared by the `storefront login` subcommand and embedders.
pub fn login(db_path: &str, user_id: &str, token: &str) -> Result<Session> {
    if user_id.trim().is_empty() {
        bail!("user id must not be empty");
    }
    if token.trim().is_empty() {
        bail!("token must not be empty");
    }
    let session = Session::new(user_id.trim(), token.trim());
    let store = SessionStore::open(db_path).context("failed to open session storage")?;
    store.set(&session).context("failed to save session")?;
    Ok(session)
}

/// Forget the stored session.
pub fn logout(db_path: &str) -> Result<()> {
    let store = SessionStore::open(db_path).context("failed to open session storage")?;
    store.clear().context("failed to remove session")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_decodes_numeric_user_id() {
        let session: Session =
            serde_json::from_value(json!({"token": "t", "user": {"id": 17}})).unwrap();
        assert_eq!(session.user_id(), Some("17"));
    }

    #[test]
    fn blank_user_id_is_absent() {
        assert_eq!(Session::new("  ", "t").user_id(), None);
        assert_eq!(Session::new("", "t").user_id(), None);
    }

    #[tokio::test]
    async fn static_session_can_be_swapped() {
        let provider = StaticSession::signed_out();
        assert!(provider.get_session().await.unwrap().is_none());

        provider.set(Some(Session::new("5", "tok")));
        let session = provider.get_session().await.unwrap().unwrap();
        assert_eq!(session.user.id, "5");
        assert_eq!(session.token, "tok");
    }

    #[test]
    fn login_rejects_blank_input() {
        assert!(login(":memory:", "", "tok").is_err());
        assert!(login(":memory:", "1", "  ").is_err());
    }

    #[test]
    fn login_then_logout_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");
        let path = path.to_str().unwrap();

        let session = login(path, " 12 ", "secret").unwrap();
        assert_eq!(session.user.id, "12");
        assert_eq!(SessionStore::open(path).unwrap().get().unwrap(), Some(session));

        logout(path).unwrap();
        assert!(SessionStore::open(path).unwrap().get().unwrap().is_none());
    }
}
