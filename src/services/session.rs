use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::draft::Draft;

/// Identifies one browser session; carried in the `menu_sid` cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-session storage for the draft menu.
#[allow(async_fn_in_trait)]
pub trait DraftStore {
    async fn load(&self, session: SessionId) -> anyhow::Result<Option<Draft>>;
    async fn save(&self, session: SessionId, draft: &Draft) -> anyhow::Result<()>;
    async fn clear(&self, session: SessionId) -> anyhow::Result<()>;
}

/// Drafts serialized as JSON under `draft:<session id>`, expiring with the session.
#[derive(Clone)]
pub struct RedisDraftStore {
    conn: redis::aio::MultiplexedConnection,
    ttl_seconds: u64,
}

impl RedisDraftStore {
    pub fn new(conn: redis::aio::MultiplexedConnection, ttl_seconds: u64) -> Self {
        Self { conn, ttl_seconds }
    }

    fn key(session: SessionId) -> String {
        format!("draft:{session}")
    }
}

impl DraftStore for RedisDraftStore {
    async fn load(&self, session: SessionId) -> anyhow::Result<Option<Draft>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::key(session))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: SessionId, draft: &Draft) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(draft)?;
        let _: () = redis::cmd("SET")
            .arg(Self::key(session))
            .arg(json)
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn clear(&self, session: SessionId) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL")
            .arg(Self::key(session))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
