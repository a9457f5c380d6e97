//! Refresh-token session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use himorganic_core::{SessionId, UserKind};

use crate::store::Entity;

/// A server-side refresh-token session.
///
/// The refresh token itself is an opaque random string; this record is the
/// only place it is tied to an account. Deleting the record revokes the
/// token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    /// Owning account (user or admin, per `user_kind`).
    pub user_id: Uuid,
    pub user_kind: UserKind,
    pub refresh_token: String,
    pub is_admin: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for a freshly issued refresh token.
    #[must_use]
    pub fn new(user_id: Uuid, is_admin: bool, refresh_token: String, ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            user_id,
            user_kind: if is_admin { UserKind::Admin } else { UserKind::User },
            refresh_token,
            is_admin,
            expires_at: now + ttl,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the session has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl Entity for Session {
    const COLLECTION: &'static str = "sessions";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}
