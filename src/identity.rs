use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Closed role set. Everyone who is not a mentor (or an admin) is eligible to
/// submit mentoring requests; only mentors may receive them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Yb,
    YbLeader,
    Ob,
    Mentor,
    Admin,
}

impl Role {
    pub fn is_mentor(self) -> bool {
        matches!(self, Role::Mentor)
    }

    pub fn can_request_mentoring(self) -> bool {
        match self {
            Role::Yb | Role::YbLeader | Role::Ob => true,
            Role::Mentor | Role::Admin => false,
        }
    }
}

/// A resolved caller. User lifecycle is owned by the external identity
/// directory; the core only reads the mirrored users table.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

pub async fn resolve(db: &SqlitePool, user_id: Uuid) -> CoreResult<Identity> {
    let row: Option<(Role,)> = sqlx::query_as("SELECT role FROM users WHERE id=?")
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    row.map(|(role,)| Identity { user_id, role })
        .ok_or(CoreError::NotFound("user"))
}

/// Sync entry point for the identity directory. Not routed; the directory
/// owns user lifecycle and calls in when a user appears or changes role.
pub async fn upsert(db: &SqlitePool, user_id: Uuid, name: &str, role: Role) -> CoreResult<()> {
    sqlx::query(
        "INSERT INTO users (id,name,role) VALUES (?,?,?)
         ON CONFLICT(id) DO UPDATE SET name=excluded.name, role=excluded.role",
    )
    .bind(user_id)
    .bind(name)
    .bind(role)
    .execute(db)
    .await?;

    Ok(())
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let db = SqlitePool::from_ref(state);

        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| CoreError::Authorization("missing or malformed x-user-id".to_owned()))?;

        resolve(&db, user_id).await
    }
}
