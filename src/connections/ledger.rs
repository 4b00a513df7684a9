use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Follow {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    pub status: FollowStatus,
    pub created_at: OffsetDateTime,
    pub accepted_at: Option<OffsetDateTime>,
}

const FOLLOW_COLUMNS: &str = "id, requester_id, receiver_id, status, created_at, accepted_at";

/// Directed follow edges. A pair is mutual once both directions are
/// ACCEPTED; accepting a pending edge writes the reciprocal edge in the
/// same transaction, so acceptance alone is what establishes mutuality.
#[derive(Clone)]
pub struct ConnectionLedger {
    db: SqlitePool,
}

impl ConnectionLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Idempotent over the unordered pair: a PENDING or ACCEPTED edge in
    /// either direction is returned as-is. A rejected edge is revived to
    /// PENDING so the pair can try again. A raced duplicate insert is
    /// resolved by re-reading the winner.
    pub async fn follow(&self, requester_id: Uuid, receiver_id: Uuid) -> CoreResult<Follow> {
        if requester_id == receiver_id {
            return Err(CoreError::Validation("cannot follow yourself".to_owned()));
        }

        let mut tx = self.db.begin().await?;

        if let Some(existing) = pair_edge(&mut tx, requester_id, receiver_id).await? {
            if existing.status != FollowStatus::Rejected {
                return Ok(existing);
            }

            // A rejected edge does not block trying again; replace it with a
            // fresh request in the current direction. The delete and insert
            // commit together, so the pair never loses its edge halfway.
            sqlx::query("DELETE FROM follows WHERE id=?")
                .bind(existing.id)
                .execute(&mut *tx)
                .await?;
        }

        let follow = Follow {
            id: Uuid::now_v7(),
            requester_id,
            receiver_id,
            status: FollowStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
            accepted_at: None,
        };

        let inserted = sqlx::query(
            "INSERT INTO follows (id,requester_id,receiver_id,status,created_at) VALUES (?,?,?,?,?)",
        )
        .bind(follow.id)
        .bind(follow.requester_id)
        .bind(follow.receiver_id)
        .bind(follow.status)
        .bind(follow.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(follow)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // Raced insert of the same edge; roll back and read the winner.
                drop(tx);
                self.edge_between(requester_id, receiver_id)
                    .await?
                    .ok_or(CoreError::NotFound("follow request"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Receiver-only. Marks the pending edge ACCEPTED and upserts the
    /// reciprocal ACCEPTED edge so both directions exist afterwards.
    pub async fn accept(
        &self,
        requester_id: Uuid,
        receiver_id: Uuid,
        acting_user_id: Uuid,
    ) -> CoreResult<Follow> {
        if acting_user_id != receiver_id {
            return Err(CoreError::Authorization(
                "only the receiver can accept a follow request".to_owned(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let Some(mut edge) = directed_edge(&mut tx, requester_id, receiver_id).await? else {
            return Err(CoreError::NotFound("follow request"));
        };
        if edge.status != FollowStatus::Pending {
            return Err(CoreError::State("follow request is not pending".to_owned()));
        }

        let now = OffsetDateTime::now_utc();
        sqlx::query("UPDATE follows SET status=?, accepted_at=? WHERE id=?")
            .bind(FollowStatus::Accepted)
            .bind(now)
            .bind(edge.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO follows (id,requester_id,receiver_id,status,created_at,accepted_at) \
             VALUES (?,?,?,?,?,?) \
             ON CONFLICT(requester_id,receiver_id) \
             DO UPDATE SET status=excluded.status, accepted_at=excluded.accepted_at",
        )
        .bind(Uuid::now_v7())
        .bind(receiver_id)
        .bind(requester_id)
        .bind(FollowStatus::Accepted)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        edge.status = FollowStatus::Accepted;
        edge.accepted_at = Some(now);

        tracing::info!(requester = %requester_id, receiver = %receiver_id, "follow request accepted");
        Ok(edge)
    }

    pub async fn reject(
        &self,
        requester_id: Uuid,
        receiver_id: Uuid,
        acting_user_id: Uuid,
    ) -> CoreResult<Follow> {
        if acting_user_id != receiver_id {
            return Err(CoreError::Authorization(
                "only the receiver can reject a follow request".to_owned(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let Some(mut edge) = directed_edge(&mut tx, requester_id, receiver_id).await? else {
            return Err(CoreError::NotFound("follow request"));
        };
        if edge.status != FollowStatus::Pending {
            return Err(CoreError::State("follow request is not pending".to_owned()));
        }

        sqlx::query("UPDATE follows SET status=? WHERE id=?")
            .bind(FollowStatus::Rejected)
            .bind(edge.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        edge.status = FollowStatus::Rejected;
        Ok(edge)
    }

    /// Severs an established connection: both ACCEPTED directions go away.
    pub async fn unfollow(&self, user_a: Uuid, user_b: Uuid) -> CoreResult<()> {
        let deleted = sqlx::query(
            "DELETE FROM follows \
             WHERE ((requester_id=? AND receiver_id=?) OR (requester_id=? AND receiver_id=?)) \
             AND status=?",
        )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .bind(FollowStatus::Accepted)
        .execute(&self.db)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(CoreError::NotFound("connection"));
        }
        Ok(())
    }

    pub async fn is_mutual(&self, user_a: Uuid, user_b: Uuid) -> CoreResult<bool> {
        let accepted: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows \
             WHERE ((requester_id=? AND receiver_id=?) OR (requester_id=? AND receiver_id=?)) \
             AND status=?",
        )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .bind(FollowStatus::Accepted)
        .fetch_one(&self.db)
        .await?;

        Ok(accepted == 2)
    }

    pub async fn status_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> CoreResult<Option<FollowStatus>> {
        Ok(self
            .edge_between(user_a, user_b)
            .await?
            .map(|edge| edge.status))
    }

    async fn edge_between(&self, user_a: Uuid, user_b: Uuid) -> CoreResult<Option<Follow>> {
        Ok(sqlx::query_as(&format!(
            "SELECT {FOLLOW_COLUMNS} FROM follows \
             WHERE (requester_id=? AND receiver_id=?) OR (requester_id=? AND receiver_id=?)"
        ))
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_optional(&self.db)
        .await?)
    }
}

async fn pair_edge(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_a: Uuid,
    user_b: Uuid,
) -> CoreResult<Option<Follow>> {
    Ok(sqlx::query_as(&format!(
        "SELECT {FOLLOW_COLUMNS} FROM follows \
         WHERE (requester_id=? AND receiver_id=?) OR (requester_id=? AND receiver_id=?)"
    ))
    .bind(user_a)
    .bind(user_b)
    .bind(user_b)
    .bind(user_a)
    .fetch_optional(&mut **tx)
    .await?)
}

async fn directed_edge(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    requester_id: Uuid,
    receiver_id: Uuid,
) -> CoreResult<Option<Follow>> {
    Ok(sqlx::query_as(&format!(
        "SELECT {FOLLOW_COLUMNS} FROM follows WHERE requester_id=? AND receiver_id=?"
    ))
    .bind(requester_id)
    .bind(receiver_id)
    .fetch_optional(&mut **tx)
    .await?)
}
