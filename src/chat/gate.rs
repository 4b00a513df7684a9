use serde::Serialize;
use sqlx::{SqlitePool, types::Json};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{CoreError, CoreResult, connections::ConnectionLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomKind {
    Dm,
    Group,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatRoom {
    pub id: Uuid,
    pub kind: RoomKind,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub body: Option<String>,
    pub file_refs: Option<Json<Vec<String>>>,
    pub sent_at: OffsetDateTime,
}

const ROOM_COLUMNS: &str = "id, kind, created_by, created_at";
const MESSAGE_COLUMNS: &str = "id, room_id, sender_id, body, file_refs, sent_at";

/// Authorizes room access off the connection ledger and appends messages.
/// Storage is the durable end of the core's responsibility; the broadcast
/// channel hands each appended message to the external delivery transport.
#[derive(Clone)]
pub struct ChatGate {
    db: SqlitePool,
    connections: ConnectionLedger,
    delivery: broadcast::Sender<ChatMessage>,
}

impl ChatGate {
    pub fn new(db: SqlitePool, delivery: broadcast::Sender<ChatMessage>) -> Self {
        let connections = ConnectionLedger::new(db.clone());
        Self {
            db,
            connections,
            delivery,
        }
    }

    /// One DM room per unordered pair, enforced by the pair_key constraint.
    /// Requires mutuality at call time, even when the room already exists.
    pub async fn open_direct_room(&self, user_a: Uuid, user_b: Uuid) -> CoreResult<ChatRoom> {
        if user_a == user_b {
            return Err(CoreError::Validation(
                "cannot open a DM with yourself".to_owned(),
            ));
        }

        if !self.connections.is_mutual(user_a, user_b).await? {
            return Err(CoreError::Authorization(
                "direct messages require a mutual connection".to_owned(),
            ));
        }

        let pair_key = dm_pair_key(user_a, user_b);

        if let Some(room) = self.room_by_pair_key(&pair_key).await? {
            return Ok(room);
        }

        let room = ChatRoom {
            id: Uuid::now_v7(),
            kind: RoomKind::Dm,
            created_by: user_a,
            created_at: OffsetDateTime::now_utc(),
        };

        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO chat_rooms (id,kind,pair_key,created_by,created_at) VALUES (?,?,?,?,?)",
        )
        .bind(room.id)
        .bind(room.kind)
        .bind(&pair_key)
        .bind(room.created_by)
        .bind(room.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            // Lost the race to the other caller; their room is the room.
            drop(tx);
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                return self
                    .room_by_pair_key(&pair_key)
                    .await?
                    .ok_or(CoreError::NotFound("room"));
            }
            return Err(e.into());
        }

        sqlx::query("INSERT INTO chat_room_members (room_id,user_id) VALUES (?,?), (?,?)")
            .bind(room.id)
            .bind(user_a)
            .bind(room.id)
            .bind(user_b)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(room = %room.id, "DM room opened");
        Ok(room)
    }

    /// Append-only; prior messages are never mutated or deleted.
    pub async fn post_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        body: Option<String>,
        file_refs: Option<Vec<String>>,
    ) -> CoreResult<ChatMessage> {
        let has_body = body.as_deref().is_some_and(|b| !b.trim().is_empty());
        let has_files = file_refs.as_deref().is_some_and(|f| !f.is_empty());
        if !has_body && !has_files {
            return Err(CoreError::Validation(
                "a message needs text or at least one file".to_owned(),
            ));
        }

        self.require_member(room_id, sender_id).await?;

        let message = ChatMessage {
            id: Uuid::now_v7(),
            room_id,
            sender_id,
            body,
            file_refs: file_refs.map(Json),
            sent_at: OffsetDateTime::now_utc(),
        };

        sqlx::query(
            "INSERT INTO chat_messages (id,room_id,sender_id,body,file_refs,sent_at) \
             VALUES (?,?,?,?,?,?)",
        )
        .bind(message.id)
        .bind(message.room_id)
        .bind(message.sender_id)
        .bind(&message.body)
        .bind(&message.file_refs)
        .bind(message.sent_at)
        .execute(&self.db)
        .await?;

        let _ = self.delivery.send(message.clone());

        Ok(message)
    }

    /// Newest first, keyset-paginated on the cursor message's send time.
    pub async fn list_messages(
        &self,
        room_id: Uuid,
        caller_id: Uuid,
        before: Option<Uuid>,
        limit: i64,
    ) -> CoreResult<(Vec<ChatMessage>, bool)> {
        self.require_member(room_id, caller_id).await?;

        let limit = limit.clamp(1, 100);

        let mut messages: Vec<ChatMessage> = match before {
            Some(cursor) => {
                let cursor_sent_at: Option<OffsetDateTime> =
                    sqlx::query_scalar("SELECT sent_at FROM chat_messages WHERE id=? AND room_id=?")
                        .bind(cursor)
                        .bind(room_id)
                        .fetch_optional(&self.db)
                        .await?;
                let Some(cursor_sent_at) = cursor_sent_at else {
                    return Err(CoreError::NotFound("message"));
                };

                sqlx::query_as(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
                     WHERE room_id=? AND (sent_at < ? OR (sent_at = ? AND id < ?)) \
                     ORDER BY sent_at DESC, id DESC LIMIT ?"
                ))
                .bind(room_id)
                .bind(cursor_sent_at)
                .bind(cursor_sent_at)
                .bind(cursor)
                .bind(limit + 1)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
                     WHERE room_id=? ORDER BY sent_at DESC, id DESC LIMIT ?"
                ))
                .bind(room_id)
                .bind(limit + 1)
                .fetch_all(&self.db)
                .await?
            }
        };

        let has_more = messages.len() as i64 > limit;
        messages.truncate(limit as usize);

        Ok((messages, has_more))
    }

    pub async fn mark_read(&self, room_id: Uuid, caller_id: Uuid) -> CoreResult<()> {
        self.require_member(room_id, caller_id).await?;

        sqlx::query("UPDATE chat_room_members SET last_read_at=? WHERE room_id=? AND user_id=?")
            .bind(OffsetDateTime::now_utc())
            .bind(room_id)
            .bind(caller_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Messages from others sent after the caller's last mark-read.
    pub async fn unread_count(&self, room_id: Uuid, caller_id: Uuid) -> CoreResult<i64> {
        self.require_member(room_id, caller_id).await?;

        let last_read_at: Option<OffsetDateTime> = sqlx::query_scalar(
            "SELECT last_read_at FROM chat_room_members WHERE room_id=? AND user_id=?",
        )
        .bind(room_id)
        .bind(caller_id)
        .fetch_one(&self.db)
        .await?;

        let count = match last_read_at {
            Some(last_read_at) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM chat_messages \
                     WHERE room_id=? AND sender_id != ? AND sent_at > ?",
                )
                .bind(room_id)
                .bind(caller_id)
                .bind(last_read_at)
                .fetch_one(&self.db)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM chat_messages WHERE room_id=? AND sender_id != ?",
                )
                .bind(room_id)
                .bind(caller_id)
                .fetch_one(&self.db)
                .await?
            }
        };

        Ok(count)
    }

    async fn require_member(&self, room_id: Uuid, user_id: Uuid) -> CoreResult<()> {
        let room: Option<ChatRoom> =
            sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id=?"))
                .bind(room_id)
                .fetch_optional(&self.db)
                .await?;
        if room.is_none() {
            return Err(CoreError::NotFound("room"));
        }

        let member: Option<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM chat_room_members WHERE room_id=? AND user_id=?")
                .bind(room_id)
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        if member.is_none() {
            return Err(CoreError::Authorization(
                "not a member of this room".to_owned(),
            ));
        }
        Ok(())
    }

    async fn room_by_pair_key(&self, pair_key: &str) -> CoreResult<Option<ChatRoom>> {
        Ok(sqlx::query_as(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE pair_key=?"
        ))
        .bind(pair_key)
        .fetch_optional(&self.db)
        .await?)
    }
}

/// Order-independent key for a DM member pair.
fn dm_pair_key(user_a: Uuid, user_b: Uuid) -> String {
    let (lo, hi) = if user_a < user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{lo}:{hi}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_ignores_argument_order() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(dm_pair_key(a, b), dm_pair_key(b, a));
        assert_ne!(dm_pair_key(a, b), dm_pair_key(a, a));
    }
}
