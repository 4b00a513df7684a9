use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CoreError, CoreResult, requests::RequestStatus};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Meeting {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub scheduled_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
    pub duration_minutes: i64,
}

const MEETING_COLUMNS: &str =
    "id, mentor_id, mentee_id, scheduled_at, completed_at, duration_minutes";

/// Scheduled and completed sessions behind an established mentoring
/// relationship. completed_at and duration_minutes are written exactly once.
#[derive(Clone)]
pub struct MeetingLedger {
    db: SqlitePool,
}

impl MeetingLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn schedule(
        &self,
        mentor_id: Uuid,
        mentee_id: Uuid,
        scheduled_at: OffsetDateTime,
    ) -> CoreResult<Meeting> {
        if scheduled_at <= OffsetDateTime::now_utc() {
            return Err(CoreError::Validation(
                "meeting must be scheduled in the future".to_owned(),
            ));
        }

        let accepted: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM mentoring_requests WHERE mentor_id=? AND mentee_id=? AND status=?",
        )
        .bind(mentor_id)
        .bind(mentee_id)
        .bind(RequestStatus::Accepted)
        .fetch_one(&self.db)
        .await?;
        if accepted == 0 {
            return Err(CoreError::State(
                "no accepted mentoring request between this mentor and mentee".to_owned(),
            ));
        }

        let meeting = Meeting {
            id: Uuid::now_v7(),
            mentor_id,
            mentee_id,
            scheduled_at,
            completed_at: None,
            duration_minutes: 0,
        };

        sqlx::query(
            "INSERT INTO mentor_meetings (id,mentor_id,mentee_id,scheduled_at,duration_minutes) \
             VALUES (?,?,?,?,0)",
        )
        .bind(meeting.id)
        .bind(meeting.mentor_id)
        .bind(meeting.mentee_id)
        .bind(meeting.scheduled_at)
        .execute(&self.db)
        .await?;

        tracing::info!(meeting = %meeting.id, mentor = %mentor_id, mentee = %mentee_id, "meeting scheduled");
        Ok(meeting)
    }

    /// Terminal field write; a completed meeting can never be re-completed.
    pub async fn complete(
        &self,
        meeting_id: Uuid,
        acting_mentor_id: Uuid,
        duration_minutes: i64,
    ) -> CoreResult<Meeting> {
        if duration_minutes <= 0 {
            return Err(CoreError::Validation(
                "duration must be a positive number of minutes".to_owned(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let meeting: Option<Meeting> = sqlx::query_as(&format!(
            "SELECT {MEETING_COLUMNS} FROM mentor_meetings WHERE id=?"
        ))
        .bind(meeting_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut meeting) = meeting else {
            return Err(CoreError::NotFound("meeting"));
        };
        if meeting.mentor_id != acting_mentor_id {
            return Err(CoreError::Authorization(
                "only the meeting's mentor can complete it".to_owned(),
            ));
        }
        if meeting.completed_at.is_some() {
            return Err(CoreError::State("meeting is already completed".to_owned()));
        }

        let now = OffsetDateTime::now_utc();
        sqlx::query("UPDATE mentor_meetings SET completed_at=?, duration_minutes=? WHERE id=?")
            .bind(now)
            .bind(duration_minutes)
            .bind(meeting_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        meeting.completed_at = Some(now);
        meeting.duration_minutes = duration_minutes;

        tracing::info!(meeting = %meeting_id, duration_minutes, "meeting completed");
        Ok(meeting)
    }

    /// Not yet completed and still ahead of `as_of`, soonest first.
    pub async fn list_upcoming(
        &self,
        mentor_id: Uuid,
        as_of: OffsetDateTime,
    ) -> CoreResult<Vec<Meeting>> {
        Ok(sqlx::query_as(&format!(
            "SELECT {MEETING_COLUMNS} FROM mentor_meetings \
             WHERE mentor_id=? AND completed_at IS NULL AND scheduled_at > ? \
             ORDER BY scheduled_at ASC"
        ))
        .bind(mentor_id)
        .bind(as_of)
        .fetch_all(&self.db)
        .await?)
    }
}
