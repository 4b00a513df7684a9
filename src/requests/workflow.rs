use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{CoreError, CoreResult, identity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingMethod {
    Online,
    Offline,
    Flexible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    LateAfternoon,
    Evening,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MentoringRequest {
    pub id: Uuid,
    pub mentee_id: Uuid,
    pub mentor_id: Uuid,
    pub message: String,
    pub status: RequestStatus,
    pub preferred_date: Option<Date>,
    pub preferred_time: Option<TimeSlot>,
    pub preferred_method: Option<MeetingMethod>,
    pub scheduled_at: Option<OffsetDateTime>,
    pub meeting_method: Option<MeetingMethod>,
    pub created_at: OffsetDateTime,
    pub responded_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestPreferences {
    pub preferred_date: Option<Date>,
    pub preferred_time: Option<TimeSlot>,
    pub preferred_method: Option<MeetingMethod>,
}

const REQUEST_COLUMNS: &str = "id, mentee_id, mentor_id, message, status, \
    preferred_date, preferred_time, preferred_method, scheduled_at, meeting_method, \
    created_at, responded_at";

/// The mentoring-request state machine: PENDING -> {ACCEPTED, REJECTED},
/// both terminal. A mentee may re-request a mentor only once the prior
/// request is REJECTED; the partial unique index enforces that under
/// concurrent submissions.
#[derive(Clone)]
pub struct RequestWorkflow {
    db: SqlitePool,
}

impl RequestWorkflow {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn submit(
        &self,
        mentee_id: Uuid,
        mentor_id: Uuid,
        message: String,
        prefs: RequestPreferences,
    ) -> CoreResult<MentoringRequest> {
        if mentee_id == mentor_id {
            return Err(CoreError::Validation(
                "cannot request mentoring from yourself".to_owned(),
            ));
        }

        let mentor = identity::resolve(&self.db, mentor_id).await?;
        if !mentor.role.is_mentor() {
            return Err(CoreError::Role("receiver is not a mentor".to_owned()));
        }

        let mentee = identity::resolve(&self.db, mentee_id).await?;
        if !mentee.role.can_request_mentoring() {
            return Err(CoreError::Role(
                "this role cannot submit mentoring requests".to_owned(),
            ));
        }

        let request = MentoringRequest {
            id: Uuid::now_v7(),
            mentee_id,
            mentor_id,
            message,
            status: RequestStatus::Pending,
            preferred_date: prefs.preferred_date,
            preferred_time: prefs.preferred_time,
            preferred_method: prefs.preferred_method,
            scheduled_at: None,
            meeting_method: None,
            created_at: OffsetDateTime::now_utc(),
            responded_at: None,
        };

        sqlx::query(
            "INSERT INTO mentoring_requests \
             (id,mentee_id,mentor_id,message,status,preferred_date,preferred_time,preferred_method,created_at) \
             VALUES (?,?,?,?,?,?,?,?,?)",
        )
        .bind(request.id)
        .bind(request.mentee_id)
        .bind(request.mentor_id)
        .bind(&request.message)
        .bind(request.status)
        .bind(request.preferred_date)
        .bind(request.preferred_time)
        .bind(request.preferred_method)
        .bind(request.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            CoreError::or_conflict(e, "an active request for this mentor already exists")
        })?;

        tracing::info!(request = %request.id, mentee = %mentee_id, mentor = %mentor_id, "mentoring request submitted");
        Ok(request)
    }

    /// Terminal transition; optionally records the agreed first session.
    pub async fn accept(
        &self,
        request_id: Uuid,
        acting_mentor_id: Uuid,
        scheduled_at: Option<OffsetDateTime>,
        meeting_method: Option<MeetingMethod>,
    ) -> CoreResult<MentoringRequest> {
        let mut tx = self.db.begin().await?;

        let mut request = fetch_pending_for_mentor(&mut tx, request_id, acting_mentor_id).await?;

        let now = OffsetDateTime::now_utc();
        sqlx::query(
            "UPDATE mentoring_requests \
             SET status=?, scheduled_at=?, meeting_method=?, responded_at=? WHERE id=?",
        )
        .bind(RequestStatus::Accepted)
        .bind(scheduled_at)
        .bind(meeting_method)
        .bind(now)
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        request.status = RequestStatus::Accepted;
        request.scheduled_at = scheduled_at;
        request.meeting_method = meeting_method;
        request.responded_at = Some(now);

        tracing::info!(request = %request_id, mentor = %acting_mentor_id, "mentoring request accepted");
        Ok(request)
    }

    pub async fn reject(
        &self,
        request_id: Uuid,
        acting_mentor_id: Uuid,
    ) -> CoreResult<MentoringRequest> {
        let mut tx = self.db.begin().await?;

        let mut request = fetch_pending_for_mentor(&mut tx, request_id, acting_mentor_id).await?;

        let now = OffsetDateTime::now_utc();
        sqlx::query("UPDATE mentoring_requests SET status=?, responded_at=? WHERE id=?")
            .bind(RequestStatus::Rejected)
            .bind(now)
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        request.status = RequestStatus::Rejected;
        request.responded_at = Some(now);

        tracing::info!(request = %request_id, mentor = %acting_mentor_id, "mentoring request rejected");
        Ok(request)
    }

    /// A mentee may withdraw a still-PENDING request. Stored as REJECTED so
    /// the pair is immediately free to re-request.
    pub async fn cancel(
        &self,
        request_id: Uuid,
        acting_mentee_id: Uuid,
    ) -> CoreResult<MentoringRequest> {
        let mut tx = self.db.begin().await?;

        let Some(mut request) = fetch_request(&mut tx, request_id).await? else {
            return Err(CoreError::NotFound("request"));
        };
        if request.mentee_id != acting_mentee_id {
            return Err(CoreError::Authorization(
                "only the requesting mentee can cancel".to_owned(),
            ));
        }
        if request.status != RequestStatus::Pending {
            return Err(CoreError::State("request is not pending".to_owned()));
        }

        let now = OffsetDateTime::now_utc();
        sqlx::query("UPDATE mentoring_requests SET status=?, responded_at=? WHERE id=?")
            .bind(RequestStatus::Rejected)
            .bind(now)
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        request.status = RequestStatus::Rejected;
        request.responded_at = Some(now);
        Ok(request)
    }

    pub async fn get(&self, request_id: Uuid) -> CoreResult<MentoringRequest> {
        let request = sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM mentoring_requests WHERE id=?"
        ))
        .bind(request_id)
        .fetch_optional(&self.db)
        .await?;

        request.ok_or(CoreError::NotFound("request"))
    }

    pub async fn list_received(
        &self,
        mentor_id: Uuid,
        status: Option<RequestStatus>,
    ) -> CoreResult<Vec<MentoringRequest>> {
        let requests = match status {
            Some(status) => {
                sqlx::query_as(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM mentoring_requests \
                     WHERE mentor_id=? AND status=? ORDER BY created_at DESC, id DESC"
                ))
                .bind(mentor_id)
                .bind(status)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM mentoring_requests \
                     WHERE mentor_id=? ORDER BY created_at DESC, id DESC"
                ))
                .bind(mentor_id)
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(requests)
    }

    pub async fn list_sent(&self, mentee_id: Uuid) -> CoreResult<Vec<MentoringRequest>> {
        Ok(sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM mentoring_requests \
             WHERE mentee_id=? ORDER BY created_at DESC, id DESC"
        ))
        .bind(mentee_id)
        .fetch_all(&self.db)
        .await?)
    }

    /// Distinct mentees with an ACCEPTED request for this mentor.
    pub async fn list_active_mentees(&self, mentor_id: Uuid) -> CoreResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar(
            "SELECT DISTINCT mentee_id FROM mentoring_requests WHERE mentor_id=? AND status=?",
        )
        .bind(mentor_id)
        .bind(RequestStatus::Accepted)
        .fetch_all(&self.db)
        .await?)
    }
}

async fn fetch_request(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    request_id: Uuid,
) -> CoreResult<Option<MentoringRequest>> {
    Ok(sqlx::query_as(&format!(
        "SELECT {REQUEST_COLUMNS} FROM mentoring_requests WHERE id=?"
    ))
    .bind(request_id)
    .fetch_optional(&mut **tx)
    .await?)
}

async fn fetch_pending_for_mentor(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    request_id: Uuid,
    acting_mentor_id: Uuid,
) -> CoreResult<MentoringRequest> {
    let Some(request) = fetch_request(tx, request_id).await? else {
        return Err(CoreError::NotFound("request"));
    };
    if request.mentor_id != acting_mentor_id {
        return Err(CoreError::Authorization(
            "only the addressed mentor can respond to this request".to_owned(),
        ));
    }
    if request.status != RequestStatus::Pending {
        return Err(CoreError::State("request is not pending".to_owned()));
    }
    Ok(request)
}
