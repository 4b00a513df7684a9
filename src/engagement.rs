use axum::{Json, Router, debug_handler, extract::State, routing::get};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppState, CoreResult, identity::Identity, requests::RequestStatus};

/// Dashboard figures for one mentor. Pure function of the request and
/// meeting ledgers, recomputed per query; staleness is acceptable, partial
/// writes are not (every input row is committed state).
#[derive(Debug, Clone, Serialize)]
pub struct MentorDashboard {
    pub active_mentees: i64,
    pub pending_requests: i64,
    pub upcoming_meetings: i64,
    pub total_mentoring_minutes: i64,
    pub response_rate: f64,
}

#[derive(Clone)]
pub struct EngagementAggregator {
    db: SqlitePool,
}

impl EngagementAggregator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn active_mentee_count(&self, mentor_id: Uuid) -> CoreResult<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(DISTINCT mentee_id) FROM mentoring_requests WHERE mentor_id=? AND status=?",
        )
        .bind(mentor_id)
        .bind(RequestStatus::Accepted)
        .fetch_one(&self.db)
        .await?)
    }

    pub async fn pending_request_count(&self, mentor_id: Uuid) -> CoreResult<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM mentoring_requests WHERE mentor_id=? AND status=?",
        )
        .bind(mentor_id)
        .bind(RequestStatus::Pending)
        .fetch_one(&self.db)
        .await?)
    }

    pub async fn upcoming_meeting_count(
        &self,
        mentor_id: Uuid,
        as_of: OffsetDateTime,
    ) -> CoreResult<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM mentor_meetings \
             WHERE mentor_id=? AND completed_at IS NULL AND scheduled_at > ?",
        )
        .bind(mentor_id)
        .bind(as_of)
        .fetch_one(&self.db)
        .await?)
    }

    /// Sum over completed meetings only; scheduling alone contributes nothing.
    pub async fn total_mentoring_minutes(&self, mentor_id: Uuid) -> CoreResult<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COALESCE(SUM(duration_minutes), 0) FROM mentor_meetings \
             WHERE mentor_id=? AND completed_at IS NOT NULL",
        )
        .bind(mentor_id)
        .fetch_one(&self.db)
        .await?)
    }

    /// Fraction of received requests that reached a terminal state. A mentor
    /// who only rejects has still responded to everything; with no requests
    /// at all the rate is 0, not NaN.
    pub async fn response_rate(&self, mentor_id: Uuid) -> CoreResult<f64> {
        let (total, responded): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COALESCE(SUM(CASE WHEN status != ? THEN 1 ELSE 0 END), 0) \
             FROM mentoring_requests WHERE mentor_id=?",
        )
        .bind(RequestStatus::Pending)
        .bind(mentor_id)
        .fetch_one(&self.db)
        .await?;

        if total == 0 {
            return Ok(0.0);
        }
        Ok(responded as f64 / total as f64)
    }

    pub async fn dashboard(
        &self,
        mentor_id: Uuid,
        as_of: OffsetDateTime,
    ) -> CoreResult<MentorDashboard> {
        Ok(MentorDashboard {
            active_mentees: self.active_mentee_count(mentor_id).await?,
            pending_requests: self.pending_request_count(mentor_id).await?,
            upcoming_meetings: self.upcoming_meeting_count(mentor_id, as_of).await?,
            total_mentoring_minutes: self.total_mentoring_minutes(mentor_id).await?,
            response_rate: self.response_rate(mentor_id).await?,
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

#[debug_handler]
pub(crate) async fn dashboard(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> CoreResult<Json<MentorDashboard>> {
    let dashboard = EngagementAggregator::new(db_pool)
        .dashboard(identity.user_id, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(dashboard))
}
