mod ledger;

pub use ledger::{Meeting, MeetingLedger};

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppState, CoreResult, identity::Identity};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(schedule))
        .route("/upcoming", get(list_upcoming))
        .route("/{id}/complete", post(complete))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleBody {
    mentee_id: Uuid,
    scheduled_at: OffsetDateTime,
}

#[debug_handler]
pub(crate) async fn schedule(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Json(ScheduleBody {
        mentee_id,
        scheduled_at,
    }): Json<ScheduleBody>,
) -> CoreResult<(StatusCode, Json<Meeting>)> {
    let meeting = MeetingLedger::new(db_pool)
        .schedule(identity.user_id, mentee_id, scheduled_at)
        .await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteBody {
    duration_minutes: i64,
}

#[debug_handler]
pub(crate) async fn complete(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(meeting_id): Path<Uuid>,
    Json(CompleteBody { duration_minutes }): Json<CompleteBody>,
) -> CoreResult<Json<Meeting>> {
    let meeting = MeetingLedger::new(db_pool)
        .complete(meeting_id, identity.user_id, duration_minutes)
        .await?;
    Ok(Json(meeting))
}

#[debug_handler]
pub(crate) async fn list_upcoming(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> CoreResult<Json<Vec<Meeting>>> {
    let meetings = MeetingLedger::new(db_pool)
        .list_upcoming(identity.user_id, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(meetings))
}
