mod workflow;

pub use workflow::{
    MeetingMethod, MentoringRequest, RequestPreferences, RequestStatus, RequestWorkflow, TimeSlot,
};

use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
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
        .route("/", post(submit))
        .route("/sent", get(list_sent))
        .route("/received", get(list_received))
        .route("/mentees", get(list_active_mentees))
        .route("/{id}/accept", post(accept))
        .route("/{id}/reject", post(reject))
        .route("/{id}/cancel", post(cancel))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitBody {
    mentor_id: Uuid,
    message: String,
    #[serde(flatten)]
    prefs: RequestPreferences,
}

#[debug_handler]
pub(crate) async fn submit(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Json(SubmitBody {
        mentor_id,
        message,
        prefs,
    }): Json<SubmitBody>,
) -> CoreResult<(StatusCode, Json<MentoringRequest>)> {
    let request = RequestWorkflow::new(db_pool)
        .submit(identity.user_id, mentor_id, message, prefs)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct AcceptBody {
    scheduled_at: Option<OffsetDateTime>,
    meeting_method: Option<MeetingMethod>,
}

#[debug_handler]
pub(crate) async fn accept(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(request_id): Path<Uuid>,
    Json(body): Json<AcceptBody>,
) -> CoreResult<Json<MentoringRequest>> {
    let request = RequestWorkflow::new(db_pool)
        .accept(
            request_id,
            identity.user_id,
            body.scheduled_at,
            body.meeting_method,
        )
        .await?;
    Ok(Json(request))
}

#[debug_handler]
pub(crate) async fn reject(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(request_id): Path<Uuid>,
) -> CoreResult<Json<MentoringRequest>> {
    let request = RequestWorkflow::new(db_pool)
        .reject(request_id, identity.user_id)
        .await?;
    Ok(Json(request))
}

#[debug_handler]
pub(crate) async fn cancel(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(request_id): Path<Uuid>,
) -> CoreResult<Json<MentoringRequest>> {
    let request = RequestWorkflow::new(db_pool)
        .cancel(request_id, identity.user_id)
        .await?;
    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReceivedQuery {
    status: Option<RequestStatus>,
}

#[debug_handler]
pub(crate) async fn list_received(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Query(ReceivedQuery { status }): Query<ReceivedQuery>,
) -> CoreResult<Json<Vec<MentoringRequest>>> {
    let requests = RequestWorkflow::new(db_pool)
        .list_received(identity.user_id, status)
        .await?;
    Ok(Json(requests))
}

#[debug_handler]
pub(crate) async fn list_sent(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> CoreResult<Json<Vec<MentoringRequest>>> {
    let requests = RequestWorkflow::new(db_pool)
        .list_sent(identity.user_id)
        .await?;
    Ok(Json(requests))
}

#[debug_handler]
pub(crate) async fn list_active_mentees(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> CoreResult<Json<Vec<Uuid>>> {
    let mentees = RequestWorkflow::new(db_pool)
        .list_active_mentees(identity.user_id)
        .await?;
    Ok(Json(mentees))
}
