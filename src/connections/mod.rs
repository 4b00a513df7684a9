mod ledger;

pub use ledger::{ConnectionLedger, Follow, FollowStatus};

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppState, CoreResult, identity::Identity};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", post(follow).delete(unfollow))
        .route("/{user_id}/accept", post(accept))
        .route("/{user_id}/reject", post(reject))
        .route("/{user_id}/status", get(status_between))
}

#[debug_handler]
pub(crate) async fn follow(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(user_id): Path<Uuid>,
) -> CoreResult<(StatusCode, Json<Follow>)> {
    let edge = ConnectionLedger::new(db_pool)
        .follow(identity.user_id, user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

#[debug_handler]
pub(crate) async fn accept(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(user_id): Path<Uuid>,
) -> CoreResult<Json<Follow>> {
    let edge = ConnectionLedger::new(db_pool)
        .accept(user_id, identity.user_id, identity.user_id)
        .await?;
    Ok(Json(edge))
}

#[debug_handler]
pub(crate) async fn reject(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(user_id): Path<Uuid>,
) -> CoreResult<Json<Follow>> {
    let edge = ConnectionLedger::new(db_pool)
        .reject(user_id, identity.user_id, identity.user_id)
        .await?;
    Ok(Json(edge))
}

#[debug_handler]
pub(crate) async fn unfollow(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(user_id): Path<Uuid>,
) -> CoreResult<StatusCode> {
    ConnectionLedger::new(db_pool)
        .unfollow(identity.user_id, user_id)
        .await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Serialize)]
pub(crate) struct ConnectionStatus {
    status: Option<FollowStatus>,
    is_mutual: bool,
}

#[debug_handler]
pub(crate) async fn status_between(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Path(user_id): Path<Uuid>,
) -> CoreResult<Json<ConnectionStatus>> {
    let ledger = ConnectionLedger::new(db_pool);
    let status = ledger.status_between(identity.user_id, user_id).await?;
    let is_mutual = ledger.is_mutual(identity.user_id, user_id).await?;
    Ok(Json(ConnectionStatus { status, is_mutual }))
}
