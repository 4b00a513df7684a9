mod gate;

pub use gate::{ChatGate, ChatMessage, ChatRoom, RoomKind};

use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{AppState, CoreResult, identity::Identity};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dm/{user_id}", post(open_direct_room))
        .route("/{room_id}/messages", get(list_messages).post(post_message))
        .route("/{room_id}/read", post(mark_read))
        .route("/{room_id}/unread", get(unread_count))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn open_direct_room(
    State(db_pool): State<SqlitePool>,
    State(delivery): State<broadcast::Sender<ChatMessage>>,
    identity: Identity,
    Path(user_id): Path<Uuid>,
) -> CoreResult<Json<ChatRoom>> {
    // 200 rather than 201: the call is idempotent and usually returns a
    // room that already exists.
    let room = ChatGate::new(db_pool, delivery)
        .open_direct_room(identity.user_id, user_id)
        .await?;
    Ok(Json(room))
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostMessageBody {
    body: Option<String>,
    file_refs: Option<Vec<String>>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_message(
    State(db_pool): State<SqlitePool>,
    State(delivery): State<broadcast::Sender<ChatMessage>>,
    identity: Identity,
    Path(room_id): Path<Uuid>,
    Json(PostMessageBody { body, file_refs }): Json<PostMessageBody>,
) -> CoreResult<(StatusCode, Json<ChatMessage>)> {
    let message = ChatGate::new(db_pool, delivery)
        .post_message(room_id, identity.user_id, body, file_refs)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesQuery {
    before: Option<Uuid>,
    #[serde(default = "default_page_size")]
    limit: i64,
}

fn default_page_size() -> i64 {
    30
}

#[derive(Debug, Serialize)]
pub(crate) struct MessagePage {
    messages: Vec<ChatMessage>,
    has_more: bool,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_messages(
    State(db_pool): State<SqlitePool>,
    State(delivery): State<broadcast::Sender<ChatMessage>>,
    identity: Identity,
    Path(room_id): Path<Uuid>,
    Query(MessagesQuery { before, limit }): Query<MessagesQuery>,
) -> CoreResult<Json<MessagePage>> {
    let (messages, has_more) = ChatGate::new(db_pool, delivery)
        .list_messages(room_id, identity.user_id, before, limit)
        .await?;
    Ok(Json(MessagePage { messages, has_more }))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn mark_read(
    State(db_pool): State<SqlitePool>,
    State(delivery): State<broadcast::Sender<ChatMessage>>,
    identity: Identity,
    Path(room_id): Path<Uuid>,
) -> CoreResult<StatusCode> {
    ChatGate::new(db_pool, delivery)
        .mark_read(room_id, identity.user_id)
        .await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Serialize)]
pub(crate) struct UnreadCount {
    unread: i64,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn unread_count(
    State(db_pool): State<SqlitePool>,
    State(delivery): State<broadcast::Sender<ChatMessage>>,
    identity: Identity,
    Path(room_id): Path<Uuid>,
) -> CoreResult<Json<UnreadCount>> {
    let unread = ChatGate::new(db_pool, delivery)
        .unread_count(room_id, identity.user_id)
        .await?;
    Ok(Json(UnreadCount { unread }))
}
