pub mod chat;
pub mod connections;
pub mod db;
pub mod engagement;
pub mod error;
pub mod identity;
pub mod matching;
pub mod meetings;
pub mod requests;

use axum::extract::FromRef;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::chat::ChatMessage;

pub use error::{CoreError, CoreResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub delivery: broadcast::Sender<ChatMessage>,
}
