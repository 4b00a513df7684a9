#![allow(dead_code)]

use mentorlink::{
    chat::ChatMessage,
    connections::ConnectionLedger,
    identity::{self, Role},
    requests::RequestWorkflow,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;
use uuid::Uuid;

pub async fn pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    mentorlink::db::init(&pool).await.unwrap();
    pool
}

pub async fn user(pool: &SqlitePool, name: &str, role: Role) -> Uuid {
    let id = Uuid::now_v7();
    identity::upsert(pool, id, name, role).await.unwrap();
    id
}

pub fn in_minutes(minutes: i64) -> OffsetDateTime {
    OffsetDateTime::now_utc() + Duration::minutes(minutes)
}

/// Submit-and-accept so the pair has an established mentoring relationship.
pub async fn establish_mentoring(pool: &SqlitePool, mentee: Uuid, mentor: Uuid) {
    let workflow = RequestWorkflow::new(pool.clone());
    let request = workflow
        .submit(mentee, mentor, "hello".to_owned(), Default::default())
        .await
        .unwrap();
    workflow.accept(request.id, mentor, None, None).await.unwrap();
}

/// Follow-and-accept so the pair is mutually connected.
pub async fn befriend(pool: &SqlitePool, a: Uuid, b: Uuid) {
    let ledger = ConnectionLedger::new(pool.clone());
    ledger.follow(a, b).await.unwrap();
    ledger.accept(a, b, b).await.unwrap();
}

pub fn delivery() -> broadcast::Sender<ChatMessage> {
    broadcast::channel(16).0
}

/// Timestamps persist at subsecond precision, so a short pause is enough
/// to separate writes whose relative order a test asserts on.
pub async fn tick() {
    tokio::time::sleep(std::time::Duration::from_millis(15)).await;
}
