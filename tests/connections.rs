mod common;

use common::{pool, user};
use mentorlink::{
    CoreError,
    connections::{ConnectionLedger, FollowStatus},
    identity::Role,
};

#[tokio::test]
async fn follow_is_idempotent_over_the_pair() {
    let db = pool().await;
    let a = user(&db, "a", Role::Yb).await;
    let b = user(&db, "b", Role::Ob).await;
    let ledger = ConnectionLedger::new(db.clone());

    let edge = ledger.follow(a, b).await.unwrap();
    assert_eq!(edge.status, FollowStatus::Pending);

    let repeat = ledger.follow(a, b).await.unwrap();
    assert_eq!(repeat.id, edge.id);

    // Reverse direction also resolves to the existing edge.
    let reverse = ledger.follow(b, a).await.unwrap();
    assert_eq!(reverse.id, edge.id);

    let to_self = ledger.follow(a, a).await;
    assert!(matches!(to_self, Err(CoreError::Validation(_))));
}

#[tokio::test]
async fn accept_is_receiver_only_and_pending_only() {
    let db = pool().await;
    let a = user(&db, "a", Role::Yb).await;
    let b = user(&db, "b", Role::Ob).await;
    let c = user(&db, "c", Role::Yb).await;
    let ledger = ConnectionLedger::new(db.clone());

    ledger.follow(a, b).await.unwrap();

    let by_requester = ledger.accept(a, b, a).await;
    assert!(matches!(by_requester, Err(CoreError::Authorization(_))));

    let missing = ledger.accept(c, b, b).await;
    assert!(matches!(missing, Err(CoreError::NotFound(_))));

    let accepted = ledger.accept(a, b, b).await.unwrap();
    assert_eq!(accepted.status, FollowStatus::Accepted);
    assert!(accepted.accepted_at.is_some());

    let twice = ledger.accept(a, b, b).await;
    assert!(matches!(twice, Err(CoreError::State(_))));
}

#[tokio::test]
async fn acceptance_establishes_mutuality() {
    let db = pool().await;
    let a = user(&db, "a", Role::Yb).await;
    let b = user(&db, "b", Role::Ob).await;
    let ledger = ConnectionLedger::new(db.clone());

    ledger.follow(a, b).await.unwrap();
    assert!(!ledger.is_mutual(a, b).await.unwrap());

    ledger.accept(a, b, b).await.unwrap();

    // Both directed edges exist and are accepted afterwards.
    assert!(ledger.is_mutual(a, b).await.unwrap());
    assert!(ledger.is_mutual(b, a).await.unwrap());
    assert_eq!(
        ledger.status_between(a, b).await.unwrap(),
        Some(FollowStatus::Accepted)
    );
}

#[tokio::test]
async fn rejection_is_terminal_for_the_edge() {
    let db = pool().await;
    let a = user(&db, "a", Role::Yb).await;
    let b = user(&db, "b", Role::Ob).await;
    let ledger = ConnectionLedger::new(db.clone());

    ledger.follow(a, b).await.unwrap();
    let rejected = ledger.reject(a, b, b).await.unwrap();
    assert_eq!(rejected.status, FollowStatus::Rejected);
    assert!(!ledger.is_mutual(a, b).await.unwrap());

    let again = ledger.reject(a, b, b).await;
    assert!(matches!(again, Err(CoreError::State(_))));

    // Rejection does not block a later attempt; it starts a fresh request.
    let retry = ledger.follow(b, a).await.unwrap();
    assert_ne!(retry.id, rejected.id);
    assert_eq!(retry.status, FollowStatus::Pending);
    assert_eq!(retry.requester_id, b);
}

#[tokio::test]
async fn refollow_swaps_the_rejected_edge_in_one_step() {
    let db = pool().await;
    let a = user(&db, "a", Role::Yb).await;
    let b = user(&db, "b", Role::Ob).await;
    let ledger = ConnectionLedger::new(db.clone());

    ledger.follow(a, b).await.unwrap();
    ledger.reject(a, b, b).await.unwrap();
    let retry = ledger.follow(b, a).await.unwrap();
    assert_eq!(retry.requester_id, b);

    // Replacement is a single commit: the pair ends up with exactly one
    // edge, never zero.
    let edges: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows \
         WHERE (requester_id=? AND receiver_id=?) OR (requester_id=? AND receiver_id=?)",
    )
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(edges, 1);
    assert_eq!(
        ledger.status_between(a, b).await.unwrap(),
        Some(FollowStatus::Pending)
    );
}

#[tokio::test]
async fn unfollow_severs_both_directions() {
    let db = pool().await;
    let a = user(&db, "a", Role::Yb).await;
    let b = user(&db, "b", Role::Ob).await;
    let ledger = ConnectionLedger::new(db.clone());

    ledger.follow(a, b).await.unwrap();
    ledger.accept(a, b, b).await.unwrap();
    assert!(ledger.is_mutual(a, b).await.unwrap());

    ledger.unfollow(b, a).await.unwrap();
    assert!(!ledger.is_mutual(a, b).await.unwrap());
    assert_eq!(ledger.status_between(a, b).await.unwrap(), None);

    let nothing_left = ledger.unfollow(a, b).await;
    assert!(matches!(nothing_left, Err(CoreError::NotFound(_))));
}
