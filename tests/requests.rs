mod common;

use common::{pool, tick, user};
use mentorlink::{
    CoreError,
    identity::Role,
    requests::{RequestStatus, RequestWorkflow},
};

#[tokio::test]
async fn second_active_request_conflicts() {
    let db = pool().await;
    let mentee = user(&db, "yb", Role::Yb).await;
    let mentor = user(&db, "mentor", Role::Mentor).await;
    let workflow = RequestWorkflow::new(db.clone());

    let first = workflow
        .submit(mentee, mentor, "please".to_owned(), Default::default())
        .await
        .unwrap();
    assert_eq!(first.status, RequestStatus::Pending);

    let while_pending = workflow
        .submit(mentee, mentor, "again".to_owned(), Default::default())
        .await;
    assert!(matches!(while_pending, Err(CoreError::Conflict(_))));

    workflow.accept(first.id, mentor, None, None).await.unwrap();

    let while_accepted = workflow
        .submit(mentee, mentor, "again".to_owned(), Default::default())
        .await;
    assert!(matches!(while_accepted, Err(CoreError::Conflict(_))));
}

#[tokio::test]
async fn rerequest_allowed_after_rejection() {
    let db = pool().await;
    let mentee = user(&db, "yb", Role::Yb).await;
    let mentor = user(&db, "mentor", Role::Mentor).await;
    let workflow = RequestWorkflow::new(db.clone());

    let first = workflow
        .submit(mentee, mentor, "please".to_owned(), Default::default())
        .await
        .unwrap();
    let rejected = workflow.reject(first.id, mentor).await.unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert!(rejected.responded_at.is_some());

    let second = workflow
        .submit(mentee, mentor, "once more".to_owned(), Default::default())
        .await
        .unwrap();
    assert_ne!(second.id, first.id);
}

#[tokio::test]
async fn cancel_is_mentee_only_and_pending_only() {
    let db = pool().await;
    let mentee = user(&db, "yb", Role::Yb).await;
    let mentor = user(&db, "mentor", Role::Mentor).await;
    let workflow = RequestWorkflow::new(db.clone());

    let request = workflow
        .submit(mentee, mentor, "please".to_owned(), Default::default())
        .await
        .unwrap();

    let by_mentor = workflow.cancel(request.id, mentor).await;
    assert!(matches!(by_mentor, Err(CoreError::Authorization(_))));

    let cancelled = workflow.cancel(request.id, mentee).await.unwrap();
    assert_eq!(cancelled.status, RequestStatus::Rejected);

    // The pair is free again immediately.
    let again = workflow
        .submit(mentee, mentor, "changed my mind".to_owned(), Default::default())
        .await
        .unwrap();
    workflow.accept(again.id, mentor, None, None).await.unwrap();

    let after_accept = workflow.cancel(again.id, mentee).await;
    assert!(matches!(after_accept, Err(CoreError::State(_))));
}

#[tokio::test]
async fn responding_checks_identity_then_state() {
    let db = pool().await;
    let mentee = user(&db, "yb", Role::Yb).await;
    let mentor = user(&db, "mentor", Role::Mentor).await;
    let other_mentor = user(&db, "other", Role::Mentor).await;
    let workflow = RequestWorkflow::new(db.clone());

    let request = workflow
        .submit(mentee, mentor, "please".to_owned(), Default::default())
        .await
        .unwrap();

    let wrong_accept = workflow.accept(request.id, other_mentor, None, None).await;
    assert!(matches!(wrong_accept, Err(CoreError::Authorization(_))));
    let wrong_reject = workflow.reject(request.id, other_mentor).await;
    assert!(matches!(wrong_reject, Err(CoreError::Authorization(_))));

    let accepted = workflow.accept(request.id, mentor, None, None).await.unwrap();
    assert_eq!(accepted.status, RequestStatus::Accepted);

    let twice = workflow.accept(request.id, mentor, None, None).await;
    assert!(matches!(twice, Err(CoreError::State(_))));
    let reject_after = workflow.reject(request.id, mentor).await;
    assert!(matches!(reject_after, Err(CoreError::State(_))));

    // Wrong identity still loses on a terminal request.
    let wrong_after = workflow.accept(request.id, other_mentor, None, None).await;
    assert!(matches!(wrong_after, Err(CoreError::Authorization(_))));
}

#[tokio::test]
async fn submit_enforces_roles() {
    let db = pool().await;
    let mentee = user(&db, "yb", Role::Yb).await;
    let mentor = user(&db, "mentor", Role::Mentor).await;
    let other_mentor = user(&db, "other", Role::Mentor).await;
    let workflow = RequestWorkflow::new(db.clone());

    let to_non_mentor = workflow
        .submit(mentor, mentee, "hi".to_owned(), Default::default())
        .await;
    assert!(matches!(to_non_mentor, Err(CoreError::Role(_))));

    let from_mentor = workflow
        .submit(other_mentor, mentor, "hi".to_owned(), Default::default())
        .await;
    assert!(matches!(from_mentor, Err(CoreError::Role(_))));

    let to_self = workflow
        .submit(mentor, mentor, "hi".to_owned(), Default::default())
        .await;
    assert!(matches!(to_self, Err(CoreError::Validation(_))));

    let unknown = workflow
        .submit(mentee, uuid::Uuid::now_v7(), "hi".to_owned(), Default::default())
        .await;
    assert!(matches!(unknown, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn received_list_is_newest_first_and_filterable() {
    let db = pool().await;
    let first_mentee = user(&db, "a", Role::Yb).await;
    let second_mentee = user(&db, "b", Role::Ob).await;
    let mentor = user(&db, "mentor", Role::Mentor).await;
    let workflow = RequestWorkflow::new(db.clone());

    let first = workflow
        .submit(first_mentee, mentor, "first".to_owned(), Default::default())
        .await
        .unwrap();
    tick().await;
    let second = workflow
        .submit(second_mentee, mentor, "second".to_owned(), Default::default())
        .await
        .unwrap();

    let all = workflow.list_received(mentor, None).await.unwrap();
    assert_eq!(
        all.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );

    workflow.accept(first.id, mentor, None, None).await.unwrap();

    let pending = workflow
        .list_received(mentor, Some(RequestStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);

    let accepted = workflow
        .list_received(mentor, Some(RequestStatus::Accepted))
        .await
        .unwrap();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].id, first.id);

    let sent = workflow.list_sent(first_mentee).await.unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, first.id);
}

#[tokio::test]
async fn active_mentees_are_accepted_requesters() {
    let db = pool().await;
    let first_mentee = user(&db, "a", Role::Yb).await;
    let second_mentee = user(&db, "b", Role::Ob).await;
    let third_mentee = user(&db, "c", Role::YbLeader).await;
    let mentor = user(&db, "mentor", Role::Mentor).await;
    let workflow = RequestWorkflow::new(db.clone());

    for mentee in [first_mentee, second_mentee] {
        let request = workflow
            .submit(mentee, mentor, "hi".to_owned(), Default::default())
            .await
            .unwrap();
        workflow.accept(request.id, mentor, None, None).await.unwrap();
    }
    // Still pending: not active.
    workflow
        .submit(third_mentee, mentor, "hi".to_owned(), Default::default())
        .await
        .unwrap();

    let mut mentees = workflow.list_active_mentees(mentor).await.unwrap();
    mentees.sort();
    let mut expected = vec![first_mentee, second_mentee];
    expected.sort();
    assert_eq!(mentees, expected);
}
