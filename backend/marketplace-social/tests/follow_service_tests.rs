mod common;

use common::{follow_service, seeded_store};
use marketplace_social::AppError;

#[tokio::test]
async fn follow_twice_returns_edge_then_none() {
    let svc = follow_service(seeded_store(2, 0).await);

    let first = svc.follow(1, 2).await.unwrap();
    let edge = first.expect("first follow creates the edge");
    assert_eq!((edge.follower_id, edge.following_id), (1, 2));

    assert!(svc.follow(1, 2).await.unwrap().is_none());
    assert_eq!(svc.get_counts(2).await.unwrap().followers_count, 1);
}

#[tokio::test]
async fn self_follow_is_a_validation_error() {
    let svc = follow_service(seeded_store(3, 0).await);

    for user in 1..=3 {
        let err = svc.follow(user, user).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Cannot follow yourself"));
        assert!(!svc.is_following(user, user).await.unwrap());
    }
}

#[tokio::test]
async fn unfollow_reports_whether_an_edge_existed() {
    let svc = follow_service(seeded_store(2, 0).await);

    assert!(!svc.unfollow(1, 2).await.unwrap());

    svc.follow(1, 2).await.unwrap();
    assert!(svc.unfollow(1, 2).await.unwrap());
    assert!(!svc.is_following(1, 2).await.unwrap());
    assert!(!svc.unfollow(1, 2).await.unwrap());
}

#[tokio::test]
async fn counts_track_distinct_followers() {
    let svc = follow_service(seeded_store(6, 0).await);

    for follower in 2..=6 {
        svc.follow(follower, 1).await.unwrap();
    }

    let counts = svc.get_counts(1).await.unwrap();
    assert_eq!(counts.followers_count, 5);
    assert_eq!(counts.following_count, 0);
    assert_eq!(svc.get_counts(2).await.unwrap().following_count, 1);
}

#[tokio::test]
async fn follow_direction_matters() {
    let svc = follow_service(seeded_store(2, 0).await);

    svc.follow(1, 2).await.unwrap();
    assert!(svc.is_following(1, 2).await.unwrap());
    assert!(!svc.is_following(2, 1).await.unwrap());

    let following = svc.list_following(1, None, None).await.unwrap();
    assert_eq!(following.items.len(), 1);
    assert_eq!(following.items[0].id, 2);
    assert_eq!(svc.list_followers(1, None, None).await.unwrap().total, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_follows_create_exactly_one_edge() {
    let svc = follow_service(seeded_store(2, 0).await);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move { svc.follow(1, 2).await }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(svc.get_counts(2).await.unwrap().followers_count, 1);
}

#[tokio::test]
async fn follower_pages_are_newest_first() {
    // User 1 is followed by users 2..=26, in that order.
    let svc = follow_service(seeded_store(26, 0).await);
    for follower in 2..=26 {
        svc.follow(follower, 1).await.unwrap();
    }

    let page = svc.list_followers(1, Some(2), Some(10)).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.page, 2);
    assert!(page.has_more);
    let ids: Vec<i64> = page.items.iter().map(|u| u.id).collect();
    // Items 11..=20 of the newest-first ordering: followers 16 down to 7.
    assert_eq!(ids, (7..=16).rev().collect::<Vec<_>>());

    let last = svc.list_followers(1, Some(3), Some(10)).await.unwrap();
    assert_eq!(last.items.len(), 5);
    assert!(!last.has_more);

    let beyond = svc.list_followers(1, Some(9), Some(10)).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 25);
}

#[tokio::test]
async fn pagination_parameters_are_clamped() {
    let svc = follow_service(seeded_store(3, 0).await);
    svc.follow(2, 1).await.unwrap();
    svc.follow(3, 1).await.unwrap();

    let defaults = svc.list_followers(1, None, None).await.unwrap();
    assert_eq!((defaults.page, defaults.limit), (1, 20));

    let clamped = svc.list_followers(1, Some(-4), Some(1_000)).await.unwrap();
    assert_eq!((clamped.page, clamped.limit), (1, 100));

    let tiny = svc.list_followers(1, Some(1), Some(0)).await.unwrap();
    assert_eq!(tiny.limit, 1);
    assert_eq!(tiny.items.len(), 1);
    assert!(tiny.has_more);
}

#[tokio::test]
async fn status_combines_relationship_and_counts() {
    let svc = follow_service(seeded_store(3, 0).await);
    svc.follow(1, 2).await.unwrap();
    svc.follow(3, 2).await.unwrap();
    svc.follow(2, 3).await.unwrap();

    let status = svc.status(1, 2).await.unwrap();
    assert!(status.is_following);
    assert_eq!(status.counts.followers_count, 2);
    assert_eq!(status.counts.following_count, 1);

    assert!(!svc.status(3, 1).await.unwrap().is_following);
}

#[tokio::test]
async fn following_an_unknown_user_is_not_found() {
    let svc = follow_service(seeded_store(1, 0).await);

    let err = svc.follow(1, 999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
