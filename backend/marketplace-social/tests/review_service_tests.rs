mod common;

use common::{review_service, seeded_store};
use marketplace_social::domain::{ReactionType, ReviewPatch};
use marketplace_social::AppError;

const AD: i64 = 100;
const OTHER_AD: i64 = 101;

#[tokio::test]
async fn second_review_of_same_ad_conflicts() {
    let svc = review_service(seeded_store(1, 2).await);

    let review = svc
        .create_review(1, AD, 4, Some("Great seller".into()))
        .await
        .unwrap();
    assert_eq!(review.rating, 4);
    assert_eq!(review.body.as_deref(), Some("Great seller"));

    let err = svc.create_review(1, AD, 2, None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // A different ad is a different pair.
    assert!(svc.create_review(1, OTHER_AD, 2, None).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reviews_by_one_author_yield_one_row() {
    let svc = review_service(seeded_store(1, 1).await);

    let mut handles = Vec::new();
    for rating in 1..=5 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.create_review(1, AD, rating, None).await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!((created, conflicts), (1, 4));
    assert_eq!(svc.get_rating_for_ad(AD).await.unwrap().count, 1);
}

#[tokio::test]
async fn rating_and_body_bounds_are_enforced() {
    let svc = review_service(seeded_store(1, 1).await);

    for rating in [0, 6, -1] {
        let err = svc.create_review(1, AD, rating, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "rating {}", rating);
    }

    let too_long = "x".repeat(2001);
    let err = svc
        .create_review(1, AD, 3, Some(too_long))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let review = svc
        .create_review(1, AD, 3, Some("   ".into()))
        .await
        .unwrap();
    assert_eq!(review.body, None);
}

#[tokio::test]
async fn reviewing_an_unknown_ad_is_not_found() {
    let svc = review_service(seeded_store(1, 1).await);

    let err = svc.create_review(1, 555, 5, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m == "Ad not found"));
}

#[tokio::test]
async fn only_the_author_may_update_or_delete() {
    let svc = review_service(seeded_store(2, 1).await);
    let review = svc.create_review(1, AD, 5, None).await.unwrap();

    let patch = ReviewPatch {
        rating: Some(1),
        body: None,
    };
    let err = svc
        .update_review(review.id, 2, patch.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = svc.delete_review(review.id, 2).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Untouched by the rejected attempts.
    assert_eq!(svc.get_review(review.id).await.unwrap().review.rating, 5);

    let err = svc.update_review(9_999, 1, patch).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn update_applies_partial_patches() {
    let svc = review_service(seeded_store(1, 1).await);
    let review = svc
        .create_review(1, AD, 5, Some("first impression".into()))
        .await
        .unwrap();

    let updated = svc
        .update_review(
            review.id,
            1,
            ReviewPatch {
                rating: Some(3),
                body: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.rating, 3);
    assert_eq!(updated.body.as_deref(), Some("first impression"));
    assert!(updated.updated_at >= review.updated_at);

    let cleared = svc
        .update_review(
            review.id,
            1,
            ReviewPatch {
                rating: None,
                body: Some(String::new()),
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.rating, 3);
    assert_eq!(cleared.body, None);

    let err = svc
        .update_review(
            review.id,
            1,
            ReviewPatch {
                rating: Some(9),
                body: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn rating_is_the_mean_of_all_reviews() {
    let svc = review_service(seeded_store(4, 2).await);

    for (author, rating) in [(1, 5), (2, 4), (3, 4), (4, 2)] {
        svc.create_review(author, AD, rating, None).await.unwrap();
    }

    let summary = svc.get_rating_for_ad(AD).await.unwrap();
    assert_eq!(summary.count, 4);
    assert!((summary.average - 3.75).abs() < f64::EPSILON);

    let empty = svc.get_rating_for_ad(OTHER_AD).await.unwrap();
    assert_eq!(empty.count, 0);
    assert_eq!(empty.average, 0.0);
}

#[tokio::test]
async fn reacting_again_replaces_the_reaction() {
    let store = seeded_store(2, 1).await;
    let svc = review_service(store.clone());
    let review = svc.create_review(1, AD, 5, None).await.unwrap();

    svc.add_reaction(review.id, 2, ReactionType::Helpful)
        .await
        .unwrap();
    let replaced = svc
        .add_reaction(review.id, 2, ReactionType::NotHelpful)
        .await
        .unwrap();
    assert_eq!(replaced.reaction_type, ReactionType::NotHelpful);
    assert_eq!(store.reaction_count(review.id).await, 1);

    let view = svc.get_review(review.id).await.unwrap();
    assert_eq!((view.helpful_count, view.not_helpful_count), (0, 1));
}

#[tokio::test]
async fn reacting_to_a_missing_review_is_not_found() {
    let svc = review_service(seeded_store(1, 1).await);

    let err = svc
        .add_reaction(42, 1, ReactionType::Helpful)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m == "Review not found"));
}

#[tokio::test]
async fn removing_a_reaction_reports_whether_one_existed() {
    let svc = review_service(seeded_store(2, 1).await);
    let review = svc.create_review(1, AD, 4, None).await.unwrap();

    assert!(!svc.remove_reaction(review.id, 2).await.unwrap());
    svc.add_reaction(review.id, 2, ReactionType::Helpful)
        .await
        .unwrap();
    assert!(svc.remove_reaction(review.id, 2).await.unwrap());
    assert_eq!(svc.get_review(review.id).await.unwrap().helpful_count, 0);
}

#[tokio::test]
async fn deleting_a_review_removes_its_reactions() {
    let store = seeded_store(3, 1).await;
    let svc = review_service(store.clone());
    let review = svc.create_review(1, AD, 4, None).await.unwrap();
    svc.add_reaction(review.id, 2, ReactionType::Helpful)
        .await
        .unwrap();
    svc.add_reaction(review.id, 3, ReactionType::NotHelpful)
        .await
        .unwrap();

    assert!(svc.delete_review(review.id, 1).await.unwrap());
    assert_eq!(store.reaction_count(review.id).await, 0);
    assert!(matches!(
        svc.get_review(review.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(svc.get_my_review(1, AD).await.unwrap().is_none());
}

#[tokio::test]
async fn my_review_and_listings() {
    let svc = review_service(seeded_store(3, 2).await);

    assert!(svc.get_my_review(1, AD).await.unwrap().is_none());

    let first = svc.create_review(1, AD, 5, None).await.unwrap();
    let second = svc.create_review(2, AD, 3, None).await.unwrap();
    svc.create_review(1, OTHER_AD, 4, None).await.unwrap();

    assert_eq!(svc.get_my_review(1, AD).await.unwrap().unwrap().id, first.id);

    let for_ad = svc.get_reviews_for_ad(AD, None, None).await.unwrap();
    assert_eq!(for_ad.total, 2);
    assert_eq!(for_ad.limit, 10);
    let ids: Vec<i64> = for_ad.items.iter().map(|v| v.review.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(for_ad.items[0].author_name.as_deref(), Some("user 2"));

    let by_user = svc.get_reviews_by_user(1, None, None).await.unwrap();
    assert_eq!(by_user.total, 2);
    assert!(by_user.items.iter().all(|v| v.review.author_id == 1));

    let beyond = svc.get_reviews_by_user(1, Some(5), Some(10)).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 2);
}
