//! Storage seam for the follow graph and ad reviews.
//!
//! Each store has a PostgreSQL implementation (source of truth) and an
//! in-process implementation used by tests and local development. Uniqueness
//! of (follower, following), (author, ad) and (review, user) is enforced by
//! the store itself, never by a read-then-write in the caller.

pub mod follows;
pub mod memory;
pub mod reviews;

pub use follows::PgFollowRepository;
pub use memory::MemoryStore;
pub use reviews::PgReviewRepository;

use crate::domain::{
    FollowEdge, RatingSummary, Reaction, ReactionType, Review, ReviewView, UserSummary,
};
use crate::error::{AppError, Result};

#[async_trait::async_trait]
pub trait FollowRepository: Send + Sync {
    /// Insert an edge. Returns `None` if the edge already exists.
    async fn insert_follow(&self, follower_id: i64, following_id: i64)
        -> Result<Option<FollowEdge>>;

    /// Delete an edge. Returns whether a row was removed.
    async fn delete_follow(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    async fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    /// Users following `user_id`, most recent first.
    /// Returns: (page of users, total_count)
    async fn list_followers(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<UserSummary>, i64)>;

    /// Users `user_id` follows, most recent first.
    /// Returns: (page of users, total_count)
    async fn list_following(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<UserSummary>, i64)>;

    async fn count_followers(&self, user_id: i64) -> Result<i64>;

    async fn count_following(&self, user_id: i64) -> Result<i64>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review. Returns `None` if the author already reviewed the ad.
    async fn insert_review(
        &self,
        author_id: i64,
        ad_id: i64,
        rating: i16,
        body: Option<String>,
    ) -> Result<Option<Review>>;

    async fn find_review(&self, review_id: i64) -> Result<Option<Review>>;

    async fn find_review_view(&self, review_id: i64) -> Result<Option<ReviewView>>;

    async fn find_by_author_and_ad(&self, author_id: i64, ad_id: i64) -> Result<Option<Review>>;

    /// Apply a partial update. `body: Some(None)` clears the body.
    async fn update_review(
        &self,
        review_id: i64,
        rating: Option<i16>,
        body: Option<Option<String>>,
    ) -> Result<Option<Review>>;

    /// Delete a review owned by `author_id` together with its reactions.
    async fn delete_review(&self, review_id: i64, author_id: i64) -> Result<bool>;

    /// Reviews of an ad, newest first. Returns: (page, total_count)
    async fn list_for_ad(
        &self,
        ad_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReviewView>, i64)>;

    /// Reviews written by a user, newest first. Returns: (page, total_count)
    async fn list_by_author(
        &self,
        author_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReviewView>, i64)>;

    async fn rating_for_ad(&self, ad_id: i64) -> Result<RatingSummary>;

    /// Insert or replace the caller's reaction on a review.
    /// Fails with `NotFound` if the review does not exist.
    async fn upsert_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction_type: ReactionType,
    ) -> Result<Reaction>;

    async fn delete_reaction(&self, review_id: i64, user_id: i64) -> Result<bool>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Map a foreign-key violation to `NotFound`. The message is picked by the
/// first `(column, message)` pair whose column appears in the violated
/// constraint's name; everything else stays a database error.
pub(crate) fn map_fk_violation(
    err: sqlx::Error,
    messages: &[(&str, &str)],
    fallback: &str,
) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            let constraint = db.constraint().unwrap_or_default();
            let message = messages
                .iter()
                .find(|(column, _)| constraint.contains(column))
                .map(|(_, message)| *message)
                .unwrap_or(fallback);
            AppError::NotFound(message.to_string())
        }
        _ => AppError::Database(err),
    }
}
