use crate::config::{PaginationConfig, ReviewRules};
use crate::domain::{
    Page, PageRequest, RatingSummary, Reaction, ReactionType, Review, ReviewPatch, ReviewView,
};
use crate::error::{AppError, Result};
use crate::metrics::record_review;
use crate::repository::ReviewRepository;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One review per user per ad, with reactions and aggregate rating.
#[derive(Clone)]
pub struct ReviewService {
    repo: Arc<dyn ReviewRepository>,
    rules: ReviewRules,
    pagination: PaginationConfig,
}

impl ReviewService {
    pub fn new(
        repo: Arc<dyn ReviewRepository>,
        rules: ReviewRules,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            repo,
            rules,
            pagination,
        }
    }

    pub fn rules(&self) -> &ReviewRules {
        &self.rules
    }

    pub async fn create_review(
        &self,
        author_id: i64,
        ad_id: i64,
        rating: i16,
        body: Option<String>,
    ) -> Result<Review> {
        self.check_rating(rating)?;
        let body = self.normalize_body(body)?;

        // None: unique (author, ad) violated.
        let Some(review) = self.repo.insert_review(author_id, ad_id, rating, body).await? else {
            record_review("create", "duplicate");
            return Err(AppError::Conflict(
                "You have already reviewed this ad".to_string(),
            ));
        };

        record_review("create", "created");
        info!(review_id = review.id, author_id, ad_id, rating, "review created");
        Ok(review)
    }

    pub async fn update_review(
        &self,
        review_id: i64,
        author_id: i64,
        patch: ReviewPatch,
    ) -> Result<Review> {
        if patch.is_empty() {
            return Err(AppError::Validation(
                "Nothing to update: provide rating or body".to_string(),
            ));
        }
        if let Some(rating) = patch.rating {
            self.check_rating(rating)?;
        }
        let body = match patch.body {
            Some(body) => Some(self.normalize_body(Some(body))?),
            None => None,
        };

        self.authorize(review_id, author_id, "update").await?;

        let review = self
            .repo
            .update_review(review_id, patch.rating, body)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        record_review("update", "updated");
        info!(review_id, author_id, "review updated");
        Ok(review)
    }

    pub async fn delete_review(&self, review_id: i64, author_id: i64) -> Result<bool> {
        self.authorize(review_id, author_id, "delete").await?;

        let deleted = self.repo.delete_review(review_id, author_id).await?;
        if deleted {
            record_review("delete", "deleted");
            info!(review_id, author_id, "review deleted");
        } else {
            record_review("delete", "missing");
        }
        Ok(deleted)
    }

    pub async fn get_review(&self, review_id: i64) -> Result<ReviewView> {
        self.repo
            .find_review_view(review_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))
    }

    pub async fn get_reviews_for_ad(
        &self,
        ad_id: i64,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Page<ReviewView>> {
        let request = self.page_request(page, limit);
        let (reviews, total) = self
            .repo
            .list_for_ad(ad_id, request.limit, request.offset())
            .await?;
        Ok(Page::new(reviews, total, request))
    }

    pub async fn get_reviews_by_user(
        &self,
        user_id: i64,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Page<ReviewView>> {
        let request = self.page_request(page, limit);
        let (reviews, total) = self
            .repo
            .list_by_author(user_id, request.limit, request.offset())
            .await?;
        Ok(Page::new(reviews, total, request))
    }

    pub async fn get_rating_for_ad(&self, ad_id: i64) -> Result<RatingSummary> {
        self.repo.rating_for_ad(ad_id).await
    }

    pub async fn get_my_review(&self, author_id: i64, ad_id: i64) -> Result<Option<Review>> {
        self.repo.find_by_author_and_ad(author_id, ad_id).await
    }

    /// Set the caller's reaction, replacing any previous one.
    pub async fn add_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction_type: ReactionType,
    ) -> Result<Reaction> {
        let reaction = self
            .repo
            .upsert_reaction(review_id, user_id, reaction_type)
            .await
            .inspect_err(|_| record_review("react", "failed"))?;

        record_review("react", reaction_type.as_db_str());
        debug!(review_id, user_id, reaction = %reaction_type, "reaction stored");
        Ok(reaction)
    }

    pub async fn remove_reaction(&self, review_id: i64, user_id: i64) -> Result<bool> {
        let removed = self.repo.delete_reaction(review_id, user_id).await?;
        record_review("unreact", if removed { "removed" } else { "missing" });
        Ok(removed)
    }

    pub async fn health_check(&self) -> Result<()> {
        self.repo.health_check().await
    }

    async fn authorize(&self, review_id: i64, user_id: i64, operation: &str) -> Result<Review> {
        let review = self
            .repo
            .find_review(review_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        if review.author_id != user_id {
            record_review(operation, "forbidden");
            warn!(review_id, user_id, operation, "non-author attempted to modify review");
            return Err(AppError::Forbidden(format!(
                "Not authorized to {} this review",
                operation
            )));
        }
        Ok(review)
    }

    fn check_rating(&self, rating: i16) -> Result<()> {
        if rating < self.rules.rating_min || rating > self.rules.rating_max {
            return Err(AppError::Validation(format!(
                "Rating must be between {} and {}",
                self.rules.rating_min, self.rules.rating_max
            )));
        }
        Ok(())
    }

    /// Trim the body, turn blank into `None`, and enforce the length bound.
    fn normalize_body(&self, body: Option<String>) -> Result<Option<String>> {
        let Some(body) = body else {
            return Ok(None);
        };
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.chars().count() > self.rules.body_max_len {
            return Err(AppError::Validation(format!(
                "Review must be at most {} characters",
                self.rules.body_max_len
            )));
        }
        Ok(Some(trimmed.to_string()))
    }

    fn page_request(&self, page: Option<i64>, limit: Option<i64>) -> PageRequest {
        PageRequest::clamped(
            page,
            limit,
            self.pagination.review_default_limit,
            self.pagination.max_limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;

    fn service() -> ReviewService {
        ReviewService::new(
            Arc::new(MemoryStore::permissive()),
            ReviewRules::default(),
            PaginationConfig::default(),
        )
    }

    #[test]
    fn blank_bodies_become_none() {
        let svc = service();
        assert_eq!(svc.normalize_body(Some("   ".into())).unwrap(), None);
        assert_eq!(
            svc.normalize_body(Some("  fine  ".into())).unwrap(),
            Some("fine".to_string())
        );
    }

    #[test]
    fn body_length_counts_characters() {
        let svc = service();
        let max = svc.rules().body_max_len;
        assert!(svc.normalize_body(Some("é".repeat(max))).is_ok());
        assert!(matches!(
            svc.normalize_body(Some("é".repeat(max + 1))),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn empty_patch_is_rejected_before_lookup() {
        let err = service()
            .update_review(999, 1, ReviewPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
