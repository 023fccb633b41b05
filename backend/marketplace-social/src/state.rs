use crate::config::Config;
use crate::repository::{
    FollowRepository, MemoryStore, PgFollowRepository, PgReviewRepository, ReviewRepository,
};
use crate::services::{FollowService, ReviewService};
use sqlx::PgPool;
use std::sync::Arc;

/// Services shared by every HTTP worker.
#[derive(Clone)]
pub struct AppState {
    pub follows: FollowService,
    pub reviews: ReviewService,
}

impl AppState {
    pub fn new(
        follow_repo: Arc<dyn FollowRepository>,
        review_repo: Arc<dyn ReviewRepository>,
        config: &Config,
    ) -> Self {
        Self {
            follows: FollowService::new(follow_repo, config.pagination),
            reviews: ReviewService::new(review_repo, config.reviews, config.pagination),
        }
    }

    pub fn with_postgres(pool: PgPool, config: &Config) -> Self {
        Self::new(
            Arc::new(PgFollowRepository::new(pool.clone())),
            Arc::new(PgReviewRepository::new(pool)),
            config,
        )
    }

    /// Both services backed by one in-process store.
    pub fn with_memory(store: Arc<MemoryStore>, config: &Config) -> Self {
        Self::new(store.clone(), store, config)
    }
}
