use crate::config::PaginationConfig;
use crate::domain::{FollowCounts, FollowEdge, FollowStatus, Page, PageRequest, UserSummary};
use crate::error::{AppError, Result};
use crate::metrics::record_follow;
use crate::repository::FollowRepository;
use std::sync::Arc;
use tracing::{debug, info};

/// Relationship rules on top of the follow graph store.
#[derive(Clone)]
pub struct FollowService {
    repo: Arc<dyn FollowRepository>,
    pagination: PaginationConfig,
}

impl FollowService {
    pub fn new(repo: Arc<dyn FollowRepository>, pagination: PaginationConfig) -> Self {
        Self { repo, pagination }
    }

    /// Create `follower_id -> following_id`.
    ///
    /// Returns `None` when the edge already exists. Concurrent calls for the
    /// same pair produce exactly one edge; every other caller sees `None`.
    pub async fn follow(&self, follower_id: i64, following_id: i64) -> Result<Option<FollowEdge>> {
        if follower_id == following_id {
            record_follow("follow", "rejected");
            return Err(AppError::Validation("Cannot follow yourself".to_string()));
        }

        let edge = self.repo.insert_follow(follower_id, following_id).await?;
        match &edge {
            Some(edge) => {
                record_follow("follow", "created");
                info!(follower_id, following_id, edge_id = edge.id, "user followed");
            }
            None => {
                record_follow("follow", "duplicate");
                debug!(follower_id, following_id, "follow already exists");
            }
        }
        Ok(edge)
    }

    /// Remove the edge. Returns whether one existed.
    pub async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let removed = self.repo.delete_follow(follower_id, following_id).await?;
        if removed {
            record_follow("unfollow", "removed");
            info!(follower_id, following_id, "user unfollowed");
        } else {
            record_follow("unfollow", "missing");
        }
        Ok(removed)
    }

    pub async fn list_followers(
        &self,
        user_id: i64,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Page<UserSummary>> {
        let request = self.page_request(page, limit);
        let (users, total) = self
            .repo
            .list_followers(user_id, request.limit, request.offset())
            .await?;
        Ok(Page::new(users, total, request))
    }

    pub async fn list_following(
        &self,
        user_id: i64,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Page<UserSummary>> {
        let request = self.page_request(page, limit);
        let (users, total) = self
            .repo
            .list_following(user_id, request.limit, request.offset())
            .await?;
        Ok(Page::new(users, total, request))
    }

    pub async fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        self.repo.is_following(follower_id, following_id).await
    }

    pub async fn get_counts(&self, user_id: i64) -> Result<FollowCounts> {
        let followers_count = self.repo.count_followers(user_id).await?;
        let following_count = self.repo.count_following(user_id).await?;
        Ok(FollowCounts {
            followers_count,
            following_count,
        })
    }

    /// What `viewer_id` sees on `user_id`'s profile.
    pub async fn status(&self, viewer_id: i64, user_id: i64) -> Result<FollowStatus> {
        let is_following = self.is_following(viewer_id, user_id).await?;
        let counts = self.get_counts(user_id).await?;
        Ok(FollowStatus {
            is_following,
            counts,
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        self.repo.health_check().await
    }

    fn page_request(&self, page: Option<i64>, limit: Option<i64>) -> PageRequest {
        PageRequest::clamped(
            page,
            limit,
            self.pagination.follow_default_limit,
            self.pagination.max_limit,
        )
    }
}
