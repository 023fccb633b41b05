//! In-process store implementing both repositories.
//!
//! All tables sit behind one `tokio::sync::Mutex`, so each operation is a
//! single critical section: uniqueness checks and inserts cannot interleave,
//! and deleting a review removes its reactions in the same step.

use super::{FollowRepository, ReviewRepository};
use crate::domain::{
    FollowEdge, RatingSummary, Reaction, ReactionType, Review, ReviewView, UserSummary,
};
use crate::error::{AppError, Result};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct UserRecord {
    name: String,
    avatar_url: Option<String>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<i64, UserRecord>,
    ads: HashSet<i64>,
    follows: Vec<FollowEdge>,
    next_follow_id: i64,
    reviews: BTreeMap<i64, Review>,
    next_review_id: i64,
    reactions: HashMap<(i64, i64), Reaction>,
}

impl Tables {
    /// Enforce (or, in permissive mode, create) the user projection row.
    fn ensure_user(&mut self, user_id: i64, strict: bool) -> Result<()> {
        if self.users.contains_key(&user_id) {
            return Ok(());
        }
        if strict {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        self.users.insert(
            user_id,
            UserRecord {
                name: format!("user-{}", user_id),
                avatar_url: None,
            },
        );
        Ok(())
    }

    fn ensure_ad(&mut self, ad_id: i64, strict: bool) -> Result<()> {
        if self.ads.contains(&ad_id) {
            return Ok(());
        }
        if strict {
            return Err(AppError::NotFound("Ad not found".to_string()));
        }
        self.ads.insert(ad_id);
        Ok(())
    }

    fn summary(&self, user_id: i64, edge: &FollowEdge) -> Option<UserSummary> {
        self.users.get(&user_id).map(|user| UserSummary {
            id: user_id,
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            followed_at: edge.created_at,
        })
    }

    fn view(&self, review: &Review) -> ReviewView {
        let (helpful_count, not_helpful_count) = self
            .reactions
            .values()
            .filter(|r| r.review_id == review.id)
            .fold((0, 0), |(h, n), r| match r.reaction_type {
                ReactionType::Helpful => (h + 1, n),
                ReactionType::NotHelpful => (h, n + 1),
            });

        ReviewView {
            review: review.clone(),
            author_name: self.users.get(&review.author_id).map(|u| u.name.clone()),
            helpful_count,
            not_helpful_count,
        }
    }

    /// Newest first; ids break ties between equal timestamps.
    fn sorted_edges<'a>(edges: impl Iterator<Item = &'a FollowEdge>) -> Vec<&'a FollowEdge> {
        let mut edges: Vec<&FollowEdge> = edges.collect();
        edges.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        edges
    }

    fn page_of_views<'a>(
        &self,
        reviews: impl Iterator<Item = &'a Review>,
        limit: i64,
        offset: i64,
    ) -> (Vec<ReviewView>, i64) {
        let mut reviews: Vec<&Review> = reviews.collect();
        reviews.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let total = reviews.len() as i64;
        let items = reviews
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|r| self.view(r))
            .collect();
        (items, total)
    }
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    strict_references: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store that rejects references to unregistered users and ads, like the
    /// foreign keys of the PostgreSQL schema.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            strict_references: true,
        }
    }

    /// A store that projects unknown users and ads on first reference, for
    /// running the service without the owning user/ad services.
    pub fn permissive() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            strict_references: false,
        }
    }

    pub async fn register_user(&self, user_id: i64, name: &str, avatar_url: Option<&str>) {
        let mut tables = self.tables.lock().await;
        tables.users.insert(
            user_id,
            UserRecord {
                name: name.to_string(),
                avatar_url: avatar_url.map(str::to_string),
            },
        );
    }

    pub async fn register_ad(&self, ad_id: i64) {
        self.tables.lock().await.ads.insert(ad_id);
    }

    /// Number of stored reactions on a review.
    pub async fn reaction_count(&self, review_id: i64) -> usize {
        self.tables
            .lock()
            .await
            .reactions
            .keys()
            .filter(|(r, _)| *r == review_id)
            .count()
    }
}

#[async_trait::async_trait]
impl FollowRepository for MemoryStore {
    async fn insert_follow(
        &self,
        follower_id: i64,
        following_id: i64,
    ) -> Result<Option<FollowEdge>> {
        let mut tables = self.tables.lock().await;
        tables.ensure_user(follower_id, self.strict_references)?;
        tables.ensure_user(following_id, self.strict_references)?;

        let exists = tables
            .follows
            .iter()
            .any(|e| e.follower_id == follower_id && e.following_id == following_id);
        if exists {
            return Ok(None);
        }

        tables.next_follow_id += 1;
        let edge = FollowEdge {
            id: tables.next_follow_id,
            follower_id,
            following_id,
            created_at: Utc::now(),
        };
        tables.follows.push(edge.clone());
        Ok(Some(edge))
    }

    async fn delete_follow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|e| !(e.follower_id == follower_id && e.following_id == following_id));
        Ok(tables.follows.len() < before)
    }

    async fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables
            .follows
            .iter()
            .any(|e| e.follower_id == follower_id && e.following_id == following_id))
    }

    async fn list_followers(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<UserSummary>, i64)> {
        let tables = self.tables.lock().await;
        let edges =
            Tables::sorted_edges(tables.follows.iter().filter(|e| e.following_id == user_id));
        let total = edges.len() as i64;
        let users = edges
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|e| tables.summary(e.follower_id, e))
            .collect();
        Ok((users, total))
    }

    async fn list_following(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<UserSummary>, i64)> {
        let tables = self.tables.lock().await;
        let edges =
            Tables::sorted_edges(tables.follows.iter().filter(|e| e.follower_id == user_id));
        let total = edges.len() as i64;
        let users = edges
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|e| tables.summary(e.following_id, e))
            .collect();
        Ok((users, total))
    }

    async fn count_followers(&self, user_id: i64) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .follows
            .iter()
            .filter(|e| e.following_id == user_id)
            .count() as i64)
    }

    async fn count_following(&self, user_id: i64) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .follows
            .iter()
            .filter(|e| e.follower_id == user_id)
            .count() as i64)
    }
}

#[async_trait::async_trait]
impl ReviewRepository for MemoryStore {
    async fn insert_review(
        &self,
        author_id: i64,
        ad_id: i64,
        rating: i16,
        body: Option<String>,
    ) -> Result<Option<Review>> {
        let mut tables = self.tables.lock().await;
        tables.ensure_user(author_id, self.strict_references)?;
        tables.ensure_ad(ad_id, self.strict_references)?;

        let exists = tables
            .reviews
            .values()
            .any(|r| r.author_id == author_id && r.ad_id == ad_id);
        if exists {
            return Ok(None);
        }

        tables.next_review_id += 1;
        let now = Utc::now();
        let review = Review {
            id: tables.next_review_id,
            author_id,
            ad_id,
            rating,
            body,
            created_at: now,
            updated_at: now,
        };
        tables.reviews.insert(review.id, review.clone());
        Ok(Some(review))
    }

    async fn find_review(&self, review_id: i64) -> Result<Option<Review>> {
        Ok(self.tables.lock().await.reviews.get(&review_id).cloned())
    }

    async fn find_review_view(&self, review_id: i64) -> Result<Option<ReviewView>> {
        let tables = self.tables.lock().await;
        Ok(tables.reviews.get(&review_id).map(|r| tables.view(r)))
    }

    async fn find_by_author_and_ad(&self, author_id: i64, ad_id: i64) -> Result<Option<Review>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reviews
            .values()
            .find(|r| r.author_id == author_id && r.ad_id == ad_id)
            .cloned())
    }

    async fn update_review(
        &self,
        review_id: i64,
        rating: Option<i16>,
        body: Option<Option<String>>,
    ) -> Result<Option<Review>> {
        let mut tables = self.tables.lock().await;
        let Some(review) = tables.reviews.get_mut(&review_id) else {
            return Ok(None);
        };
        if let Some(rating) = rating {
            review.rating = rating;
        }
        if let Some(body) = body {
            review.body = body;
        }
        review.updated_at = Utc::now();
        Ok(Some(review.clone()))
    }

    async fn delete_review(&self, review_id: i64, author_id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .reviews
            .get(&review_id)
            .map(|r| r.author_id == author_id)
            .unwrap_or(false);
        if !owned {
            return Ok(false);
        }
        tables.reviews.remove(&review_id);
        tables.reactions.retain(|(r, _), _| *r != review_id);
        Ok(true)
    }

    async fn list_for_ad(
        &self,
        ad_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReviewView>, i64)> {
        let tables = self.tables.lock().await;
        Ok(tables.page_of_views(
            tables.reviews.values().filter(|r| r.ad_id == ad_id),
            limit,
            offset,
        ))
    }

    async fn list_by_author(
        &self,
        author_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReviewView>, i64)> {
        let tables = self.tables.lock().await;
        Ok(tables.page_of_views(
            tables.reviews.values().filter(|r| r.author_id == author_id),
            limit,
            offset,
        ))
    }

    async fn rating_for_ad(&self, ad_id: i64) -> Result<RatingSummary> {
        let tables = self.tables.lock().await;
        let (sum, count) = tables
            .reviews
            .values()
            .filter(|r| r.ad_id == ad_id)
            .fold((0i64, 0i64), |(sum, count), r| (sum + r.rating as i64, count + 1));
        Ok(RatingSummary::from_total(sum, count))
    }

    async fn upsert_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction_type: ReactionType,
    ) -> Result<Reaction> {
        let mut tables = self.tables.lock().await;
        if !tables.reviews.contains_key(&review_id) {
            return Err(AppError::NotFound("Review not found".to_string()));
        }
        tables.ensure_user(user_id, self.strict_references)?;

        let now = Utc::now();
        let reaction = tables
            .reactions
            .entry((review_id, user_id))
            .and_modify(|r| {
                r.reaction_type = reaction_type;
                r.updated_at = now;
            })
            .or_insert_with(|| Reaction {
                review_id,
                user_id,
                reaction_type,
                created_at: now,
                updated_at: now,
            })
            .clone();
        Ok(reaction)
    }

    async fn delete_reaction(&self, review_id: i64, user_id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables.reactions.remove(&(review_id, user_id)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn strict_store_rejects_unknown_users() {
        let store = MemoryStore::new();
        store.register_user(1, "alice", None).await;

        let err = store.insert_follow(1, 2).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn permissive_store_projects_unknown_references() {
        let store = MemoryStore::permissive();

        assert!(store.insert_follow(1, 2).await.unwrap().is_some());
        let (followers, total) = store.list_followers(2, 10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(followers[0].name, "user-1");

        assert!(store.insert_review(1, 77, 4, None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_review_removes_its_reactions() {
        let store = MemoryStore::new();
        store.register_user(1, "author", None).await;
        store.register_user(2, "reader", None).await;
        store.register_ad(10).await;

        let review = store.insert_review(1, 10, 5, None).await.unwrap().unwrap();
        store
            .upsert_reaction(review.id, 2, ReactionType::Helpful)
            .await
            .unwrap();
        assert_eq!(store.reaction_count(review.id).await, 1);

        assert!(store.delete_review(review.id, 1).await.unwrap());
        assert_eq!(store.reaction_count(review.id).await, 0);
    }

    #[tokio::test]
    async fn delete_review_requires_matching_author() {
        let store = MemoryStore::new();
        store.register_user(1, "author", None).await;
        store.register_ad(10).await;

        let review = store.insert_review(1, 10, 5, None).await.unwrap().unwrap();
        assert!(!store.delete_review(review.id, 2).await.unwrap());
        assert!(store.find_review(review.id).await.unwrap().is_some());
    }
}
