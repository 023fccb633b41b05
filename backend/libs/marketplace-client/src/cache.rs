//! Query cache with an explicit invalidation map.
//!
//! Each cached response is stored under its request key and labelled with the
//! [`CacheTag`]s it provides. A [`Mutation`] names the tags it invalidates, and
//! every entry carrying one of them is evicted.

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Resource tags provided by read queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    /// Review listing of one ad
    AdReviews(i64),
    /// Aggregate rating of one ad
    AdRating(i64),
    /// The caller's own review of one ad
    MyReview(i64),
    /// Reviews written by one user
    UserReviews(i64),
    /// A single review
    Review(i64),
    /// Provided by every query whose result aggregates reviews (listings,
    /// ratings, my-review), so edits to any one review refresh them.
    ReviewList,
    Followers(i64),
    Following(i64),
    FollowStatus(i64),
}

/// Writes issued by the client, with the ids needed to compute what they stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Follow { follower_id: i64, following_id: i64 },
    Unfollow { follower_id: i64, following_id: i64 },
    CreateReview { author_id: i64, ad_id: i64 },
    UpdateReview { review_id: i64 },
    DeleteReview { review_id: i64 },
    AddReaction { review_id: i64 },
    RemoveReaction { review_id: i64 },
}

impl Mutation {
    /// The invalidation map.
    pub fn invalidates(&self) -> Vec<CacheTag> {
        match *self {
            Mutation::Follow {
                follower_id,
                following_id,
            }
            | Mutation::Unfollow {
                follower_id,
                following_id,
            } => vec![
                CacheTag::Followers(following_id),
                CacheTag::FollowStatus(following_id),
                CacheTag::Following(follower_id),
                CacheTag::FollowStatus(follower_id),
            ],
            Mutation::CreateReview { author_id, ad_id } => vec![
                CacheTag::AdReviews(ad_id),
                CacheTag::AdRating(ad_id),
                CacheTag::MyReview(ad_id),
                CacheTag::UserReviews(author_id),
            ],
            Mutation::UpdateReview { review_id } | Mutation::DeleteReview { review_id } => {
                vec![CacheTag::Review(review_id), CacheTag::ReviewList]
            }
            // Reaction tallies appear in listings too.
            Mutation::AddReaction { review_id } | Mutation::RemoveReaction { review_id } => {
                vec![CacheTag::Review(review_id), CacheTag::ReviewList]
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CachedEntry {
    value: Value,
    tags: Vec<CacheTag>,
}

/// Process-local response cache, safe to share between tasks.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<String, CachedEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "cached value no longer decodes");
                None
            }
        }
    }

    pub fn insert<T: Serialize>(&self, key: impl Into<String>, value: &T, tags: Vec<CacheTag>) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.entries.insert(key, CachedEntry { value, tags });
            }
            Err(e) => warn!(key = %key, error = %e, "response not cacheable"),
        }
    }

    /// Evict every entry labelled with any of `tags`. Returns how many were evicted.
    pub fn invalidate(&self, tags: &[CacheTag]) -> usize {
        let mut evicted = 0;
        self.entries.retain(|_, entry| {
            let stale = entry.tags.iter().any(|tag| tags.contains(tag));
            if stale {
                evicted += 1;
            }
            !stale
        });
        debug!(?tags, evicted, "cache invalidated");
        evicted
    }

    pub fn apply(&self, mutation: &Mutation) -> usize {
        self.invalidate(&mutation.invalidates())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
