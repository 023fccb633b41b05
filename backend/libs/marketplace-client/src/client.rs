use crate::cache::{CacheTag, Mutation, QueryCache};
use crate::error::{ClientError, Result};
use crate::models::{
    CreateReview, Envelope, FollowEdge, FollowStatus, Page, RatingSummary, Reaction, ReactionBody,
    ReactionType, Review, ReviewView, UpdateReview, UserSummary,
};
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Bearer token of the signed-in user, with the id it was issued for.
#[derive(Clone)]
struct Session {
    token: String,
    user_id: i64,
}

/// Client for the `/api` surface of marketplace-social.
#[derive(Clone)]
pub struct MarketplaceClient {
    http: reqwest::Client,
    base_url: String,
    session: Option<Session>,
    cache: Arc<QueryCache>,
}

impl MarketplaceClient {
    /// `base_url` is the service root, e.g. `http://localhost:8090`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/api", base_url),
            session: None,
            cache: Arc::new(QueryCache::new()),
        })
    }

    /// Authenticate subsequent requests as `user_id`.
    pub fn with_session(mut self, token: impl Into<String>, user_id: i64) -> Self {
        self.session = Some(Session {
            token: token.into(),
            user_id,
        });
        // Cached "my" data belongs to the previous identity.
        self.cache = Arc::new(QueryCache::new());
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    // ---- follows -------------------------------------------------------

    pub async fn follow_user(&self, user_id: i64) -> Result<FollowEdge> {
        let path = format!("/follows/{}", user_id);
        let edge = self
            .mutate(Method::POST, &path, None::<&()>, self.follow_mutation(user_id, true))
            .await?;
        required(edge, &path)
    }

    pub async fn unfollow_user(&self, user_id: i64) -> Result<()> {
        let path = format!("/follows/{}", user_id);
        self.mutate::<serde_json::Value, ()>(
            Method::DELETE,
            &path,
            None,
            self.follow_mutation(user_id, false),
        )
        .await?;
        Ok(())
    }

    pub async fn get_followers(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Page<UserSummary>> {
        let path = format!("/follows/{}/followers?page={}&limit={}", user_id, page, limit);
        self.query(&path, vec![CacheTag::Followers(user_id)]).await
    }

    pub async fn get_following(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Page<UserSummary>> {
        let path = format!("/follows/{}/following?page={}&limit={}", user_id, page, limit);
        self.query(&path, vec![CacheTag::Following(user_id)]).await
    }

    pub async fn get_follow_status(&self, user_id: i64) -> Result<FollowStatus> {
        let path = format!("/follows/{}/status", user_id);
        self.query(&path, vec![CacheTag::FollowStatus(user_id)])
            .await
    }

    // ---- ad reviews ----------------------------------------------------

    pub async fn get_ad_reviews(
        &self,
        ad_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Page<ReviewView>> {
        let path = format!("/ad-reviews/ad/{}?page={}&limit={}", ad_id, page, limit);
        self.query(&path, vec![CacheTag::AdReviews(ad_id), CacheTag::ReviewList])
            .await
    }

    pub async fn get_ad_rating(&self, ad_id: i64) -> Result<RatingSummary> {
        let path = format!("/ad-reviews/ad/{}/rating", ad_id);
        self.query(&path, vec![CacheTag::AdRating(ad_id), CacheTag::ReviewList])
            .await
    }

    /// `None` when the caller has not reviewed the ad.
    pub async fn get_my_review(&self, ad_id: i64) -> Result<Option<Review>> {
        let path = format!("/ad-reviews/ad/{}/my-review", ad_id);
        self.query(&path, vec![CacheTag::MyReview(ad_id), CacheTag::ReviewList])
            .await
    }

    pub async fn get_user_reviews(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Page<ReviewView>> {
        let path = format!("/ad-reviews/user/{}?page={}&limit={}", user_id, page, limit);
        self.query(&path, vec![CacheTag::UserReviews(user_id), CacheTag::ReviewList])
            .await
    }

    pub async fn get_review(&self, review_id: i64) -> Result<ReviewView> {
        let path = format!("/ad-reviews/{}", review_id);
        self.query(&path, vec![CacheTag::Review(review_id)]).await
    }

    pub async fn create_review(&self, ad_id: i64, review: &CreateReview) -> Result<Review> {
        let path = format!("/ad-reviews/ad/{}", ad_id);
        let mutation = Mutation::CreateReview {
            author_id: self.session_user_id(),
            ad_id,
        };
        let created = self
            .mutate(Method::POST, &path, Some(review), mutation)
            .await?;
        required(created, &path)
    }

    pub async fn update_review(&self, review_id: i64, patch: &UpdateReview) -> Result<Review> {
        let path = format!("/ad-reviews/{}", review_id);
        let updated = self
            .mutate(
                Method::PUT,
                &path,
                Some(patch),
                Mutation::UpdateReview { review_id },
            )
            .await?;
        required(updated, &path)
    }

    pub async fn delete_review(&self, review_id: i64) -> Result<()> {
        let path = format!("/ad-reviews/{}", review_id);
        self.mutate::<serde_json::Value, ()>(
            Method::DELETE,
            &path,
            None,
            Mutation::DeleteReview { review_id },
        )
        .await?;
        Ok(())
    }

    pub async fn add_reaction(
        &self,
        review_id: i64,
        reaction_type: ReactionType,
    ) -> Result<Reaction> {
        let path = format!("/ad-reviews/{}/react", review_id);
        let reaction = self
            .mutate(
                Method::POST,
                &path,
                Some(&ReactionBody { reaction_type }),
                Mutation::AddReaction { review_id },
            )
            .await?;
        required(reaction, &path)
    }

    pub async fn remove_reaction(&self, review_id: i64) -> Result<()> {
        let path = format!("/ad-reviews/{}/react", review_id);
        self.mutate::<serde_json::Value, ()>(
            Method::DELETE,
            &path,
            None,
            Mutation::RemoveReaction { review_id },
        )
        .await?;
        Ok(())
    }

    // ---- plumbing ------------------------------------------------------

    fn session_user_id(&self) -> i64 {
        // Anonymous writes are rejected by the server before any cache is touched.
        self.session.as_ref().map(|s| s.user_id).unwrap_or_default()
    }

    fn follow_mutation(&self, following_id: i64, follow: bool) -> Mutation {
        let follower_id = self.session_user_id();
        if follow {
            Mutation::Follow {
                follower_id,
                following_id,
            }
        } else {
            Mutation::Unfollow {
                follower_id,
                following_id,
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.session {
            Some(session) => builder.bearer_auth(&session.token),
            None => builder,
        }
    }

    async fn query<T>(&self, path: &str, tags: Vec<CacheTag>) -> Result<T>
    where
        T: DeserializeOwned + Serialize,
    {
        if let Some(hit) = self.cache.get::<T>(path) {
            debug!(path, "cache hit");
            return Ok(hit);
        }

        let envelope: Envelope<T> = self.send(self.request(Method::GET, path)).await?;
        let value = match envelope.data {
            Some(value) => value,
            // `null` is a legitimate answer for optional resources (my-review).
            None => serde_json::from_value(serde_json::Value::Null)
                .map_err(|_| ClientError::MissingData(path.to_string()))?,
        };

        self.cache.insert(path, &value, tags);
        Ok(value)
    }

    async fn mutate<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        mutation: Mutation,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        // Rejected writes invalidate too.
        let outcome = self.send::<T>(builder).await;
        let evicted = self.cache.apply(&mutation);
        debug!(path, ?mutation, evicted, ok = outcome.is_ok(), "mutation applied");
        Ok(outcome?.data)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Envelope<T>> {
        let response = builder.send().await?;
        let status = response.status();
        let envelope: Envelope<T> = response.json().await?;

        if !status.is_success() || !envelope.success {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: envelope.message.unwrap_or_else(|| status.to_string()),
            });
        }
        Ok(envelope)
    }
}

fn required<T>(value: Option<T>, path: &str) -> Result<T> {
    value.ok_or_else(|| ClientError::MissingData(path.to_string()))
}
