use super::{map_fk_violation, ReviewRepository};
use crate::domain::{RatingSummary, Reaction, ReactionType, Review, ReviewView};
use crate::error::Result;
use sqlx::PgPool;
use tracing::debug;

const REVIEW_COLUMNS: &str =
    "id, author_id, ad_id, rating, body, created_at, updated_at";

/// Review joined with its author's name and reaction tallies. Callers append
/// a WHERE clause (aliases: `r` reviews) before `GROUP BY`.
const REVIEW_VIEW_SELECT: &str = r#"
    SELECT r.id, r.author_id, r.ad_id, r.rating, r.body, r.created_at, r.updated_at,
           u.name AS author_name,
           COUNT(x.user_id) FILTER (WHERE x.reaction_type = 'helpful') AS helpful_count,
           COUNT(x.user_id) FILTER (WHERE x.reaction_type = 'not_helpful') AS not_helpful_count
    FROM ad_reviews r
    LEFT JOIN users u ON u.id = r.author_id
    LEFT JOIN ad_review_reactions x ON x.review_id = r.id
"#;

const REVIEW_VIEW_GROUP: &str = "GROUP BY r.id, u.name";

/// PostgreSQL store for ad reviews and their reactions
#[derive(Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_views(
        &self,
        filter_column: &str,
        filter_value: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReviewView>, i64)> {
        let query = format!(
            "{} WHERE r.{} = $1 {} ORDER BY r.created_at DESC, r.id DESC LIMIT $2 OFFSET $3",
            REVIEW_VIEW_SELECT, filter_column, REVIEW_VIEW_GROUP
        );
        let reviews = sqlx::query_as::<_, ReviewView>(&query)
            .bind(filter_value)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM ad_reviews WHERE {} = $1", filter_column);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(filter_value)
            .fetch_one(&self.pool)
            .await?;

        Ok((reviews, total))
    }
}

#[async_trait::async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn insert_review(
        &self,
        author_id: i64,
        ad_id: i64,
        rating: i16,
        body: Option<String>,
    ) -> Result<Option<Review>> {
        let query = format!(
            r#"
            INSERT INTO ad_reviews (author_id, ad_id, rating, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (author_id, ad_id) DO NOTHING
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        );
        let review = sqlx::query_as::<_, Review>(&query)
            .bind(author_id)
            .bind(ad_id)
            .bind(rating)
            .bind(body)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                map_fk_violation(
                    e,
                    &[("author_id", "User not found"), ("ad_id", "Ad not found")],
                    "Ad not found",
                )
            })?;

        debug!(author_id, ad_id, created = review.is_some(), "insert review");
        Ok(review)
    }

    async fn find_review(&self, review_id: i64) -> Result<Option<Review>> {
        let query = format!("SELECT {} FROM ad_reviews WHERE id = $1", REVIEW_COLUMNS);
        let review = sqlx::query_as::<_, Review>(&query)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn find_review_view(&self, review_id: i64) -> Result<Option<ReviewView>> {
        let query = format!(
            "{} WHERE r.id = $1 {}",
            REVIEW_VIEW_SELECT, REVIEW_VIEW_GROUP
        );
        let review = sqlx::query_as::<_, ReviewView>(&query)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn find_by_author_and_ad(&self, author_id: i64, ad_id: i64) -> Result<Option<Review>> {
        let query = format!(
            "SELECT {} FROM ad_reviews WHERE author_id = $1 AND ad_id = $2",
            REVIEW_COLUMNS
        );
        let review = sqlx::query_as::<_, Review>(&query)
            .bind(author_id)
            .bind(ad_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: i64,
        rating: Option<i16>,
        body: Option<Option<String>>,
    ) -> Result<Option<Review>> {
        let set_body = body.is_some();
        let query = format!(
            r#"
            UPDATE ad_reviews
            SET rating = COALESCE($2, rating),
                body = CASE WHEN $3 THEN $4 ELSE body END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        );
        let review = sqlx::query_as::<_, Review>(&query)
            .bind(review_id)
            .bind(rating)
            .bind(set_body)
            .bind(body.flatten())
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn delete_review(&self, review_id: i64, author_id: i64) -> Result<bool> {
        // Reactions cascade.
        let affected = sqlx::query("DELETE FROM ad_reviews WHERE id = $1 AND author_id = $2")
            .bind(review_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_for_ad(
        &self,
        ad_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReviewView>, i64)> {
        self.list_views("ad_id", ad_id, limit, offset).await
    }

    async fn list_by_author(
        &self,
        author_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReviewView>, i64)> {
        self.list_views("author_id", author_id, limit, offset).await
    }

    async fn rating_for_ad(&self, ad_id: i64) -> Result<RatingSummary> {
        let (sum, count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(rating), 0)::BIGINT, COUNT(*)
            FROM ad_reviews
            WHERE ad_id = $1
            "#,
        )
        .bind(ad_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingSummary::from_total(sum, count))
    }

    async fn upsert_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction_type: ReactionType,
    ) -> Result<Reaction> {
        let reaction = sqlx::query_as::<_, Reaction>(
            r#"
            INSERT INTO ad_review_reactions (review_id, user_id, reaction_type, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (review_id, user_id) DO UPDATE
            SET reaction_type = EXCLUDED.reaction_type, updated_at = NOW()
            RETURNING review_id, user_id, reaction_type, created_at, updated_at
            "#,
        )
        .bind(review_id)
        .bind(user_id)
        .bind(reaction_type.as_db_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_fk_violation(
                e,
                &[("review_id", "Review not found"), ("user_id", "User not found")],
                "Review not found",
            )
        })?;

        Ok(reaction)
    }

    async fn delete_reaction(&self, review_id: i64, user_id: i64) -> Result<bool> {
        let affected = sqlx::query(
            "DELETE FROM ad_review_reactions WHERE review_id = $1 AND user_id = $2",
        )
        .bind(review_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
