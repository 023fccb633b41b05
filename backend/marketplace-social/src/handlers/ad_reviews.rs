/// Ad review handlers - HTTP endpoints for reviews, ratings and reactions
use super::{ApiResponse, PageQuery};
use crate::domain::{ReactionType, ReviewPatch};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

/// Request body for creating a review
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i16,
    #[serde(default)]
    pub body: Option<String>,
}

/// Request body for reacting to a review
#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    #[serde(rename = "type")]
    pub reaction_type: String,
}

/// List reviews of an ad, newest first
pub async fn get_ad_reviews(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = state
        .reviews
        .get_reviews_for_ad(path.into_inner(), query.page, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

/// Aggregate rating of an ad
pub async fn get_ad_rating(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let rating = state.reviews.get_rating_for_ad(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(rating)))
}

/// The caller's review of an ad; `data` is null when there is none
pub async fn get_my_review(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let review = state.reviews.get_my_review(user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(review)))
}

/// Reviews written by a user
pub async fn get_user_reviews(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = state
        .reviews
        .get_reviews_by_user(path.into_inner(), query.page, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

pub async fn get_review(state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
    let review = state.reviews.get_review(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(review)))
}

pub async fn create_review(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    req: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let review = state
        .reviews
        .create_review(user.0, path.into_inner(), req.rating, req.body)
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(review, "Review created")))
}

pub async fn update_review(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    req: web::Json<ReviewPatch>,
) -> Result<HttpResponse> {
    let review = state
        .reviews
        .update_review(path.into_inner(), user.0, req.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(review, "Review updated")))
}

pub async fn delete_review(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let review_id = path.into_inner();

    if state.reviews.delete_review(review_id, user.0).await? {
        Ok(HttpResponse::Ok().json(ApiResponse::message("Review deleted")))
    } else {
        // Deleted concurrently.
        Err(AppError::NotFound("Review not found".to_string()))
    }
}

pub async fn add_reaction(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    req: web::Json<ReactionRequest>,
) -> Result<HttpResponse> {
    let reaction_type: ReactionType = req.reaction_type.parse().map_err(|_| {
        AppError::Validation(format!(
            "Invalid reaction type. Must be one of: {}",
            ReactionType::ALL.map(|t| t.as_str()).join(", ")
        ))
    })?;

    let reaction = state
        .reviews
        .add_reaction(path.into_inner(), user.0, reaction_type)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(reaction)))
}

pub async fn remove_reaction(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if state
        .reviews
        .remove_reaction(path.into_inner(), user.0)
        .await?
    {
        Ok(HttpResponse::Ok().json(ApiResponse::message("Reaction removed")))
    } else {
        Err(AppError::NotFound("Reaction not found".to_string()))
    }
}
