/// HTTP handlers for marketplace-social
///
/// - Follows: follow/unfollow, follower and following lists, follow status
/// - Ad reviews: one review per user per ad, ratings, reactions
///
/// Every body leaves through [`ApiResponse`], errors included (see `AppError`).
pub mod ad_reviews;
pub mod follows;

use crate::error::AppError;
use crate::middleware::{JwtAuthMiddleware, JwtVerifier};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Response envelope shared by all endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

/// `?page=&limit=`; clamping happens in the services.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Register extractor error handlers and all `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig, verifier: Arc<JwtVerifier>) {
    cfg.app_data(
        web::PathConfig::default()
            .error_handler(|_err, _req| AppError::Validation("Invalid ID parameter".into()).into()),
    )
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid query parameters: {}", err)).into()
    }))
    .app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid request body: {}", err)).into()
    }))
    .service(
        web::scope("/api")
            .wrap(JwtAuthMiddleware::new(verifier))
            .service(
                web::scope("/follows")
                    .route("/{user_id}", web::post().to(follows::follow_user))
                    .route("/{user_id}", web::delete().to(follows::unfollow_user))
                    .route("/{user_id}/followers", web::get().to(follows::get_followers))
                    .route("/{user_id}/following", web::get().to(follows::get_following))
                    .route("/{user_id}/status", web::get().to(follows::get_follow_status)),
            )
            .service(
                web::scope("/ad-reviews")
                    .route("/ad/{ad_id}", web::get().to(ad_reviews::get_ad_reviews))
                    .route("/ad/{ad_id}", web::post().to(ad_reviews::create_review))
                    .route("/ad/{ad_id}/rating", web::get().to(ad_reviews::get_ad_rating))
                    .route("/ad/{ad_id}/my-review", web::get().to(ad_reviews::get_my_review))
                    .route("/user/{user_id}", web::get().to(ad_reviews::get_user_reviews))
                    .route("/{id}", web::get().to(ad_reviews::get_review))
                    .route("/{id}", web::put().to(ad_reviews::update_review))
                    .route("/{id}", web::delete().to(ad_reviews::delete_review))
                    .route("/{id}/react", web::post().to(ad_reviews::add_reaction))
                    .route("/{id}/react", web::delete().to(ad_reviews::remove_reaction)),
            ),
    );
}

/// Liveness probe
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::message("OK"))
}

/// Readiness probe: both stores must answer.
pub async fn ready(state: web::Data<AppState>) -> HttpResponse {
    let follows = state.follows.health_check().await;
    let reviews = state.reviews.health_check().await;

    match follows.and(reviews) {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::message("ready")),
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            HttpResponse::ServiceUnavailable().json(ApiResponse::<()> {
                success: false,
                data: None,
                message: Some("store unavailable".to_string()),
            })
        }
    }
}
