/// Follow handlers - HTTP endpoints for the follow graph
use super::{ApiResponse, PageQuery};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

/// Follow a user
pub async fn follow_user(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let following_id = path.into_inner();

    match state.follows.follow(user.0, following_id).await? {
        Some(edge) => Ok(HttpResponse::Created()
            .json(ApiResponse::ok_with_message(edge, "User followed successfully"))),
        None => Err(AppError::Validation(
            "Already following this user".to_string(),
        )),
    }
}

/// Unfollow a user
pub async fn unfollow_user(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let following_id = path.into_inner();

    if state.follows.unfollow(user.0, following_id).await? {
        Ok(HttpResponse::Ok().json(ApiResponse::message("User unfollowed successfully")))
    } else {
        Err(AppError::NotFound("Not following this user".to_string()))
    }
}

/// Get a user's followers
pub async fn get_followers(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = state
        .follows
        .list_followers(path.into_inner(), query.page, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

/// Get the users a user follows
pub async fn get_following(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = state
        .follows
        .list_following(path.into_inner(), query.page, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

/// Whether the caller follows a user, with that user's counts
pub async fn get_follow_status(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let status = state.follows.status(user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(status)))
}
