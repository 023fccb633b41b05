#![allow(dead_code)]

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use marketplace_social::config::{
    AppConfig, AuthConfig, Config, CorsConfig, DatabaseConfig, PaginationConfig,
    ReviewRules, StorageBackend,
};
use marketplace_social::handlers;
use marketplace_social::middleware::{Claims, JwtVerifier};
use marketplace_social::repository::MemoryStore;
use marketplace_social::services::{FollowService, ReviewService};
use marketplace_social::AppState;
use std::sync::Arc;

pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub fn test_config() -> Config {
    Config {
        app: AppConfig {
            env: "test".to_string(),
            host: "127.0.0.1".to_string(),
            http_port: 0,
        },
        database: DatabaseConfig {
            backend: StorageBackend::Memory,
            url: None,
            max_connections: 1,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
        },
        cors: CorsConfig {
            allowed_origins: "http://localhost:3000".to_string(),
        },
        reviews: ReviewRules::default(),
        pagination: PaginationConfig::default(),
    }
}

/// Strict store with users `1..=user_count` and ads `100..=100 + ad_count - 1`.
pub async fn seeded_store(user_count: i64, ad_count: i64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for id in 1..=user_count {
        store.register_user(id, &format!("user {}", id), None).await;
    }
    for id in 100..100 + ad_count {
        store.register_ad(id).await;
    }
    store
}

pub fn follow_service(store: Arc<MemoryStore>) -> FollowService {
    FollowService::new(store, PaginationConfig::default())
}

pub fn review_service(store: Arc<MemoryStore>) -> ReviewService {
    ReviewService::new(store, ReviewRules::default(), PaginationConfig::default())
}

pub fn token_for(user_id: i64) -> String {
    signed_token(user_id, 3600)
}

pub fn expired_token_for(user_id: i64) -> String {
    signed_token(user_id, -3600)
}

fn signed_token(user_id: i64, ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + ttl_secs) as usize,
        iat: now as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn bearer(user_id: i64) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token_for(user_id)))
}

/// The production route table over a memory store.
pub fn test_app(
    store: Arc<MemoryStore>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let config = test_config();
    let state = web::Data::new(AppState::with_memory(store, &config));
    let verifier = Arc::new(JwtVerifier::new(JWT_SECRET));

    App::new()
        .app_data(state)
        .route("/health", web::get().to(handlers::health))
        .route("/ready", web::get().to(handlers::ready))
        .configure(move |cfg| handlers::configure(cfg, verifier))
}
