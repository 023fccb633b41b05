use crate::error::AppError;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::{ready, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

const NO_TOKEN: &str = "Not authorized, no token";
const TOKEN_FAILED: &str = "Not authorized, token failed";

/// Access token claims. `sub` carries the numeric user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

/// HS256 verifier for bearer tokens issued by the auth service.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Validate signature and expiry and return the caller's user id.
    pub fn verify(&self, token: &str) -> Result<i64, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::warn!("JWT validation failed: {}", e);
            AppError::Unauthorized(TOKEN_FAILED.to_string())
        })?;

        data.claims.sub.parse::<i64>().map_err(|_| {
            tracing::warn!(sub = %data.claims.sub, "token subject is not a user id");
            AppError::Unauthorized(TOKEN_FAILED.to_string())
        })
    }
}

/// Authenticated caller, inserted into request extensions by [`JwtAuthMiddleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// Why a supplied `Authorization` header was not accepted.
#[derive(Debug, Clone, Copy)]
struct AuthRejected(&'static str);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let extensions = req.extensions();
        let result = match extensions.get::<AuthUser>() {
            Some(user) => Ok(*user),
            None => {
                let reason = extensions
                    .get::<AuthRejected>()
                    .map_or(NO_TOKEN, |rejected| rejected.0);
                Err(AppError::Unauthorized(reason.to_string()))
            }
        };
        ready(result)
    }
}

/// Resolves the bearer token, if any, into an [`AuthUser`].
///
/// Requests without a valid bearer token pass through anonymously. Public
/// routes serve them; protected routes reject them through the `AuthUser`
/// extractor, which reports why a supplied token was refused.
pub struct JwtAuthMiddleware {
    verifier: Arc<JwtVerifier>,
}

impl JwtAuthMiddleware {
    pub fn new(verifier: Arc<JwtVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    verifier: Arc<JwtVerifier>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let verifier = self.verifier.clone();

        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .map(|h| h.to_str().unwrap_or_default().to_string());

            if let Some(auth_header) = auth_header {
                let token = auth_header
                    .strip_prefix("Bearer ")
                    .map(str::trim)
                    .filter(|token| !token.is_empty());

                match token.map(|token| verifier.verify(token)) {
                    Some(Ok(user_id)) => {
                        req.extensions_mut().insert(AuthUser(user_id));
                    }
                    Some(Err(_)) => {
                        req.extensions_mut().insert(AuthRejected(TOKEN_FAILED));
                    }
                    None => {
                        req.extensions_mut().insert(AuthRejected(NO_TOKEN));
                    }
                }
            }

            service.call(req).await
        })
    }
}
