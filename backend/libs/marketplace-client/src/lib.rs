//! Typed client for the marketplace-social REST API.
//!
//! One async method per endpoint, with request and response shapes declared
//! as types. Read queries are cached per request; every mutation evicts the
//! cache entries labelled with the tags it invalidates (see [`Mutation`]).

pub mod cache;
pub mod client;
pub mod error;
pub mod models;

pub use cache::{CacheTag, Mutation, QueryCache};
pub use client::MarketplaceClient;
pub use error::{ClientError, Result};
pub use models::*;
