//! Client for the masters search API.
//!
//! This module provides the `MastersClient` for querying
//! `/api/masters` for masters near a location. Requests go through the
//! host, so they take the cache layer's network path: the API is never
//! part of the asset manifest and its responses are never cached.

pub mod client;
pub mod error;

pub use client::{MastersClient, MastersQuery, SearchResults};
pub use error::ApiError;
