//! Data models for the masters search API.
//!
//! - `Service`: the kinds of work a master can be searched for
//! - `Master`: one search result with its pre-computed distance

pub mod master;

pub use master::{Master, MastersResponse, Service};
