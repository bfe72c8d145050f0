//! HTTP client module
//!
//! Provides the transport used by the live API client.
//!
//! # Features
//!
//! - **Routes**: Pure request descriptors resolved against a base URL
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Error Classification**: Status and decoding failures mapped to [`crate::Error`]
//! - **No Retries**: Failures are reported once; callers decide to resubmit

mod client;
mod rate_limit;
mod route;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, DEFAULT_BASE_URL};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use route::Route;
