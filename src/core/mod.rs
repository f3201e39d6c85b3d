//! Core components of the `market-digest` crate.
//!
//! This module contains the foundational building blocks, including:
//! - The provider [`NewsClient`] and its builder.
//! - The primary [`DigestError`] type.
//! - The [`NewsSource`] seam the aggregator fetches through.
//! - Retry and cache policies shared by the client and the orchestrator.

/// The provider client (`NewsClient`), builder, and policies.
pub mod client;
/// The primary error type (`DigestError`) for the crate.
pub mod error;
/// Service traits for abstracting the news provider.
pub mod services;

#[cfg(feature = "test-mode")]
pub(crate) mod fixtures;

pub(crate) mod net;

// convenient re-exports so most code can just `use crate::core::NewsClient`
pub use client::{Backoff, CachePolicy, NewsClient, NewsClientBuilder, RetryConfig};
pub use error::DigestError;
pub use services::{NewsFuture, NewsRequest, NewsSource};
