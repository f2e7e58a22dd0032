//! Selling Partner API integration

pub mod auth;
pub mod client;
pub mod sigv4;
pub mod types;

pub use client::{RestrictionsClient, SpApiClient};
