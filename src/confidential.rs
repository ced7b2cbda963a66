//! Client credentials acquisition for client secret destinations.
//!
//! The [`ConfidentialClientPool`] owns one [`ConfidentialClient`] per application
//! registration. Each client requests tokens from the configured [`Authority`], keeps them in a
//! [`TokenCache`], and refreshes them shortly before they expire.

pub mod authority;
pub mod cache;
pub mod classify;
pub mod client;
pub mod pool;

pub use authority::*;
pub use cache::*;
pub use classify::*;
pub use client::*;
pub use pool::*;
