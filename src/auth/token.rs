//! Token values handed back by identity providers.

pub mod access;
pub mod secret;
