//! Identifiers, scope sets, and token values shared by every credential kind.

pub mod id;
pub mod scope;
pub mod token;

pub use id::*;
pub use scope::*;
pub use token::{access::*, secret::*};
