//! Common types for keyswitch

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
