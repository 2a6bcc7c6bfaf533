//! Proxy for the virtual try-on app: forwards image composition and style
//! suggestion requests to the Gemini API with a server-side key, retrying
//! failed calls with exponential backoff.

pub mod ai;
pub mod error;
pub mod models;
pub mod prompts;
pub mod proxy;
pub mod retry;
pub mod server;

pub use error::{Error, Result};
