//! Shared re-exports for the SpineSpy workspace.
//!
//! Downstream crates pull the async runtime, error handling, image and HTTP
//! crates through here so the whole workspace agrees on one version of each.

pub use anyhow::{Error, Result, anyhow, bail};
pub use async_trait::async_trait;
pub use futures;
pub use image;
pub use reqwest;
pub use serde_json as json;
pub use tokio;

pub mod sync {
    pub use tokio::sync::*;
}
