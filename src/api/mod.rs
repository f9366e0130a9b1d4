//! Backend API interaction module
//!
//! # Module Structure
//!
//! - [`client`] - The [`BackendClient`] seam and its HTTP implementation
//! - [`http`] - reqwest wrapper, basic auth and error formatting
//!
//! # Example
//!
//! ```ignore
//! use bowdash::api::{ApiClient, BackendClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = ApiClient::new("http://localhost:9300", None)?;
//!     let resources = client.get_resources("resources").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;

pub use client::{ApiClient, BackendClient};
pub use http::{format_api_error, BasicAuth};
