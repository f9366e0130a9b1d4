//! View model for a dashboard of bow-managed deployable resources.
//!
//! - [`resource`] - Raw/enriched records and the normalizer
//! - [`store`] - Resource collection, loading flags and last error
//! - [`api`] - Backend client seam and its HTTP implementation
//! - [`config`] - Persistent configuration

pub mod api;
pub mod config;
pub mod resource;
pub mod store;

pub use store::{ResourceStore, StoreSnapshot};
