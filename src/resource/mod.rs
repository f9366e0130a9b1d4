//! Resource model
//!
//! Raw records come from the backend with arbitrary label and annotation maps.
//! The dashboard only interprets the `bow.sh/` namespace.
//!
//! # Architecture
//!
//! - [`policy`] - Vendor keys and the policy-change payload
//! - [`normalizer`] - Derives approvals, trigger mode and vendor options
//!
//! # Example
//!
//! ```
//! use bowdash::resource::{normalize_resources, RawResource, TRIGGER_KEY};
//!
//! let raw = vec![RawResource::new("deployment/default/web").with_label(TRIGGER_KEY, "poll")];
//! let enriched = normalize_resources(raw);
//! assert!(enriched[0].trigger_poll);
//! ```

mod normalizer;
mod policy;

pub use normalizer::{
    collect_vendor_options, normalize_resource, normalize_resources, resolve_trigger_poll,
    EnrichedResource, Metadata, RawResource,
};
pub use policy::*;
