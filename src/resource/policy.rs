//! Vendor keys and policy payloads
//!
//! Every label or annotation under the `bow.sh/` namespace belongs to bow.
//! Only a handful of them carry meaning for the dashboard; the rest are
//! surfaced verbatim as vendor options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Namespace prefix for vendor-owned labels and annotations
pub const BOW_PREFIX: &str = "bow.sh/";

/// Number of approvals required before an update is applied
pub const APPROVALS_KEY: &str = "bow.sh/approvals";

/// Trigger mode (`poll` or anything else)
pub const TRIGGER_KEY: &str = "bow.sh/trigger";

/// Update policy name (`all`, `major`, `minor`, `patch`, `force`, `glob:...`)
pub const POLICY_KEY: &str = "bow.sh/policy";

/// Cron-like schedule used when the trigger is `poll`
pub const POLL_SCHEDULE_KEY: &str = "bow.sh/pollSchedule";

/// The only trigger value that is interpreted
pub const TRIGGER_POLL: &str = "poll";

/// Trigger value written when polling is switched off
pub const TRIGGER_DEFAULT: &str = "default";

/// Schedule the backend falls back to when none is annotated
pub const DEFAULT_POLL_SCHEDULE: &str = "@every 1m";

/// Check whether a label/annotation key lives in the vendor namespace.
///
/// Case-sensitive: `Bow.sh/trigger` is not a vendor key.
pub fn is_vendor_key(key: &str) -> bool {
    key.starts_with(BOW_PREFIX)
}

/// Payload for a policy change, sent as `{"identifier": ..., <fields>}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyUpdate {
    /// Resource the change applies to
    pub identifier: String,
    /// Policy fields to write, flattened next to `identifier`
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PolicyUpdate {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            fields: Map::new(),
        }
    }

    /// Set an arbitrary policy field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_policy(self, policy: &str) -> Self {
        self.with_field("policy", policy)
    }

    pub fn with_approvals(self, approvals: u32) -> Self {
        self.with_field("approvals", approvals)
    }

    /// Switch between poll-based and default (webhook) triggers
    pub fn with_trigger(self, poll: bool) -> Self {
        let trigger = if poll { TRIGGER_POLL } else { TRIGGER_DEFAULT };
        self.with_field("trigger", trigger)
    }

    pub fn with_poll_schedule(self, schedule: &str) -> Self {
        self.with_field("pollSchedule", schedule)
    }

    /// Serialize into the JSON body expected by the backend
    pub fn to_value(&self) -> Value {
        let mut body = self.fields.clone();
        body.insert("identifier".to_string(), Value::String(self.identifier.clone()));
        Value::Object(body)
    }
}
