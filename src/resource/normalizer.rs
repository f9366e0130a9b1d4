//! Resource Normalizer
//!
//! Turns raw backend records into the enriched records the dashboard renders.
//! Pure and synchronous: order and count of the input are preserved.

use super::policy::{
    is_vendor_key, APPROVALS_KEY, DEFAULT_POLL_SCHEDULE, POLICY_KEY, POLL_SCHEDULE_KEY,
    TRIGGER_KEY, TRIGGER_POLL,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Label or annotation map as sent by the backend
pub type Metadata = BTreeMap<String, String>;

/// Resource record as returned by the backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawResource {
    /// Expected to be unique within a collection, never enforced
    pub identifier: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Metadata,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub annotations: Metadata,
    /// Every other backend field, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Missing and `null` maps both become empty
fn null_as_empty<'de, D>(deserializer: D) -> Result<Metadata, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Metadata>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawResource {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations.insert(key.to_string(), value.to_string());
        self
    }
}

/// Serialized names of the derived fields; backend fields with these names
/// are dropped so they cannot collide with the derived ones
const DERIVED_FIELDS: &[&str] = &[
    "requiredApprovals",
    "triggerPoll",
    "vendorOptions",
    "loading",
];

/// Raw record plus the fields derived for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResource {
    #[serde(flatten)]
    pub raw: RawResource,
    /// Value of `bow.sh/approvals`, omitted when unset or empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_approvals: Option<String>,
    pub trigger_poll: bool,
    /// Every `bow.sh/` label and annotation; annotations win on collision
    pub vendor_options: BTreeMap<String, String>,
    /// Set while a policy change is pending, cleared only by a refresh
    #[serde(skip_serializing_if = "is_false")]
    pub loading: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl EnrichedResource {
    pub fn identifier(&self) -> &str {
        &self.raw.identifier
    }

    /// Update policy name, if one is set
    pub fn policy(&self) -> Option<&str> {
        self.vendor_options.get(POLICY_KEY).map(String::as_str)
    }

    /// Annotated poll schedule, falling back to the backend default.
    ///
    /// The backend ignores a `bow.sh/pollSchedule` label, so this does too.
    pub fn poll_schedule(&self) -> &str {
        non_empty(&self.raw.annotations, POLL_SCHEDULE_KEY).unwrap_or(DEFAULT_POLL_SCHEDULE)
    }

    pub fn name(&self) -> Option<&str> {
        self.extra_str("name")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.extra_str("namespace")
    }

    fn extra_str(&self, key: &str) -> Option<&str> {
        self.raw.extra.get(key).and_then(Value::as_str)
    }
}

/// Normalize a whole backend response, preserving order
pub fn normalize_resources(raw: Vec<RawResource>) -> Vec<EnrichedResource> {
    raw.into_iter().map(normalize_resource).collect()
}

/// Normalize a single record
pub fn normalize_resource(mut raw: RawResource) -> EnrichedResource {
    for field in DERIVED_FIELDS {
        raw.extra.remove(*field);
    }

    let required_approvals = non_empty(&raw.annotations, APPROVALS_KEY).map(str::to_string);
    let trigger_poll = resolve_trigger_poll(&raw.labels, &raw.annotations);
    let vendor_options = collect_vendor_options(&raw.labels, &raw.annotations);

    EnrichedResource {
        raw,
        required_approvals,
        trigger_poll,
        vendor_options,
        loading: false,
    }
}

/// Resolve the trigger mode: annotation first, then label, else not polling.
///
/// An empty value counts as unset. Anything other than `poll` is `false`.
pub fn resolve_trigger_poll(labels: &Metadata, annotations: &Metadata) -> bool {
    non_empty(annotations, TRIGGER_KEY)
        .or_else(|| non_empty(labels, TRIGGER_KEY))
        .is_some_and(|trigger| trigger == TRIGGER_POLL)
}

/// Merge vendor-namespaced labels and annotations into one flat bag
pub fn collect_vendor_options(
    labels: &Metadata,
    annotations: &Metadata,
) -> BTreeMap<String, String> {
    let mut options = BTreeMap::new();
    // annotations go second so they overwrite labels
    for (key, value) in labels.iter().chain(annotations.iter()) {
        if is_vendor_key(key) {
            options.insert(key.clone(), value.clone());
        }
    }
    options
}

fn non_empty<'a>(map: &'a Metadata, key: &str) -> Option<&'a str> {
    map.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_approvals() {
        let enriched =
            normalize_resource(RawResource::new("a").with_annotation(APPROVALS_KEY, "2"));
        assert_eq!(enriched.required_approvals.as_deref(), Some("2"));

        let enriched = normalize_resource(RawResource::new("a").with_label(APPROVALS_KEY, "2"));
        assert_eq!(enriched.required_approvals, None);

        let enriched = normalize_resource(RawResource::new("a").with_annotation(APPROVALS_KEY, ""));
        assert_eq!(enriched.required_approvals, None);
    }

    #[test]
    fn test_trigger_precedence() {
        let annotation_wins = RawResource::new("a")
            .with_annotation(TRIGGER_KEY, "poll")
            .with_label(TRIGGER_KEY, "push");
        assert!(normalize_resource(annotation_wins).trigger_poll);

        let label_only = RawResource::new("a").with_label(TRIGGER_KEY, "poll");
        assert!(normalize_resource(label_only).trigger_poll);

        assert!(!normalize_resource(RawResource::new("a")).trigger_poll);

        let webhook = RawResource::new("a")
            .with_annotation(TRIGGER_KEY, "webhook")
            .with_label(TRIGGER_KEY, "poll");
        assert!(!normalize_resource(webhook).trigger_poll);
    }

    #[test]
    fn test_empty_trigger_annotation_falls_back_to_label() {
        let raw = RawResource::new("a")
            .with_annotation(TRIGGER_KEY, "")
            .with_label(TRIGGER_KEY, "poll");
        assert!(normalize_resource(raw).trigger_poll);
    }

    #[test]
    fn test_trigger_value_is_case_sensitive() {
        let raw = RawResource::new("a").with_annotation(TRIGGER_KEY, "Poll");
        assert!(!normalize_resource(raw).trigger_poll);
    }

    #[test]
    fn test_vendor_options_merge() {
        let raw = RawResource::new("a")
            .with_label("bow.sh/env", "staging")
            .with_label("bow.sh/policy", "minor")
            .with_label("app", "web")
            .with_annotation("bow.sh/env", "prod")
            .with_annotation("kubectl.kubernetes.io/last-applied", "{}");

        let options = normalize_resource(raw).vendor_options;
        assert_eq!(options.len(), 2);
        assert_eq!(options["bow.sh/env"], "prod");
        assert_eq!(options["bow.sh/policy"], "minor");
        assert!(!options.contains_key("app"));
    }

    #[test]
    fn test_order_and_count_preserved() {
        let raw = vec![
            RawResource::new("C"),
            RawResource::new("A"),
            RawResource::new("B"),
            RawResource::new("A"),
        ];
        let ids: Vec<_> = normalize_resources(raw)
            .iter()
            .map(|r| r.identifier().to_string())
            .collect();
        assert_eq!(ids, vec!["C", "A", "B", "A"]);
    }

    #[test]
    fn test_passthrough_and_defaults_from_json() {
        let raw: RawResource = serde_json::from_value(json!({
            "identifier": "deployment/default/web",
            "name": "web",
            "namespace": "default",
            "images": ["nginx:1.19"],
            "labels": null
        }))
        .unwrap();

        assert!(raw.labels.is_empty());
        assert!(raw.annotations.is_empty());

        let enriched = normalize_resource(raw);
        assert_eq!(enriched.name(), Some("web"));
        assert_eq!(enriched.namespace(), Some("default"));
        assert_eq!(enriched.poll_schedule(), DEFAULT_POLL_SCHEDULE);
        assert_eq!(enriched.policy(), None);

        let value = serde_json::to_value(&enriched).unwrap();
        assert_eq!(value["images"], json!(["nginx:1.19"]));
        assert_eq!(value["triggerPoll"], json!(false));
        assert_eq!(value["vendorOptions"], json!({}));
        assert!(value.get("requiredApprovals").is_none());
        assert!(value.get("loading").is_none());
    }

    #[test]
    fn test_policy_and_schedule_accessors() {
        let raw = RawResource::new("a")
            .with_label(POLICY_KEY, "patch")
            .with_annotation(POLL_SCHEDULE_KEY, "@every 10m");
        let enriched = normalize_resource(raw);
        assert_eq!(enriched.policy(), Some("patch"));
        assert_eq!(enriched.poll_schedule(), "@every 10m");
    }

    #[test]
    fn test_poll_schedule_label_is_ignored() {
        let raw = RawResource::new("a").with_label(POLL_SCHEDULE_KEY, "@every 10m");
        let enriched = normalize_resource(raw);
        assert_eq!(enriched.vendor_options[POLL_SCHEDULE_KEY], "@every 10m");
        assert_eq!(enriched.poll_schedule(), DEFAULT_POLL_SCHEDULE);
    }

    #[test]
    fn test_backend_fields_named_like_derived_ones_are_dropped() {
        let raw: RawResource = serde_json::from_value(json!({
            "identifier": "a",
            "triggerPoll": "yes",
            "loading": true,
            "vendorOptions": {"x": "y"},
            "requiredApprovals": "9",
            "provider": "helm",
            "annotations": {"bow.sh/trigger": "poll"}
        }))
        .unwrap();

        let enriched = normalize_resource(raw);
        assert!(!enriched.loading);
        assert_eq!(enriched.required_approvals, None);
        assert_eq!(enriched.raw.extra.len(), 1);

        let text = serde_json::to_string(&enriched).unwrap();
        assert_eq!(text.matches("\"triggerPoll\"").count(), 1);
        assert!(!text.contains("\"loading\""));
        assert!(!text.contains("\"requiredApprovals\""));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["triggerPoll"], json!(true));
        assert_eq!(value["vendorOptions"], json!({"bow.sh/trigger": "poll"}));
        assert_eq!(value["provider"], json!("helm"));
    }
}
