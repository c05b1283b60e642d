use serde::{Deserialize, Serialize};

use super::Labels;

/// Label a function carries to opt into being scaled to zero.
pub const SCALE_ZERO_LABEL: &str = "com.openfaas.scale.zero";

/// A deployed function as reported by `GET /system/functions`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionStatus {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub replicas: u64,
    #[serde(default)]
    pub available_replicas: u64,
    #[serde(default)]
    pub invocation_count: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Labels>,
}

impl FunctionStatus {
    pub fn new(name: &str, namespace: &str, replicas: u64) -> Self {
        Self {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            replicas,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels
            .get_or_insert_with(Labels::new)
            .insert(key.to_owned(), value.to_owned());
        self
    }

    /// Name used by the gateway metrics, `<name>.<namespace>`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.name, self.namespace)
    }

    /// Whether the function opted in with `com.openfaas.scale.zero=true`.
    /// Any other value, including `"True"`, does not count.
    pub fn opted_into_scale_zero(&self) -> bool {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(SCALE_ZERO_LABEL))
            .map_or(false, |value| value == "true")
    }
}
